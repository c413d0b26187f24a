//! Catalog of record fields addressable by dotted path.
//!
//! Paths use the serialized camelCase names (`admissions.acceptanceRate`,
//! `costs.totalCOA`) and are shared by the override table, the field report
//! and `cdset rules`.

use serde_json::{Map, Value};

/// Value kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-negative headcount.
    Count,
    /// Whole-dollar amount.
    Currency,
    /// Fraction in [0, 1].
    Rate,
    /// Test score.
    Score,
}

impl FieldKind {
    /// Whether `value` can be stored in a field of this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Count | Currency => value.as_u64().is_some(),
            Score => value.as_u64().is_some_and(|v| u32::try_from(v).is_ok()),
            Rate => value.as_f64().is_some_and(|v| (0.0..=1.0).contains(&v)),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Count => "a non-negative count",
            Currency => "a whole-dollar amount",
            Rate => "a fraction between 0 and 1",
            Score => "a test score",
        }
    }
}

/// One addressable field of a year record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub path: &'static str,
    pub kind: FieldKind,
    /// Reported as missing when absent from an assembled record.
    pub expected: bool,
}

const fn field(path: &'static str, kind: FieldKind, expected: bool) -> FieldSpec {
    FieldSpec {
        path,
        kind,
        expected,
    }
}

use FieldKind::*;

/// Every field of a year record, in report order.
pub const FIELDS: &[FieldSpec] = &[
    field("admissions.applied", Count, true),
    field("admissions.admitted", Count, true),
    field("admissions.enrolled", Count, true),
    field("admissions.acceptanceRate", Rate, true),
    field("admissions.yield", Rate, true),
    field("admissions.earlyDecision.applied", Count, false),
    field("admissions.earlyDecision.admitted", Count, false),
    field("admissions.earlyAction.applied", Count, false),
    field("admissions.earlyAction.admitted", Count, false),
    field("admissions.byGender.men.applied", Count, false),
    field("admissions.byGender.men.admitted", Count, false),
    field("admissions.byGender.men.enrolled", Count, false),
    field("admissions.byGender.women.applied", Count, false),
    field("admissions.byGender.women.admitted", Count, false),
    field("admissions.byGender.women.enrolled", Count, false),
    field("testScores.sat.composite.p25", Score, true),
    field("testScores.sat.composite.p50", Score, false),
    field("testScores.sat.composite.p75", Score, true),
    field("testScores.sat.readingWriting.p25", Score, false),
    field("testScores.sat.readingWriting.p50", Score, false),
    field("testScores.sat.readingWriting.p75", Score, false),
    field("testScores.sat.math.p25", Score, false),
    field("testScores.sat.math.p50", Score, false),
    field("testScores.sat.math.p75", Score, false),
    field("testScores.sat.submissionRate", Rate, true),
    field("testScores.act.composite.p25", Score, true),
    field("testScores.act.composite.p50", Score, false),
    field("testScores.act.composite.p75", Score, true),
    field("testScores.act.submissionRate", Rate, true),
    field("demographics.enrollment.total", Count, true),
    field("demographics.enrollment.undergraduate", Count, true),
    field("demographics.enrollment.graduate", Count, false),
    field("demographics.byRace.international", Count, true),
    field("demographics.byRace.hispanicLatino", Count, true),
    field("demographics.byRace.blackAfricanAmerican", Count, true),
    field("demographics.byRace.white", Count, true),
    field("demographics.byRace.asian", Count, true),
    field("demographics.byRace.americanIndianAlaskaNative", Count, true),
    field("demographics.byRace.nativeHawaiianPacificIslander", Count, true),
    field("demographics.byRace.twoOrMoreRaces", Count, true),
    field("demographics.byRace.unknown", Count, true),
    field("demographics.byResidency.inState", Count, true),
    field("demographics.byResidency.outOfState", Count, true),
    field("demographics.byResidency.international", Count, true),
    field("costs.tuition", Currency, true),
    field("costs.fees", Currency, true),
    field("costs.roomAndBoard", Currency, true),
    field("costs.totalCOA", Currency, true),
    field("financialAid.percentReceivingAid", Rate, true),
    field("financialAid.averageAidPackage", Currency, true),
    field("financialAid.averageNeedBasedGrant", Currency, true),
    field("financialAid.percentNeedFullyMet", Rate, true),
];

/// Look up a field by dotted path.
pub fn lookup(path: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.path == path)
}

/// Read the value at `path` from a serialized record.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |node, key| node.get(key))
        .filter(|v| !v.is_null())
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Fails when an intermediate node exists but is not an object.
pub fn set(root: &mut Value, path: &str, value: Value) -> Result<(), String> {
    let keys: Vec<&str> = path.split('.').collect();
    let (last, parents) = keys
        .split_last()
        .ok_or_else(|| "empty field path".to_string())?;

    let mut current = root;
    for key in parents {
        let object = current
            .as_object_mut()
            .ok_or_else(|| format!("{} is not an object", key))?;
        current = object
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let object = current
        .as_object_mut()
        .ok_or_else(|| format!("parent of {} is not an object", last))?;
    object.insert(last.to_string(), value);
    Ok(())
}
