//! Year record assembly: overrides, derived fields, validation and the
//! per-field report.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ExtractionIssue;
use crate::extract::numbers::to_rate;
use crate::extract::{Extraction, Source};
use crate::models::field::{self, FIELDS};
use crate::models::{ExtractionSettings, Override, Percentiles, YearRecord};
use crate::reconcile;

/// How a field of the assembled record got its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FieldStatus {
    Extracted { rule: String },
    Derived,
    Overridden {
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Missing,
}

impl FieldStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FieldStatus::Extracted { .. } => "extracted",
            FieldStatus::Derived => "derived",
            FieldStatus::Overridden { .. } => "overridden",
            FieldStatus::Missing => "missing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub field: &'static str,
    #[serde(flatten)]
    pub status: FieldStatus,
}

/// Outcome of assembling one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembled {
    pub record: YearRecord,
    pub fields: Vec<FieldEntry>,
    pub issues: Vec<ExtractionIssue>,
}

impl Assembled {
    pub fn status_counts(&self) -> [usize; 4] {
        status_counts(&self.fields)
    }
}

/// Number of fields with each status, in `extracted, derived, overridden,
/// missing` order.
pub fn status_counts(fields: &[FieldEntry]) -> [usize; 4] {
    let mut counts = [0; 4];
    for entry in fields {
        let slot = match entry.status {
            FieldStatus::Extracted { .. } => 0,
            FieldStatus::Derived => 1,
            FieldStatus::Overridden { .. } => 2,
            FieldStatus::Missing => 3,
        };
        counts[slot] += 1;
    }
    counts
}

/// Builds year records from section extractions.
pub struct Assembler<'a> {
    settings: ExtractionSettings,
    overrides: Vec<&'a Override>,
}

impl<'a> Assembler<'a> {
    pub fn new(settings: ExtractionSettings) -> Self {
        Self {
            settings,
            overrides: Vec::new(),
        }
    }

    /// Set the overrides for the year being assembled, in table order.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = &'a Override>) -> Self {
        self.overrides = overrides.into_iter().collect();
        self
    }

    pub fn assemble(&self, extraction: Extraction) -> Assembled {
        let Extraction {
            record,
            out_of_state_share,
            mut sources,
            mut issues,
        } = extraction;

        // Overrides go in before derivation so rates see corrected inputs,
        // and again afterwards so an override of a derived field wins.
        let (record, _, _) = self.apply_overrides(record);
        let record = self.derive(record, out_of_state_share, &mut sources, &mut issues);
        let (record, applied, skipped) = self.apply_overrides(record);
        issues.extend(skipped);

        issues.extend(validate(&record, &self.settings));
        let fields = report(&record, &sources, &applied, &mut issues);

        for issue in issues.iter().filter(|i| !matches!(i, ExtractionIssue::MissingField { .. })) {
            warn!("{}", issue);
        }
        Assembled {
            record,
            fields,
            issues,
        }
    }

    /// Apply every override, skipping those the record cannot take.
    /// Returns the record, the overrides that took effect and an issue per
    /// skipped override.
    fn apply_overrides(&self, record: YearRecord) -> (YearRecord, Vec<&'a Override>, Vec<ExtractionIssue>) {
        let mut current = record;
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for &o in &self.overrides {
            match apply_override(&current, o) {
                Ok(updated) => {
                    debug!("Override {} = {}", o.field, o.value);
                    current = updated;
                    applied.push(o);
                }
                Err(reason) => skipped.push(ExtractionIssue::OverrideSkipped {
                    field: o.field.clone(),
                    reason,
                }),
            }
        }
        (current, applied, skipped)
    }

    fn derive(
        &self,
        mut record: YearRecord,
        out_of_state_share: Option<Decimal>,
        sources: &mut BTreeMap<String, Source>,
        issues: &mut Vec<ExtractionIssue>,
    ) -> YearRecord {
        let mut derived = |field: &str| {
            sources.insert(field.to_string(), Source::Derived);
        };

        let admissions = &mut record.admissions;
        if let (Some(applied), Some(admitted)) = (admissions.applied, admissions.admitted) {
            admissions.acceptance_rate = ratio(admitted, applied);
            derived("admissions.acceptanceRate");
        }
        if let (Some(admitted), Some(enrolled)) = (admissions.admitted, admissions.enrolled) {
            admissions.yield_rate = ratio(enrolled, admitted);
            derived("admissions.yield");
        }

        let enrollment = &mut record.demographics.enrollment;
        if enrollment.total.is_none() {
            if let (Some(undergraduate), Some(graduate)) = (enrollment.undergraduate, enrollment.graduate) {
                match undergraduate.checked_add(graduate) {
                    Some(total) => {
                        enrollment.total = Some(total);
                        derived("demographics.enrollment.total");
                    }
                    None => issues.push(ExtractionIssue::invariant(
                        "demographics.enrollment.total",
                        format!("undergraduate {} plus graduate {} overflows", undergraduate, graduate),
                    )),
                }
            }
        }

        match reconcile::reconcile(&record, out_of_state_share) {
            Some(Ok(residency)) => {
                record.demographics.by_residency = Some(residency);
                for part in ["inState", "outOfState", "international"] {
                    derived(&format!("demographics.byResidency.{}", part));
                }
            }
            Some(Err(issue)) => {
                record.demographics.by_residency = None;
                issues.push(issue);
            }
            None => {}
        }

        let costs = &mut record.costs;
        if let (Some(tuition), Some(fees), Some(room)) = (costs.tuition, costs.fees, costs.room_and_board) {
            match cost_sum(tuition, fees, room) {
                Some(total) => {
                    costs.total_coa = Some(total);
                    derived("costs.totalCOA");
                }
                None => issues.push(ExtractionIssue::invariant(
                    "costs.totalCOA",
                    format!("{} + {} + {} overflows", tuition, fees, room),
                )),
            }
        }

        record
    }
}

/// Per-field status of an assembled record. Only overrides in `applied`
/// count as overridden.
fn report(
    record: &YearRecord,
    sources: &BTreeMap<String, Source>,
    applied: &[&Override],
    issues: &mut Vec<ExtractionIssue>,
) -> Vec<FieldEntry> {
    let value = serde_json::to_value(record).unwrap_or(Value::Null);
    let overridden: BTreeSet<&str> = applied.iter().map(|o| o.field.as_str()).collect();

    FIELDS
        .iter()
        .map(|spec| {
            let present = field::get(&value, spec.path).is_some();
            let status = if present && overridden.contains(spec.path) {
                let note = applied
                    .iter()
                    .rev()
                    .find(|o| o.field == spec.path)
                    .and_then(|o| o.note.clone());
                FieldStatus::Overridden { note }
            } else if !present {
                if spec.expected && block_present(&value, spec.path) {
                    issues.push(ExtractionIssue::missing(spec.path));
                }
                FieldStatus::Missing
            } else {
                match sources.get(spec.path) {
                    Some(Source::Rule(rule)) => FieldStatus::Extracted {
                        rule: rule.to_string(),
                    },
                    _ => FieldStatus::Derived,
                }
            };
            FieldEntry {
                field: spec.path,
                status,
            }
        })
        .collect()
}

/// Test score fields only count as missing when their test block exists;
/// an absent block means the institution did not report that test.
fn block_present(record: &Value, path: &str) -> bool {
    let mut parts = path.split('.');
    match (parts.next(), parts.next()) {
        (Some("testScores"), Some(test)) => field::get(record, &format!("testScores.{}", test)).is_some(),
        _ => true,
    }
}

fn apply_override(record: &YearRecord, o: &Override) -> Result<YearRecord, String> {
    let mut value = serde_json::to_value(record).map_err(|e| e.to_string())?;
    field::set(&mut value, &o.field, o.value.clone())?;
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn cost_sum(tuition: u64, fees: u64, room: u64) -> Option<u64> {
    tuition.checked_add(fees)?.checked_add(room)
}

/// `numerator / denominator` rounded to four places; 0 when the
/// denominator is 0.
fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        return Some(0.0);
    }
    to_rate(Decimal::from(numerator) / Decimal::from(denominator))
}

fn check(issues: &mut Vec<ExtractionIssue>, ok: bool, rule: &str, detail: impl FnOnce() -> String) {
    if !ok {
        issues.push(ExtractionIssue::invariant(rule, detail()));
    }
}

fn check_percentiles(
    issues: &mut Vec<ExtractionIssue>,
    name: &str,
    p: &Percentiles,
    (min, max): (u32, u32),
) {
    check(issues, p.is_ordered(), &format!("{}.ordered", name), || {
        format!("{} percentiles out of order: {}/{}/{}", name, p.p25, p.p50, p.p75)
    });
    let in_scale = [p.p25, p.p50, p.p75].iter().all(|v| (min..=max).contains(v));
    check(issues, in_scale, &format!("{}.scale", name), || {
        format!("{} scores {}-{} outside {}..{}", name, p.p25, p.p75, min, max)
    });
}

/// Consistency checks over an assembled record. Violations are reported,
/// never corrected.
pub fn validate(record: &YearRecord, settings: &ExtractionSettings) -> Vec<ExtractionIssue> {
    let mut issues = Vec::new();
    let admissions = &record.admissions;

    if let (Some(applied), Some(admitted)) = (admissions.applied, admissions.admitted) {
        check(&mut issues, admitted <= applied, "admissions.admitted", || {
            format!("admitted {} exceeds applied {}", admitted, applied)
        });
    }
    if let (Some(admitted), Some(enrolled)) = (admissions.admitted, admissions.enrolled) {
        check(&mut issues, enrolled <= admitted, "admissions.enrolled", || {
            format!("enrolled {} exceeds admitted {}", enrolled, admitted)
        });
    }
    for (name, plan) in [
        ("admissions.earlyDecision", admissions.early_decision),
        ("admissions.earlyAction", admissions.early_action),
    ] {
        if let Some(plan) = plan {
            check(&mut issues, plan.admitted <= plan.applied, name, || {
                format!("admitted {} exceeds applied {}", plan.admitted, plan.applied)
            });
        }
    }

    let scores = &record.test_scores;
    let rates = [
        ("admissions.acceptanceRate", admissions.acceptance_rate),
        ("admissions.yield", admissions.yield_rate),
        ("testScores.sat.submissionRate", scores.sat.as_ref().and_then(|s| s.submission_rate)),
        ("testScores.act.submissionRate", scores.act.as_ref().and_then(|s| s.submission_rate)),
        ("financialAid.percentReceivingAid", record.financial_aid.percent_receiving_aid),
        ("financialAid.percentNeedFullyMet", record.financial_aid.percent_need_met),
    ];
    for (name, rate) in rates {
        if let Some(rate) = rate {
            check(&mut issues, (0.0..=1.0).contains(&rate), name, || {
                format!("rate {} outside [0, 1]", rate)
            });
        }
    }

    if let Some(sat) = &scores.sat {
        check_percentiles(&mut issues, "testScores.sat.composite", &sat.composite, (400, 1600));
        if let Some(p) = &sat.reading_writing {
            check_percentiles(&mut issues, "testScores.sat.readingWriting", p, (200, 800));
        }
        if let Some(p) = &sat.math {
            check_percentiles(&mut issues, "testScores.sat.math", p, (200, 800));
        }
    }
    if let Some(act) = &scores.act {
        check_percentiles(&mut issues, "testScores.act.composite", &act.composite, (1, 36));
    }

    let demographics = &record.demographics;
    let undergraduate = demographics.enrollment.undergraduate;
    if let (Some(total), Some(undergraduate)) = (demographics.enrollment.total, undergraduate) {
        check(&mut issues, total >= undergraduate, "demographics.enrollment.total", || {
            format!("total {} below undergraduate {}", total, undergraduate)
        });
    }
    if let (Some(sum), Some(undergraduate)) = (demographics.by_race.complete_sum(), undergraduate) {
        let deviation = if undergraduate == 0 {
            if sum == 0 { 0.0 } else { f64::INFINITY }
        } else {
            sum.abs_diff(undergraduate) as f64 / undergraduate as f64
        };
        check(&mut issues, deviation <= settings.race_sum_tolerance, "demographics.byRace", || {
            format!(
                "race categories sum to {}, undergraduate total is {} ({:.1}% off)",
                sum,
                undergraduate,
                deviation * 100.0
            )
        });
    }
    if let (Some(residency), Some(undergraduate)) = (demographics.by_residency, undergraduate) {
        let total = residency.total();
        check(&mut issues, total == Some(undergraduate), "demographics.byResidency", || match total {
            Some(total) => format!("residency sums to {}, undergraduate total is {}", total, undergraduate),
            None => format!("residency parts overflow, undergraduate total is {}", undergraduate),
        });
    }

    let costs = &record.costs;
    if let (Some(tuition), Some(fees), Some(room), Some(total)) =
        (costs.tuition, costs.fees, costs.room_and_board, costs.total_coa)
    {
        check(&mut issues, cost_sum(tuition, fees, room) == Some(total), "costs.totalCOA", || {
            format!("total {} differs from {} + {} + {}", total, tuition, fees, room)
        });
    }

    issues
}
