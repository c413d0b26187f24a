//! Year record and school dataset models.
//!
//! Field names serialize in camelCase to match the dashboard's JSON shape.
//! Values that were not extracted are `None` and omitted from the output,
//! never written as zero.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One academic year of CDS data for one institution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YearRecord {
    pub admissions: Admissions,
    pub test_scores: TestScores,
    pub demographics: Demographics,
    pub costs: Costs,
    pub financial_aid: FinancialAid,
}

/// First-time, first-year admissions funnel (CDS section C1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Admissions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admitted: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled: Option<u64>,

    /// admitted / applied, 0 when nobody applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance_rate: Option<f64>,

    /// enrolled / admitted, 0 when nobody was admitted.
    #[serde(rename = "yield", skip_serializing_if = "Option::is_none")]
    pub yield_rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub early_decision: Option<EarlyPlan>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub early_action: Option<EarlyPlan>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_gender: Option<GenderSplit>,
}

/// Early decision / early action counts (CDS C21, C22).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyPlan {
    pub applied: u64,
    pub admitted: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderSplit {
    pub men: GenderCounts,
    pub women: GenderCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenderCounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admitted: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled: Option<u64>,
}

/// Standardized test scores (CDS C8, C9).
///
/// A missing block means the document reported nothing for that test,
/// which is different from a block with a 0% submission rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestScores {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<SatScores>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub act: Option<ActScores>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SatScores {
    pub composite: Percentiles,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_writing: Option<Percentiles>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub math: Option<Percentiles>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActScores {
    pub composite: Percentiles,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_rate: Option<f64>,
}

/// 25th / 50th / 75th percentile scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p25: u32,
    pub p50: u32,
    pub p75: u32,
}

impl Percentiles {
    /// Build from the scores found on a labeled line.
    ///
    /// Three values are taken as p25/p50/p75; two values give p25/p75 with
    /// p50 at their integer midpoint.
    pub fn from_scores(scores: &[u32]) -> Option<Self> {
        let mut sorted = scores.to_vec();
        sorted.sort_unstable();
        match sorted.as_slice() {
            [p25, p50, p75] => Some(Self {
                p25: *p25,
                p50: *p50,
                p75: *p75,
            }),
            [p25, p75] => Some(Self {
                p25: *p25,
                p50: p25 + (p75 - p25) / 2,
                p75: *p75,
            }),
            _ => None,
        }
    }

    /// Sum of two section scores, used to derive a composite.
    pub fn combine(&self, other: &Percentiles) -> Option<Self> {
        Some(Self {
            p25: self.p25.checked_add(other.p25)?,
            p50: self.p50.checked_add(other.p50)?,
            p75: self.p75.checked_add(other.p75)?,
        })
    }

    pub fn is_ordered(&self) -> bool {
        self.p25 <= self.p50 && self.p50 <= self.p75
    }
}

/// Enrollment and student-body composition (CDS B1, B2, F1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Demographics {
    pub enrollment: Enrollment,
    pub by_race: ByRace,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_residency: Option<ByResidency>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enrollment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub undergraduate: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduate: Option<u64>,
}

/// Undergraduate headcount by race/ethnicity. The nine categories are
/// mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ByRace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub international: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hispanic_latino: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_african_american: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asian: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub american_indian_alaska_native: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_hawaiian_pacific_islander: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_or_more_races: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown: Option<u64>,
}

/// The nine race/ethnicity categories of CDS B2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RaceCategory {
    International,
    HispanicLatino,
    BlackAfricanAmerican,
    White,
    Asian,
    AmericanIndianAlaskaNative,
    NativeHawaiianPacificIslander,
    TwoOrMoreRaces,
    Unknown,
}

impl RaceCategory {
    pub const ALL: [RaceCategory; 9] = [
        RaceCategory::International,
        RaceCategory::HispanicLatino,
        RaceCategory::BlackAfricanAmerican,
        RaceCategory::White,
        RaceCategory::Asian,
        RaceCategory::AmericanIndianAlaskaNative,
        RaceCategory::NativeHawaiianPacificIslander,
        RaceCategory::TwoOrMoreRaces,
        RaceCategory::Unknown,
    ];

    /// JSON key of this category.
    pub fn key(&self) -> &'static str {
        match self {
            RaceCategory::International => "international",
            RaceCategory::HispanicLatino => "hispanicLatino",
            RaceCategory::BlackAfricanAmerican => "blackAfricanAmerican",
            RaceCategory::White => "white",
            RaceCategory::Asian => "asian",
            RaceCategory::AmericanIndianAlaskaNative => "americanIndianAlaskaNative",
            RaceCategory::NativeHawaiianPacificIslander => "nativeHawaiianPacificIslander",
            RaceCategory::TwoOrMoreRaces => "twoOrMoreRaces",
            RaceCategory::Unknown => "unknown",
        }
    }
}

impl ByRace {
    pub fn get(&self, category: RaceCategory) -> Option<u64> {
        match category {
            RaceCategory::International => self.international,
            RaceCategory::HispanicLatino => self.hispanic_latino,
            RaceCategory::BlackAfricanAmerican => self.black_african_american,
            RaceCategory::White => self.white,
            RaceCategory::Asian => self.asian,
            RaceCategory::AmericanIndianAlaskaNative => self.american_indian_alaska_native,
            RaceCategory::NativeHawaiianPacificIslander => self.native_hawaiian_pacific_islander,
            RaceCategory::TwoOrMoreRaces => self.two_or_more_races,
            RaceCategory::Unknown => self.unknown,
        }
    }

    pub fn set(&mut self, category: RaceCategory, value: u64) {
        let slot = match category {
            RaceCategory::International => &mut self.international,
            RaceCategory::HispanicLatino => &mut self.hispanic_latino,
            RaceCategory::BlackAfricanAmerican => &mut self.black_african_american,
            RaceCategory::White => &mut self.white,
            RaceCategory::Asian => &mut self.asian,
            RaceCategory::AmericanIndianAlaskaNative => &mut self.american_indian_alaska_native,
            RaceCategory::NativeHawaiianPacificIslander => {
                &mut self.native_hawaiian_pacific_islander
            }
            RaceCategory::TwoOrMoreRaces => &mut self.two_or_more_races,
            RaceCategory::Unknown => &mut self.unknown,
        };
        *slot = Some(value);
    }

    /// Sum of all categories, or `None` unless every category is present.
    pub fn complete_sum(&self) -> Option<u64> {
        RaceCategory::ALL
            .iter()
            .try_fold(0u64, |sum, c| sum.checked_add(self.get(*c)?))
    }
}

/// Undergraduate residency partition. One side is always derived as a
/// residual, so the three parts sum exactly to the undergraduate total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByResidency {
    pub in_state: u64,
    pub out_of_state: u64,
    pub international: u64,
}

impl ByResidency {
    /// Sum of the three parts; `None` when it overflows.
    pub fn total(&self) -> Option<u64> {
        self.in_state
            .checked_add(self.out_of_state)?
            .checked_add(self.international)
    }
}

/// Annual cost of attendance (CDS G1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Costs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuition: Option<u64>,

    /// Zero is a legitimate value for institutions that bundle fees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_and_board: Option<u64>,

    #[serde(rename = "totalCOA", skip_serializing_if = "Option::is_none")]
    pub total_coa: Option<u64>,
}

/// Need-based aid figures (CDS H2).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FinancialAid {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_receiving_aid: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_aid_package: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_need_based_grant: Option<u64>,

    /// Average percent of need met.
    #[serde(rename = "percentNeedFullyMet", skip_serializing_if = "Option::is_none")]
    pub percent_need_met: Option<f64>,
}

/// All years of data for one institution, keyed by academic-year label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchoolDataset {
    pub name: String,
    pub slug: String,
    pub years: BTreeMap<String, YearRecord>,
}

impl SchoolDataset {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            years: BTreeMap::new(),
        }
    }

    /// Insert a year. Returns the record back if the label is taken.
    pub fn insert(&mut self, year: impl Into<String>, record: YearRecord) -> Result<(), YearRecord> {
        let year = year.into();
        if self.years.contains_key(&year) {
            return Err(record);
        }
        self.years.insert(year, record);
        Ok(())
    }

    /// Serialize as pretty JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Write to `<dir>/<slug>.json`, replacing any existing file.
    pub fn write_to_dir(&self, dir: &Path) -> crate::Result<std::path::PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", self.slug));
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles_from_two_scores() {
        let p = Percentiles::from_scores(&[1540, 1370]).unwrap();
        assert_eq!(p, Percentiles { p25: 1370, p50: 1455, p75: 1540 });
        assert!(Percentiles::from_scores(&[1400]).is_none());
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let mut record = YearRecord::default();
        record.admissions.applied = Some(23500);
        record.costs.fees = Some(0);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["admissions"]["applied"], 23500);
        assert!(json["admissions"].get("admitted").is_none());
        assert_eq!(json["costs"]["fees"], 0);
        assert!(json["testScores"].get("sat").is_none());
    }

    #[test]
    fn test_race_complete_sum() {
        let mut by_race = ByRace::default();
        for category in RaceCategory::ALL {
            by_race.set(category, 10);
        }
        assert_eq!(by_race.complete_sum(), Some(90));

        by_race.unknown = None;
        assert_eq!(by_race.complete_sum(), None);
    }

    #[test]
    fn test_dataset_rejects_duplicate_year() {
        let mut dataset = SchoolDataset::new("Brown University", "brown");
        assert!(dataset.insert("2020-2021", YearRecord::default()).is_ok());
        assert!(dataset.insert("2020-2021", YearRecord::default()).is_err());
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let mut record = YearRecord::default();
        record.admissions.yield_rate = Some(0.6521);
        record.costs.total_coa = Some(91234);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"yield\":0.6521"));
        assert!(json.contains("\"totalCOA\":91234"));
        let back: YearRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
