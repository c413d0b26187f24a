//! B1 enrollment, B2 race/ethnicity and F1 residency share.

use std::collections::BTreeMap;

use regex::Regex;
use rust_decimal::Decimal;

use super::numbers::{counts_in, percents_in};
use super::patterns::*;
use super::registry::{DescribeRules, Rule, RuleEra, RuleSet};
use super::{ScanContext, SectionOutput};
use crate::models::{Demographics, RaceCategory};

/// Demographics plus the out-of-state share the reconciler needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemographicsPartial {
    pub demographics: Demographics,
    pub out_of_state_share: Option<Decimal>,
}

/// Undergraduate headcount per race category.
pub type RaceCounts = BTreeMap<RaceCategory, u64>;

/// Row label prefixes per category, matched after dropping `non-Hispanic`.
const RACE_LABELS: &[(RaceCategory, &[&str])] = &[
    (RaceCategory::International, &["nonresident", "u.s. nonresident", "international"]),
    (RaceCategory::HispanicLatino, &["hispanic"]),
    (RaceCategory::BlackAfricanAmerican, &["black"]),
    (RaceCategory::White, &["white"]),
    (RaceCategory::Asian, &["asian"]),
    (RaceCategory::AmericanIndianAlaskaNative, &["american indian"]),
    (RaceCategory::NativeHawaiianPacificIslander, &["native hawaiian"]),
    (RaceCategory::TwoOrMoreRaces, &["two or more"]),
    (
        RaceCategory::Unknown,
        &["race and/or ethnicity unknown", "race/ethnicity unknown", "unknown"],
    ),
];

/// Category named at the start of a row label.
pub fn classify_race(label: &str) -> Option<RaceCategory> {
    let cleaned = NON_HISPANIC.replace_all(label, "").to_lowercase();
    let cleaned = cleaned.trim_start_matches(|c: char| !c.is_alphabetic());
    RACE_LABELS
        .iter()
        .find(|(_, variants)| variants.iter().any(|v| cleaned.starts_with(v)))
        .map(|(category, _)| *category)
}

/// Text between the B2 heading and the next B3/B4 heading.
fn b2_section(text: &str) -> Option<&str> {
    let start = B2_START.find(text)?;
    let body = &text[start.end()..];
    let end = B2_END.find(body).map(|m| m.start()).unwrap_or(body.len());
    Some(&body[..end])
}

/// Rows take their last number, the total-undergraduate column. Cohort
/// columns are never summed.
fn race_from_section(scan: &ScanContext) -> Option<RaceCounts> {
    let section = b2_section(&scan.text)?;
    let mut counts = RaceCounts::new();
    for line in section.lines() {
        let Some(category) = classify_race(line) else {
            continue;
        };
        if let Some(value) = counts_in(line).last() {
            counts.entry(category).or_insert(*value);
        }
    }
    (!counts.is_empty()).then_some(counts)
}

fn race_from_tables(scan: &ScanContext) -> Option<RaceCounts> {
    let mut counts = RaceCounts::new();
    for row in scan.tables.iter().flat_map(|t| t.rows.iter()) {
        let Some(category) = row.first().and_then(|label| classify_race(label)) else {
            continue;
        };
        if let Some(value) = super::row_counts(row).last() {
            counts.entry(category).or_insert(*value);
        }
    }
    (!counts.is_empty()).then_some(counts)
}

fn largest_after(scan: &ScanContext, label: &Regex) -> Option<u64> {
    scan.labeled(label, None)
        .find_map(|(_, rest)| counts_in(rest).into_iter().max())
}

fn total_all_undergraduates(scan: &ScanContext) -> Option<u64> {
    largest_after(scan, &TOTAL_UNDERGRADUATES)
}

fn total_undergraduate_enrollment(scan: &ScanContext) -> Option<u64> {
    largest_after(scan, &TOTAL_UNDERGRADUATE_ENROLLMENT)
}

fn total_graduate(scan: &ScanContext) -> Option<u64> {
    largest_after(scan, &TOTAL_GRADUATE)
}

fn grand_total(scan: &ScanContext) -> Option<u64> {
    largest_after(scan, &GRAND_TOTAL)
}

/// Last percentage of the F1 row, the all-undergraduates column.
fn out_of_state_share(scan: &ScanContext) -> Option<Decimal> {
    OUT_OF_STATE
        .captures(&scan.joined)
        .and_then(|caps| percents_in(&caps[1]).last().copied())
}

#[rustfmt::skip]
pub static UNDERGRADUATE: RuleSet<u64> = RuleSet {
    field: "demographics.enrollment.undergraduate",
    rules: &[
        Rule { name: "b1-total-all-undergraduates", era: RuleEra::Any, rank: 0, matcher: total_all_undergraduates },
        Rule { name: "b1-total-undergraduate-enrollment", era: RuleEra::Any, rank: 1, matcher: total_undergraduate_enrollment },
    ],
};

#[rustfmt::skip]
pub static GRADUATE: RuleSet<u64> = RuleSet {
    field: "demographics.enrollment.graduate",
    rules: &[Rule { name: "b1-total-graduate-professional", era: RuleEra::Any, rank: 0, matcher: total_graduate }],
};

#[rustfmt::skip]
pub static TOTAL: RuleSet<u64> = RuleSet {
    field: "demographics.enrollment.total",
    rules: &[Rule { name: "b1-grand-total", era: RuleEra::Any, rank: 0, matcher: grand_total }],
};

#[rustfmt::skip]
pub static BY_RACE: RuleSet<RaceCounts> = RuleSet {
    field: "demographics.byRace",
    rules: &[
        Rule { name: "b2-section-rows", era: RuleEra::Any, rank: 0, matcher: race_from_section },
        Rule { name: "b2-table-rows", era: RuleEra::Any, rank: 1, matcher: race_from_tables },
    ],
};

#[rustfmt::skip]
pub static OUT_OF_STATE_SHARE: RuleSet<Decimal> = RuleSet {
    field: "demographics.outOfStateShare",
    rules: &[Rule { name: "f1-percent-out-of-state", era: RuleEra::Any, rank: 0, matcher: out_of_state_share }],
};

pub fn rule_sets() -> Vec<&'static dyn DescribeRules> {
    vec![&UNDERGRADUATE, &GRADUATE, &TOTAL, &BY_RACE, &OUT_OF_STATE_SHARE]
}

/// Extract the demographics section.
pub fn extract(scan: &ScanContext) -> SectionOutput<DemographicsPartial> {
    let mut out = SectionOutput::<DemographicsPartial>::new();

    let undergraduate = out.take(UNDERGRADUATE.resolve(scan), &[UNDERGRADUATE.field]);
    let graduate = out.take(GRADUATE.resolve(scan), &[GRADUATE.field]);
    let total = out.take(TOTAL.resolve(scan), &[TOTAL.field]);
    out.partial.demographics.enrollment.undergraduate = undergraduate;
    out.partial.demographics.enrollment.graduate = graduate;
    out.partial.demographics.enrollment.total = total;

    if let Some(resolved) = BY_RACE.resolve(scan) {
        let fields: Vec<String> = resolved
            .value
            .keys()
            .map(|c| format!("demographics.byRace.{}", c.key()))
            .collect();
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        if let Some(counts) = out.take(Some(resolved), &fields) {
            for (category, value) in counts {
                out.partial.demographics.by_race.set(category, value);
            }
        }
    }

    // The share is an input to the residency split, not a record field.
    out.partial.out_of_state_share = OUT_OF_STATE_SHARE.resolve(scan).map(|r| r.value);

    out
}
