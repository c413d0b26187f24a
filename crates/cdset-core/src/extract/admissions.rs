//! C1 admissions funnel and C21/C22 early plans.

use regex::Regex;
use tracing::warn;

use super::numbers::{counts_in, parse_count};
use super::patterns::*;
use super::registry::{DescribeRules, Rule, RuleEra, RuleSet};
use super::{row_counts, ScanContext, SectionOutput};
use crate::models::{Admissions, EarlyPlan, GenderCounts, GenderSplit};

/// A funnel count, with its gender split when the document gave one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub total: u64,
    pub men: Option<u64>,
    pub women: Option<u64>,
}

impl Tally {
    fn gendered(men: u64, women: u64) -> Option<Self> {
        Some(Self {
            total: add_counts(men, women)?,
            men: Some(men),
            women: Some(women),
        })
    }

    fn combined(total: u64) -> Self {
        Self {
            total,
            men: None,
            women: None,
        }
    }
}

/// Sum of two counts read from the same row; `None` when it overflows.
fn add_counts(a: u64, b: u64) -> Option<u64> {
    let sum = a.checked_add(b);
    if sum.is_none() {
        warn!("Count overflow adding {} and {}, ignoring the row", a, b);
    }
    sum
}

fn part_time() -> Option<&'static Regex> {
    Some(&*PART_TIME)
}

fn gendered_lines(scan: &ScanContext, men: &Regex, women: &Regex) -> Option<Tally> {
    let men = scan.count_after(men, part_time())?;
    let women = scan.count_after(women, part_time())?;
    Tally::gendered(men, women)
}

/// Full-time rows first, then any row that is not part-time.
fn full_time_count(scan: &ScanContext, label: &Regex) -> Option<u64> {
    scan.labeled(label, part_time())
        .filter(|(line, _)| FULL_TIME.is_match(line))
        .find_map(|(_, rest)| counts_in(rest).first().copied())
        .or_else(|| scan.count_after(label, part_time()))
}

fn combined_line(scan: &ScanContext, label: &Regex) -> Option<Tally> {
    scan.counts_after(label, part_time(), 2)
        .and_then(|counts| add_counts(counts[0], counts[1]))
        .map(Tally::combined)
}

fn gendered_rows(scan: &ScanContext, men: &Regex, women: &Regex) -> Option<Tally> {
    let first = |label: &Regex| {
        scan.table_rows(label, part_time())
            .find_map(|row| row_counts(row).first().copied())
    };
    Tally::gendered(first(men)?, first(women)?)
}

fn combined_rows(scan: &ScanContext, label: &Regex) -> Option<Tally> {
    scan.table_rows(label, part_time())
        .map(row_counts)
        .find(|counts| counts.len() >= 2)
        .and_then(|counts| add_counts(counts[0], counts[1]))
        .map(Tally::combined)
}

fn total_line(scan: &ScanContext, label: &Regex) -> Option<Tally> {
    scan.count_after(label, part_time()).map(Tally::combined)
}

fn applied_gendered(scan: &ScanContext) -> Option<Tally> {
    gendered_lines(scan, &MEN_APPLIED, &WOMEN_APPLIED)
}

fn applied_combined(scan: &ScanContext) -> Option<Tally> {
    combined_line(scan, &STUDENTS_APPLIED)
}

fn applied_gendered_rows(scan: &ScanContext) -> Option<Tally> {
    gendered_rows(scan, &MEN_APPLIED, &WOMEN_APPLIED)
}

fn applied_combined_rows(scan: &ScanContext) -> Option<Tally> {
    combined_rows(scan, &STUDENTS_APPLIED)
}

fn applied_total(scan: &ScanContext) -> Option<Tally> {
    total_line(scan, &TOTAL_APPLIED)
}

fn admitted_gendered(scan: &ScanContext) -> Option<Tally> {
    gendered_lines(scan, &MEN_ADMITTED, &WOMEN_ADMITTED)
}

fn admitted_combined(scan: &ScanContext) -> Option<Tally> {
    combined_line(scan, &STUDENTS_ADMITTED)
}

fn admitted_gendered_rows(scan: &ScanContext) -> Option<Tally> {
    gendered_rows(scan, &MEN_ADMITTED, &WOMEN_ADMITTED)
}

fn admitted_combined_rows(scan: &ScanContext) -> Option<Tally> {
    combined_rows(scan, &STUDENTS_ADMITTED)
}

fn admitted_total(scan: &ScanContext) -> Option<Tally> {
    total_line(scan, &TOTAL_ADMITTED)
}

fn enrolled_gendered(scan: &ScanContext) -> Option<Tally> {
    let men = full_time_count(scan, &MEN_ENROLLED)?;
    let women = full_time_count(scan, &WOMEN_ENROLLED)?;
    Tally::gendered(men, women)
}

fn enrolled_combined(scan: &ScanContext) -> Option<Tally> {
    combined_line(scan, &STUDENTS_ENROLLED)
}

fn enrolled_gendered_rows(scan: &ScanContext) -> Option<Tally> {
    gendered_rows(scan, &MEN_ENROLLED, &WOMEN_ENROLLED)
}

fn enrolled_combined_rows(scan: &ScanContext) -> Option<Tally> {
    combined_rows(scan, &STUDENTS_ENROLLED)
}

fn enrolled_total(scan: &ScanContext) -> Option<Tally> {
    total_line(scan, &TOTAL_ENROLLED)
}

#[rustfmt::skip]
pub static APPLIED: RuleSet<Tally> = RuleSet {
    field: "admissions.applied",
    rules: &[
        Rule { name: "c1-gendered-applied", era: RuleEra::Legacy, rank: 0, matcher: applied_gendered },
        Rule { name: "c1-combined-applied", era: RuleEra::Modern, rank: 1, matcher: applied_combined },
        Rule { name: "c1-table-gendered-applied", era: RuleEra::Legacy, rank: 2, matcher: applied_gendered_rows },
        Rule { name: "c1-table-combined-applied", era: RuleEra::Modern, rank: 2, matcher: applied_combined_rows },
        Rule { name: "c1-total-applied", era: RuleEra::Any, rank: 3, matcher: applied_total },
    ],
};

#[rustfmt::skip]
pub static ADMITTED: RuleSet<Tally> = RuleSet {
    field: "admissions.admitted",
    rules: &[
        Rule { name: "c1-gendered-admitted", era: RuleEra::Legacy, rank: 0, matcher: admitted_gendered },
        Rule { name: "c1-combined-admitted", era: RuleEra::Modern, rank: 1, matcher: admitted_combined },
        Rule { name: "c1-table-gendered-admitted", era: RuleEra::Legacy, rank: 2, matcher: admitted_gendered_rows },
        Rule { name: "c1-table-combined-admitted", era: RuleEra::Modern, rank: 2, matcher: admitted_combined_rows },
        Rule { name: "c1-total-admitted", era: RuleEra::Any, rank: 3, matcher: admitted_total },
    ],
};

#[rustfmt::skip]
pub static ENROLLED: RuleSet<Tally> = RuleSet {
    field: "admissions.enrolled",
    rules: &[
        Rule { name: "c1-gendered-enrolled", era: RuleEra::Legacy, rank: 0, matcher: enrolled_gendered },
        Rule { name: "c1-combined-enrolled", era: RuleEra::Modern, rank: 1, matcher: enrolled_combined },
        Rule { name: "c1-table-gendered-enrolled", era: RuleEra::Legacy, rank: 2, matcher: enrolled_gendered_rows },
        Rule { name: "c1-table-combined-enrolled", era: RuleEra::Modern, rank: 2, matcher: enrolled_combined_rows },
        Rule { name: "c1-total-enrolled", era: RuleEra::Any, rank: 3, matcher: enrolled_total },
    ],
};

fn captured_count(text: &str, re: &Regex) -> Option<u64> {
    re.captures(text).and_then(|caps| parse_count(&caps[1]))
}

fn ed_received(scan: &ScanContext) -> Option<u64> {
    captured_count(&scan.joined, &ED_RECEIVED)
}

fn ed_admitted(scan: &ScanContext) -> Option<u64> {
    captured_count(&scan.joined, &ED_ADMITTED)
}

fn ea_received(scan: &ScanContext) -> Option<u64> {
    captured_count(&scan.joined, &EA_RECEIVED)
}

fn ea_admitted(scan: &ScanContext) -> Option<u64> {
    captured_count(&scan.joined, &EA_ADMITTED)
}

#[rustfmt::skip]
pub static EARLY_DECISION_APPLIED: RuleSet<u64> = RuleSet {
    field: "admissions.earlyDecision.applied",
    rules: &[Rule { name: "c21-ed-received", era: RuleEra::Any, rank: 0, matcher: ed_received }],
};

#[rustfmt::skip]
pub static EARLY_DECISION_ADMITTED: RuleSet<u64> = RuleSet {
    field: "admissions.earlyDecision.admitted",
    rules: &[Rule { name: "c21-ed-admitted", era: RuleEra::Any, rank: 0, matcher: ed_admitted }],
};

#[rustfmt::skip]
pub static EARLY_ACTION_APPLIED: RuleSet<u64> = RuleSet {
    field: "admissions.earlyAction.applied",
    rules: &[Rule { name: "c22-ea-received", era: RuleEra::Any, rank: 0, matcher: ea_received }],
};

#[rustfmt::skip]
pub static EARLY_ACTION_ADMITTED: RuleSet<u64> = RuleSet {
    field: "admissions.earlyAction.admitted",
    rules: &[Rule { name: "c22-ea-admitted", era: RuleEra::Any, rank: 0, matcher: ea_admitted }],
};

pub fn rule_sets() -> Vec<&'static dyn DescribeRules> {
    vec![
        &APPLIED,
        &ADMITTED,
        &ENROLLED,
        &EARLY_DECISION_APPLIED,
        &EARLY_DECISION_ADMITTED,
        &EARLY_ACTION_APPLIED,
        &EARLY_ACTION_ADMITTED,
    ]
}

fn early_plan(
    out: &mut SectionOutput<Admissions>,
    applied: &RuleSet<u64>,
    admitted: &RuleSet<u64>,
    scan: &ScanContext,
) -> Option<EarlyPlan> {
    let applied_hit = applied.resolve(scan)?;
    let admitted_hit = admitted.resolve(scan)?;
    Some(EarlyPlan {
        applied: out.take(Some(applied_hit), &[applied.field])?,
        admitted: out.take(Some(admitted_hit), &[admitted.field])?,
    })
}

/// Extract the admissions section.
pub fn extract(scan: &ScanContext) -> SectionOutput<Admissions> {
    let mut out = SectionOutput::<Admissions>::new();

    let funnel = [
        (&APPLIED, "applied"),
        (&ADMITTED, "admitted"),
        (&ENROLLED, "enrolled"),
    ];
    let mut tallies = Vec::with_capacity(funnel.len());
    for (set, stage) in funnel {
        let resolved = set.resolve(scan);
        let gendered = resolved
            .as_ref()
            .is_some_and(|r| r.value.men.is_some() && r.value.women.is_some());
        let men_field = format!("admissions.byGender.men.{}", stage);
        let women_field = format!("admissions.byGender.women.{}", stage);
        let fields: Vec<&str> = if gendered {
            vec![set.field, men_field.as_str(), women_field.as_str()]
        } else {
            vec![set.field]
        };
        tallies.push(out.take(resolved, &fields));
    }

    let [applied, admitted, enrolled] = [tallies[0], tallies[1], tallies[2]];
    out.partial.applied = applied.map(|t| t.total);
    out.partial.admitted = admitted.map(|t| t.total);
    out.partial.enrolled = enrolled.map(|t| t.total);

    if tallies.iter().flatten().any(|t| t.men.is_some()) {
        let side = |pick: fn(&Tally) -> Option<u64>| GenderCounts {
            applied: applied.as_ref().and_then(pick),
            admitted: admitted.as_ref().and_then(pick),
            enrolled: enrolled.as_ref().and_then(pick),
        };
        out.partial.by_gender = Some(GenderSplit {
            men: side(|t| t.men),
            women: side(|t| t.women),
        });
    }

    out.partial.early_decision =
        early_plan(&mut out, &EARLY_DECISION_APPLIED, &EARLY_DECISION_ADMITTED, scan);
    out.partial.early_action =
        early_plan(&mut out, &EARLY_ACTION_APPLIED, &EARLY_ACTION_ADMITTED, scan);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionIssue;
    use crate::models::ExtractionSettings;
    use pretty_assertions::assert_eq;

    fn scan(text: &str) -> ScanContext {
        ScanContext::from_text(text, &ExtractionSettings::default())
    }

    const LEGACY: &str = "\
C1 First-time, first-year (freshman) students
Total first-time, first-year (degree-seeking) men who applied 11,200
Total first-time, first-year (degree-seeking) women who applied 12,300
Total first-time, first-year (degree-seeking) men who were admitted 1,100
Total first-time, first-year (degree-seeking) women who were admitted 1,250
Total part-time, first-time, first-year (degree-seeking) men who enrolled 4
Total full-time, first-time, first-year (degree-seeking) men who enrolled 800
Total part-time, first-time, first-year (degree-seeking) women who enrolled 3
Total full-time, first-time, first-year (degree-seeking) women who enrolled 850
Number of early decision applications received by your institution 4,000
Number of applicants admitted under early decision plan 700
";

    #[test]
    fn test_legacy_gendered_sums() {
        let out = extract(&scan(LEGACY));
        assert_eq!(out.partial.applied, Some(23500));
        assert_eq!(out.partial.admitted, Some(2350));
        assert_eq!(out.partial.enrolled, Some(1650));

        let split = out.partial.by_gender.unwrap();
        assert_eq!(split.men.applied, Some(11200));
        assert_eq!(split.women.enrolled, Some(850));
        assert_eq!(
            out.sources.get("admissions.applied"),
            Some(&super::super::Source::Rule("c1-gendered-applied"))
        );
    }

    #[test]
    fn test_early_decision_needs_both_counts() {
        let out = extract(&scan(LEGACY));
        assert_eq!(
            out.partial.early_decision,
            Some(EarlyPlan { applied: 4000, admitted: 700 })
        );
        assert!(out.partial.early_action.is_none());

        let only_received = extract(&scan(
            "Number of early action applications received by your institution 9,000",
        ));
        assert!(only_received.partial.early_action.is_none());
        assert!(!only_received.sources.contains_key("admissions.earlyAction.applied"));
    }

    #[test]
    fn test_modern_combined_line() {
        let text = "\
Total first-time, first-year students who applied in Fall 2023 14,000 16,000
Total first-time, first-year students admitted in Fall 2023 1,500 1,700
Total full-time, first-time, first-year students enrolled in Fall 2023 700 750
";
        let out = extract(&scan(text));
        assert_eq!(out.partial.applied, Some(30000));
        assert_eq!(out.partial.admitted, Some(3200));
        assert_eq!(out.partial.enrolled, Some(1450));
        assert!(out.partial.by_gender.is_none());
    }

    #[test]
    fn test_total_line_is_lowest_priority() {
        let text = "\
Total first-time, first-year (degree-seeking) who applied 40,000
Total first-time, first-year (degree-seeking) men who applied 11,200
Total first-time, first-year (degree-seeking) women who applied 12,300
";
        let out = extract(&scan(text));
        assert_eq!(out.partial.applied, Some(23500));

        let total_only = extract(&scan("Total first-time, first-year (degree-seeking) who applied 40,000"));
        assert_eq!(total_only.partial.applied, Some(40000));
    }

    #[test]
    fn test_overflowing_gendered_sum_is_not_taken() {
        let text = "\
Total first-time, first-year (degree-seeking) men who applied 18446744073709551615
Total first-time, first-year (degree-seeking) women who applied 1
";
        let out = extract(&scan(text));
        assert_eq!(out.partial.applied, None);
        assert!(!out.sources.contains_key("admissions.applied"));
    }

    #[test]
    fn test_single_gender_line_falls_through() {
        let out = extract(&scan("Total first-time, first-year (degree-seeking) men who applied 11,200"));
        assert_eq!(out.partial.applied, None);
    }

    #[test]
    fn test_forced_legacy_era_skips_modern_rules() {
        let settings = ExtractionSettings {
            era: crate::models::EraSetting::Legacy,
            ..ExtractionSettings::default()
        };
        let text = "Total first-time, first-year students who applied in Fall 2023 14,000 16,000";
        let out = extract(&ScanContext::from_text(text, &settings));
        assert_eq!(out.partial.applied, None);
        assert!(out.issues.iter().all(|i| !matches!(i, ExtractionIssue::AmbiguousMatch { .. })));
    }
}
