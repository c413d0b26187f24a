//! C9 standardized test scores.

use regex::Regex;
use rust_decimal::Decimal;

use super::numbers::{parse_percent, to_rate};
use super::patterns::*;
use super::registry::{DescribeRules, Rule, RuleEra, RuleSet};
use super::{ScanContext, SectionOutput};
use crate::models::{ActScores, Percentiles, SatScores, TestScores};

/// Percentile scores on the first line labeled `label`.
///
/// Scale labels such as `(400 - 1600)` are dropped before reading numbers.
/// Lines with a percent sign belong to the score-range distribution table
/// and are skipped.
fn labeled_percentiles(scan: &ScanContext, label: &Regex) -> Option<Percentiles> {
    scan.labeled(label, None)
        .filter(|(line, _)| !line.contains('%'))
        .find_map(|(_, rest)| {
            let rest = SCALE_LABEL.replace_all(rest, " ");
            let scores: Vec<u32> = SCORE_TOKEN
                .find_iter(&rest)
                .filter_map(|m| m.as_str().parse().ok())
                .take(3)
                .collect();
            Percentiles::from_scores(&scores)
        })
}

fn submission_rate(scan: &ScanContext, re: &Regex) -> Option<Decimal> {
    re.captures(&scan.joined)
        .and_then(|caps| parse_percent(&caps[1]))
}

fn sat_composite(scan: &ScanContext) -> Option<Percentiles> {
    labeled_percentiles(scan, &SAT_COMPOSITE)
}

fn sat_ebrw(scan: &ScanContext) -> Option<Percentiles> {
    labeled_percentiles(scan, &SAT_EBRW)
}

fn sat_critical_reading(scan: &ScanContext) -> Option<Percentiles> {
    labeled_percentiles(scan, &SAT_CRITICAL_READING)
}

fn sat_math(scan: &ScanContext) -> Option<Percentiles> {
    labeled_percentiles(scan, &SAT_MATH)
}

fn act_composite(scan: &ScanContext) -> Option<Percentiles> {
    labeled_percentiles(scan, &ACT_COMPOSITE)
}

fn sat_submitting(scan: &ScanContext) -> Option<Decimal> {
    submission_rate(scan, &SAT_SUBMITTING)
}

fn act_submitting(scan: &ScanContext) -> Option<Decimal> {
    submission_rate(scan, &ACT_SUBMITTING)
}

#[rustfmt::skip]
pub static SAT_COMPOSITE_RULES: RuleSet<Percentiles> = RuleSet {
    field: "testScores.sat.composite",
    rules: &[Rule { name: "c9-sat-composite", era: RuleEra::Any, rank: 0, matcher: sat_composite }],
};

#[rustfmt::skip]
pub static SAT_READING_WRITING_RULES: RuleSet<Percentiles> = RuleSet {
    field: "testScores.sat.readingWriting",
    rules: &[
        Rule { name: "c9-sat-ebrw", era: RuleEra::Modern, rank: 0, matcher: sat_ebrw },
        Rule { name: "c9-sat-critical-reading", era: RuleEra::Legacy, rank: 0, matcher: sat_critical_reading },
    ],
};

#[rustfmt::skip]
pub static SAT_MATH_RULES: RuleSet<Percentiles> = RuleSet {
    field: "testScores.sat.math",
    rules: &[Rule { name: "c9-sat-math", era: RuleEra::Any, rank: 0, matcher: sat_math }],
};

#[rustfmt::skip]
pub static SAT_SUBMISSION_RULES: RuleSet<Decimal> = RuleSet {
    field: "testScores.sat.submissionRate",
    rules: &[Rule { name: "c9-percent-submitting-sat", era: RuleEra::Any, rank: 0, matcher: sat_submitting }],
};

#[rustfmt::skip]
pub static ACT_COMPOSITE_RULES: RuleSet<Percentiles> = RuleSet {
    field: "testScores.act.composite",
    rules: &[Rule { name: "c9-act-composite", era: RuleEra::Any, rank: 0, matcher: act_composite }],
};

#[rustfmt::skip]
pub static ACT_SUBMISSION_RULES: RuleSet<Decimal> = RuleSet {
    field: "testScores.act.submissionRate",
    rules: &[Rule { name: "c9-percent-submitting-act", era: RuleEra::Any, rank: 0, matcher: act_submitting }],
};

pub fn rule_sets() -> Vec<&'static dyn DescribeRules> {
    vec![
        &SAT_COMPOSITE_RULES,
        &SAT_READING_WRITING_RULES,
        &SAT_MATH_RULES,
        &SAT_SUBMISSION_RULES,
        &ACT_COMPOSITE_RULES,
        &ACT_SUBMISSION_RULES,
    ]
}

fn percentile_fields(block: &str) -> [String; 3] {
    ["p25", "p50", "p75"].map(|p| format!("{}.{}", block, p))
}

fn take_percentiles(
    out: &mut SectionOutput<TestScores>,
    set: &RuleSet<Percentiles>,
    scan: &ScanContext,
) -> Option<Percentiles> {
    let fields = percentile_fields(set.field);
    let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
    out.take(set.resolve(scan), &fields)
}

/// Extract the test score section.
pub fn extract(scan: &ScanContext) -> SectionOutput<TestScores> {
    let mut out = SectionOutput::<TestScores>::new();

    let reading_writing = take_percentiles(&mut out, &SAT_READING_WRITING_RULES, scan);
    let math = take_percentiles(&mut out, &SAT_MATH_RULES, scan);
    let composite = take_percentiles(&mut out, &SAT_COMPOSITE_RULES, scan).or_else(|| {
        let combined = reading_writing?.combine(&math?)?;
        for field in percentile_fields(SAT_COMPOSITE_RULES.field) {
            out.derived(&field);
        }
        Some(combined)
    });
    let sat_rate = out.take(SAT_SUBMISSION_RULES.resolve(scan), &[SAT_SUBMISSION_RULES.field]);

    if let Some(composite) = composite {
        out.partial.sat = Some(SatScores {
            composite,
            reading_writing,
            math,
            submission_rate: sat_rate.and_then(to_rate),
        });
    }

    let act = take_percentiles(&mut out, &ACT_COMPOSITE_RULES, scan);
    let act_rate = out.take(ACT_SUBMISSION_RULES.resolve(scan), &[ACT_SUBMISSION_RULES.field]);
    if let Some(composite) = act {
        out.partial.act = Some(ActScores {
            composite,
            submission_rate: act_rate.and_then(to_rate),
        });
    }

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

    #[test]
    fn test_two_score_composite_with_zero_submission() {
        let out = extract(&scan("SAT Composite 1370 1540\nPercent submitting SAT scores 0%"));
        let sat = out.partial.sat.unwrap();
        assert_eq!(sat.composite, Percentiles { p25: 1370, p50: 1455, p75: 1540 });
        assert_eq!(sat.submission_rate, Some(0.0));
        assert!(out.sources.contains_key("testScores.sat.composite.p50"));
    }

    #[test]
    fn test_three_scores_and_scale_label() {
        let out = extract(&scan("SAT Composite (400 - 1600) 1450 1510 1560\nACT Composite (1 - 36) 33 34 35"));
        let sat = out.partial.sat.unwrap();
        assert_eq!(sat.composite, Percentiles { p25: 1450, p50: 1510, p75: 1560 });
        assert_eq!(out.partial.act.unwrap().composite.p75, 35);
    }

    #[test]
    fn test_reading_rules_disagree_without_era() {
        let text = "\
SAT Evidence-Based Reading and Writing 650 720
SAT Critical Reading 640 730
";
        let out = extract(&scan(text));
        assert!(matches!(
            &out.issues[..],
            [ExtractionIssue::AmbiguousMatch { field, kept, candidates }]
                if field == "testScores.sat.readingWriting"
                    && kept == "c9-sat-ebrw"
                    && candidates.len() == 2
        ));

        let with_math = extract(&scan(&format!("{}SAT Math 700 780\n", text)));
        let sat = with_math.partial.sat.unwrap();
        assert_eq!(sat.reading_writing.map(|p| p.p25), Some(650));
    }

    #[test]
    fn test_reading_rules_follow_detected_era() {
        let text = "\
Total first-time, first-year (degree-seeking) men who applied 100
SAT Evidence-Based Reading and Writing 650 720
SAT Critical Reading 640 730
SAT Math 700 780
";
        let out = extract(&scan(text));
        assert!(out.issues.is_empty());
        assert_eq!(out.partial.sat.unwrap().reading_writing.map(|p| p.p25), Some(640));
    }

    #[test]
    fn test_composite_derived_from_sections() {
        let text = "\
SAT Evidence-Based Reading and Writing 700 760
SAT Math 720 790
Percent submitting SAT scores 45%
";
        let out = extract(&scan(text));
        let sat = out.partial.sat.unwrap();
        assert_eq!(sat.composite, Percentiles { p25: 1420, p50: 1485, p75: 1550 });
        assert_eq!(sat.submission_rate, Some(0.45));
        assert_eq!(
            out.sources.get("testScores.sat.composite.p25"),
            Some(&super::super::Source::Derived)
        );
    }

    #[test]
    fn test_score_range_distribution_is_ignored() {
        let out = extract(&scan("SAT Math 700-800 65% 70%"));
        assert!(out.partial.sat.is_none());
        assert!(out.sources.is_empty());
    }

    #[test]
    fn test_no_scores_means_no_block() {
        let out = extract(&scan("Percent submitting ACT scores 12%"));
        assert!(out.partial.act.is_none());
        assert!(out.partial.sat.is_none());
    }
}
