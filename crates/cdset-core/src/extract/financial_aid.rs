//! H2 need-based aid.

use regex::Regex;
use rust_decimal::Decimal;

use super::numbers::{parse_amount, parse_percent, to_rate};
use super::patterns::*;
use super::registry::{DescribeRules, Rule, RuleEra, RuleSet};
use super::{ScanContext, SectionOutput};
use crate::models::FinancialAid;

fn captured_amount(scan: &ScanContext, re: &Regex) -> Option<u64> {
    re.captures(&scan.joined)
        .and_then(|caps| parse_amount(&caps[1]))
}

fn captured_percent(scan: &ScanContext, re: &Regex) -> Option<Decimal> {
    re.captures(&scan.joined)
        .and_then(|caps| parse_percent(&caps[1]))
}

/// The j) and k) rows in encounter order: package, then grant.
fn jk_pair(scan: &ScanContext) -> Option<(u64, u64)> {
    let caps = H2_JK_PAIR.captures(&scan.joined)?;
    Some((parse_amount(&caps[1])?, parse_amount(&caps[2])?))
}

fn package_labeled(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &AID_PACKAGE)
}

fn package_h2j(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &H2J_ROW)
}

fn package_pair(scan: &ScanContext) -> Option<u64> {
    jk_pair(scan).map(|(package, _)| package)
}

fn grant_labeled(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &NEED_BASED_GRANT)
}

fn grant_h2k(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &H2K_ROW)
}

fn grant_pair(scan: &ScanContext) -> Option<u64> {
    jk_pair(scan).map(|(_, grant)| grant)
}

fn need_met(scan: &ScanContext) -> Option<Decimal> {
    captured_percent(scan, &NEED_MET)
}

fn need_fully_met(scan: &ScanContext) -> Option<Decimal> {
    captured_percent(scan, &NEED_FULLY_MET)
}

fn receiving_aid(scan: &ScanContext) -> Option<Decimal> {
    captured_percent(scan, &RECEIVING_AID)
}

#[rustfmt::skip]
pub static AVERAGE_AID_PACKAGE: RuleSet<u64> = RuleSet {
    field: "financialAid.averageAidPackage",
    rules: &[
        Rule { name: "h2j-average-aid-package", era: RuleEra::Any, rank: 0, matcher: package_labeled },
        Rule { name: "h2j-row", era: RuleEra::Any, rank: 1, matcher: package_h2j },
        Rule { name: "h2-jk-pair", era: RuleEra::Any, rank: 2, matcher: package_pair },
    ],
};

#[rustfmt::skip]
pub static AVERAGE_NEED_BASED_GRANT: RuleSet<u64> = RuleSet {
    field: "financialAid.averageNeedBasedGrant",
    rules: &[
        Rule { name: "h2k-average-need-based-grant", era: RuleEra::Any, rank: 0, matcher: grant_labeled },
        Rule { name: "h2k-row", era: RuleEra::Any, rank: 1, matcher: grant_h2k },
        Rule { name: "h2-jk-pair", era: RuleEra::Any, rank: 2, matcher: grant_pair },
    ],
};

#[rustfmt::skip]
pub static PERCENT_NEED_MET: RuleSet<Decimal> = RuleSet {
    field: "financialAid.percentNeedFullyMet",
    rules: &[
        Rule { name: "h2i-percentage-of-need-met", era: RuleEra::Any, rank: 0, matcher: need_met },
        Rule { name: "h2-need-fully-met", era: RuleEra::Any, rank: 1, matcher: need_fully_met },
    ],
};

#[rustfmt::skip]
pub static PERCENT_RECEIVING_AID: RuleSet<Decimal> = RuleSet {
    field: "financialAid.percentReceivingAid",
    rules: &[Rule { name: "h2-receiving-need-based-aid", era: RuleEra::Any, rank: 0, matcher: receiving_aid }],
};

pub fn rule_sets() -> Vec<&'static dyn DescribeRules> {
    vec![
        &PERCENT_RECEIVING_AID,
        &AVERAGE_AID_PACKAGE,
        &AVERAGE_NEED_BASED_GRANT,
        &PERCENT_NEED_MET,
    ]
}

/// Extract the financial aid section.
pub fn extract(scan: &ScanContext) -> SectionOutput<FinancialAid> {
    let mut out = SectionOutput::<FinancialAid>::new();

    out.partial.percent_receiving_aid = out
        .take(PERCENT_RECEIVING_AID.resolve(scan), &[PERCENT_RECEIVING_AID.field])
        .and_then(to_rate);
    out.partial.average_aid_package =
        out.take(AVERAGE_AID_PACKAGE.resolve(scan), &[AVERAGE_AID_PACKAGE.field]);
    out.partial.average_need_based_grant =
        out.take(AVERAGE_NEED_BASED_GRANT.resolve(scan), &[AVERAGE_NEED_BASED_GRANT.field]);
    out.partial.percent_need_met = out
        .take(PERCENT_NEED_MET.resolve(scan), &[PERCENT_NEED_MET.field])
        .and_then(to_rate);

    out
}
