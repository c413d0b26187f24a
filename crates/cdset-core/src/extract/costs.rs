//! G1 cost of attendance.
//!
//! Cost rows wrap across lines in most reports, so every rule here reads the
//! joined text.

use regex::Regex;

use super::numbers::parse_amount;
use super::patterns::*;
use super::registry::{DescribeRules, Rule, RuleEra, RuleSet};
use super::{ScanContext, SectionOutput};
use crate::models::Costs;

fn captured_amount(scan: &ScanContext, re: &Regex) -> Option<u64> {
    re.captures(&scan.joined)
        .and_then(|caps| parse_amount(&caps[1]))
}

fn tuition_colon(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &TUITION_COLON)
}

fn tuition_dollar(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &TUITION_DOLLAR)
}

fn fees_colon(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &FEES_COLON)
}

fn fees_dollar(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &FEES_DOLLAR)
}

fn food_housing_on_campus(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &FOOD_HOUSING_ON_CAMPUS)
}

fn food_housing(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &FOOD_HOUSING)
}

fn room_board_on_campus(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &ROOM_BOARD_ON_CAMPUS)
}

fn room_board(scan: &ScanContext) -> Option<u64> {
    captured_amount(scan, &ROOM_BOARD)
}

#[rustfmt::skip]
pub static TUITION: RuleSet<u64> = RuleSet {
    field: "costs.tuition",
    rules: &[
        Rule { name: "g1-tuition-colon", era: RuleEra::Any, rank: 0, matcher: tuition_colon },
        Rule { name: "g1-tuition-dollar", era: RuleEra::Any, rank: 1, matcher: tuition_dollar },
    ],
};

#[rustfmt::skip]
pub static FEES: RuleSet<u64> = RuleSet {
    field: "costs.fees",
    rules: &[
        Rule { name: "g1-required-fees-colon", era: RuleEra::Any, rank: 0, matcher: fees_colon },
        Rule { name: "g1-required-fees-dollar", era: RuleEra::Any, rank: 1, matcher: fees_dollar },
    ],
};

#[rustfmt::skip]
pub static ROOM_AND_BOARD: RuleSet<u64> = RuleSet {
    field: "costs.roomAndBoard",
    rules: &[
        Rule { name: "g1-food-housing-on-campus", era: RuleEra::Modern, rank: 0, matcher: food_housing_on_campus },
        Rule { name: "g1-food-housing", era: RuleEra::Modern, rank: 1, matcher: food_housing },
        Rule { name: "g1-room-board-on-campus", era: RuleEra::Legacy, rank: 2, matcher: room_board_on_campus },
        Rule { name: "g1-room-board", era: RuleEra::Legacy, rank: 3, matcher: room_board },
    ],
};

pub fn rule_sets() -> Vec<&'static dyn DescribeRules> {
    vec![&TUITION, &FEES, &ROOM_AND_BOARD]
}

/// Extract the cost section. The total is left to the assembler.
pub fn extract(scan: &ScanContext) -> SectionOutput<Costs> {
    let mut out = SectionOutput::<Costs>::new();
    out.partial.tuition = out.take(TUITION.resolve(scan), &[TUITION.field]);
    out.partial.fees = out.take(FEES.resolve(scan), &[FEES.field]);
    out.partial.room_and_board = out.take(ROOM_AND_BOARD.resolve(scan), &[ROOM_AND_BOARD.field]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionSettings;
    use pretty_assertions::assert_eq;

    fn scan(text: &str) -> ScanContext {
        ScanContext::from_text(text, &ExtractionSettings::default())
    }

    #[test]
    fn test_modern_costs_across_wrapped_lines() {
        let text = "\
G1 PRIVATE INSTITUTIONS
Tuition:
$65,000.75
Required Fees: $0
Food and housing (on-campus):
$19,500
";
        let out = extract(&scan(text));
        assert_eq!(
            out.partial,
            Costs {
                tuition: Some(65000),
                fees: Some(0),
                room_and_board: Some(19500),
                total_coa: None,
            }
        );
        assert_eq!(
            out.sources.get("costs.roomAndBoard"),
            Some(&super::super::Source::Rule("g1-food-housing-on-campus"))
        );
    }

    #[test]
    fn test_legacy_room_and_board() {
        let text = "Tuition $55,000\nRequired Fees $2,100\nRoom and board (on-campus) $16,000";
        let out = extract(&scan(text));
        assert_eq!(out.partial.tuition, Some(55000));
        assert_eq!(out.partial.fees, Some(2100));
        assert_eq!(out.partial.room_and_board, Some(16000));
    }

    #[test]
    fn test_unmatched_costs_stay_unset() {
        let out = extract(&scan("G1 Undergraduate full-time costs"));
        assert_eq!(out.partial, Costs::default());
        assert!(out.sources.is_empty());
    }
}
