//! Cross-section reconciliation: the residency split.
//!
//! CDS reports give residency only as an out-of-state percentage (F1) of
//! domestic undergraduates. The counts are rebuilt from the undergraduate
//! total (B1) and the nonresident count (B2) so that the three parts sum
//! exactly to the undergraduate total.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::ExtractionIssue;
use crate::models::{ByResidency, YearRecord};

/// Split the undergraduate body into in-state, out-of-state and
/// international counts.
pub fn split_residency(
    undergraduate: u64,
    international: u64,
    out_of_state_share: Decimal,
) -> Result<ByResidency, ExtractionIssue> {
    if international > undergraduate {
        return Err(ExtractionIssue::invariant(
            "residency.international",
            format!(
                "international count {} exceeds undergraduate total {}",
                international, undergraduate
            ),
        ));
    }
    if out_of_state_share < Decimal::ZERO || out_of_state_share > Decimal::ONE {
        return Err(ExtractionIssue::invariant(
            "residency.share",
            format!("out-of-state share {} is outside [0, 1]", out_of_state_share),
        ));
    }

    let domestic = undergraduate - international;
    let out_of_state = (Decimal::from(domestic) * out_of_state_share)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or_else(|| ExtractionIssue::invariant("residency.share", "out-of-state count overflow"))?;

    let residency = ByResidency {
        in_state: domestic - out_of_state,
        out_of_state,
        international,
    };
    debug!("Residency split: {:?}", residency);
    Ok(residency)
}

/// Derive residency for a record. Returns `None` unless the undergraduate
/// total, the international count and the share are all known.
pub fn reconcile(
    record: &YearRecord,
    out_of_state_share: Option<Decimal>,
) -> Option<Result<ByResidency, ExtractionIssue>> {
    let demographics = &record.demographics;
    let undergraduate = demographics.enrollment.undergraduate?;
    let international = demographics.by_race.international?;
    let share = out_of_state_share?;
    Some(split_residency(undergraduate, international, share))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_partitions_exactly() {
        let residency = split_residency(7000, 1500, Decimal::new(58, 2)).unwrap();
        assert_eq!(
            residency,
            ByResidency {
                in_state: 2310,
                out_of_state: 3190,
                international: 1500,
            }
        );
        assert_eq!(residency.total(), Some(7000));
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        // 5 * 0.5 = 2.5
        let residency = split_residency(6, 1, Decimal::new(5, 1)).unwrap();
        assert_eq!(residency.out_of_state, 3);
        assert_eq!(residency.in_state, 2);
    }

    #[test]
    fn test_international_above_total_is_violation() {
        let err = split_residency(100, 150, Decimal::new(5, 1)).unwrap_err();
        assert!(matches!(err, ExtractionIssue::InvariantViolation { .. }));
    }

    #[test]
    fn test_missing_input_skips_reconciliation() {
        let mut record = YearRecord::default();
        record.demographics.enrollment.undergraduate = Some(7000);
        assert!(reconcile(&record, Some(Decimal::new(58, 2))).is_none());

        record.demographics.by_race.international = Some(1500);
        assert!(reconcile(&record, None).is_none());
        assert!(reconcile(&record, Some(Decimal::new(58, 2))).is_some());
    }
}
