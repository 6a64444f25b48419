//! Share resolver: turns a transaction total and its split rows into the
//! amount each participant owes.

use crate::balance::NetBalances;
use crate::error::{EngineError, Result};
use crate::money::{round2, Money};
use crate::transaction::{ParticipantId, Share, SplitRow};
use rust_decimal::Decimal;

/// Resolved owed amounts, in split-row (or group) order. All amounts are
/// non-negative for a positive total.
pub type Shares = NetBalances;

/// Largest accepted gap between the explicit split sum and the total.
pub const SPLIT_SUM_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Resolves who owes what for one transaction.
///
/// - Split rows with explicit amounts: each amount is rounded to cents and
///   used as-is, provided the rounded sum is within
///   [`SPLIT_SUM_TOLERANCE`] of the rounded total.
/// - Split rows without amounts: the total is split equally across the
///   rows, the last row absorbing the rounding remainder.
/// - No split rows: the same equal split across `members`.
///
/// A participant named by several rows owes the sum of those rows. Rows
/// are never overwritten by a later row for the same participant, so the
/// resolved shares always add up to the split sum that was checked.
///
/// # Errors
///
/// - [`EngineError::InconsistentSplit`] when explicit and unspecified rows
///   are mixed.
/// - [`EngineError::SplitSumMismatch`] when explicit amounts miss the total
///   by more than the tolerance.
/// - [`EngineError::EmptyGroup`] when an equal split over the group is
///   needed and `members` is empty.
/// - [`EngineError::AmountOverflow`] when a share sum leaves the decimal
///   range.
pub fn resolve_shares(
    total_amount: Decimal,
    splits: &[SplitRow],
    members: &[ParticipantId],
) -> Result<Shares> {
    if splits.is_empty() {
        if members.is_empty() {
            return Err(EngineError::EmptyGroup);
        }
        return split_equally(total_amount, members);
    }

    if splits.iter().any(|row| row.share.is_explicit()) {
        return explicit_shares(total_amount, splits);
    }

    let participants: Vec<ParticipantId> = splits.iter().map(|row| row.participant).collect();
    split_equally(total_amount, &participants)
}

fn explicit_shares(total_amount: Decimal, splits: &[SplitRow]) -> Result<Shares> {
    let mut shares = Shares::new();
    let mut split_sum = Money::ZERO;

    for row in splits {
        let amount = match row.share {
            Share::Explicit(amount) => Money::new(amount),
            Share::Unspecified => return Err(EngineError::InconsistentSplit),
        };
        shares.accumulate(row.participant, amount)?;
        split_sum = split_sum
            .checked_add(amount)
            .ok_or(EngineError::AmountOverflow {
                participant: row.participant,
            })?;
    }

    let total = Money::new(total_amount);
    let within_tolerance = split_sum
        .checked_sub(total)
        .is_some_and(|gap| gap.abs().as_decimal() <= SPLIT_SUM_TOLERANCE);
    if !within_tolerance {
        return Err(EngineError::SplitSumMismatch { split_sum, total });
    }

    Ok(shares)
}

/// Equal split with the remainder on the last participant.
///
/// `participants` must be non-empty.
fn split_equally(total_amount: Decimal, participants: &[ParticipantId]) -> Result<Shares> {
    let mut shares = Shares::new();
    let Some((&last, rest)) = participants.split_last() else {
        return Ok(shares);
    };

    let per = round2(total_amount / Decimal::from(participants.len()));
    for &participant in rest {
        shares.accumulate(participant, Money::new(per))?;
    }

    let remainder = per
        .checked_mul(Decimal::from(rest.len()))
        .and_then(|allocated| total_amount.checked_sub(allocated))
        .ok_or(EngineError::AmountOverflow { participant: last })?;
    shares.accumulate(last, Money::new(remainder))?;
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn amounts(shares: &Shares) -> Vec<(ParticipantId, String)> {
        shares
            .iter()
            .map(|b| (b.participant, b.amount.to_string()))
            .collect()
    }

    #[test]
    fn test_equal_split_across_group() {
        let shares = resolve_shares(dec("90.00"), &[], &[1, 2, 3]).unwrap();
        assert_eq!(
            amounts(&shares),
            vec![
                (1, "30.00".to_string()),
                (2, "30.00".to_string()),
                (3, "30.00".to_string())
            ]
        );
    }

    #[test]
    fn test_remainder_goes_to_last() {
        let shares = resolve_shares(dec("100"), &[], &[1, 2, 3]).unwrap();
        assert_eq!(shares.get(1), Some(money("33.33")));
        assert_eq!(shares.get(2), Some(money("33.33")));
        assert_eq!(shares.get(3), Some(money("33.34")));
        assert_eq!(shares.total(), money("100.00"));
    }

    #[test]
    fn test_remainder_can_be_negative() {
        // 0.05 / 3 rounds to 0.02, so the last row gets 0.05 - 0.04.
        let splits = [SplitRow::unspecified(1), SplitRow::unspecified(2), SplitRow::unspecified(3)];
        let shares = resolve_shares(dec("0.05"), &splits, &[]).unwrap();
        assert_eq!(shares.get(1), Some(money("0.02")));
        assert_eq!(shares.get(3), Some(money("0.01")));

        // 2.00 / 3 rounds to 0.67, so the last row absorbs -0.01.
        let shares = resolve_shares(dec("2.00"), &splits, &[]).unwrap();
        assert_eq!(shares.get(1), Some(money("0.67")));
        assert_eq!(shares.get(3), Some(money("0.66")));
        assert_eq!(shares.total(), money("2.00"));
    }

    #[test]
    fn test_equal_split_across_rows_ignores_group() {
        let splits = [SplitRow::unspecified(5), SplitRow::unspecified(6)];
        let shares = resolve_shares(dec("10.01"), &splits, &[1, 2, 3]).unwrap();
        assert_eq!(
            amounts(&shares),
            vec![(5, "5.01".to_string()), (6, "5.00".to_string())]
        );
    }

    #[test]
    fn test_unrounded_total_is_divided_before_rounding() {
        // 0.025 / 2 = 0.0125 -> 0.01, last row gets round2(0.015) = 0.02.
        let shares = resolve_shares(dec("0.025"), &[], &[1, 2]).unwrap();
        assert_eq!(shares.get(1), Some(money("0.01")));
        assert_eq!(shares.get(2), Some(money("0.02")));
    }

    #[test]
    fn test_explicit_amounts_accepted_unchanged() {
        let splits = [
            SplitRow::explicit(1, dec("33.33")),
            SplitRow::explicit(2, dec("33.33")),
            SplitRow::explicit(3, dec("33.34")),
        ];
        let shares = resolve_shares(dec("100.00"), &splits, &[]).unwrap();
        assert_eq!(shares.get(1), Some(money("33.33")));
        assert_eq!(shares.get(3), Some(money("33.34")));
    }

    #[test]
    fn test_explicit_amounts_within_tolerance_not_rescaled() {
        let splits = [SplitRow::explicit(1, dec("60")), SplitRow::explicit(2, dec("39.95"))];
        let shares = resolve_shares(dec("100"), &splits, &[]).unwrap();
        assert_eq!(shares.get(1), Some(money("60.00")));
        assert_eq!(shares.get(2), Some(money("39.95")));
        assert_eq!(shares.total(), money("99.95"));
    }

    #[test]
    fn test_explicit_amounts_beyond_tolerance_rejected() {
        let splits = [SplitRow::explicit(1, dec("60")), SplitRow::explicit(2, dec("39.94"))];
        let err = resolve_shares(dec("100"), &splits, &[]).unwrap_err();
        match err {
            EngineError::SplitSumMismatch { split_sum, total } => {
                assert_eq!(split_sum, money("99.94"));
                assert_eq!(total, money("100.00"));
            }
            other => panic!("Expected SplitSumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_amounts_rounded_individually() {
        let splits = [SplitRow::explicit(1, dec("5.005")), SplitRow::explicit(2, dec("4.994"))];
        let shares = resolve_shares(dec("10"), &splits, &[]).unwrap();
        assert_eq!(shares.get(1), Some(money("5.01")));
        assert_eq!(shares.get(2), Some(money("4.99")));
    }

    #[test]
    fn test_mixed_presence_rejected() {
        let splits = [SplitRow::explicit(1, dec("10.00")), SplitRow::unspecified(2)];
        let err = resolve_shares(dec("20"), &splits, &[1, 2]).unwrap_err();
        assert!(matches!(err, EngineError::InconsistentSplit));

        // Order of the mix does not matter.
        let splits = [SplitRow::unspecified(2), SplitRow::explicit(1, dec("10.00"))];
        let err = resolve_shares(dec("20"), &splits, &[1, 2]).unwrap_err();
        assert!(matches!(err, EngineError::InconsistentSplit));
    }

    #[test]
    fn test_empty_group_rejected() {
        let err = resolve_shares(dec("20"), &[], &[]).unwrap_err();
        assert!(matches!(err, EngineError::EmptyGroup));
    }

    #[test]
    fn test_repeated_participant_accumulates() {
        let splits = [
            SplitRow::unspecified(1),
            SplitRow::unspecified(2),
            SplitRow::unspecified(1),
        ];
        let shares = resolve_shares(dec("30"), &splits, &[]).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares.get(1), Some(money("20.00")));
        assert_eq!(shares.get(2), Some(money("10.00")));
    }

    #[test]
    fn test_repeated_participant_with_explicit_amounts_matches_sum() {
        let splits = [
            SplitRow::explicit(1, dec("4")),
            SplitRow::explicit(2, dec("10")),
            SplitRow::explicit(1, dec("6")),
        ];
        let shares = resolve_shares(dec("20"), &splits, &[]).unwrap();
        assert_eq!(shares.get(1), Some(money("10.00")));
        assert_eq!(shares.total(), money("20.00"));
    }

    #[test]
    fn test_overflowing_split_sum_is_an_error() {
        let splits = [
            SplitRow::explicit(1, Decimal::MAX),
            SplitRow::explicit(2, Decimal::MAX),
        ];
        let err = resolve_shares(Decimal::MAX, &splits, &[]).unwrap_err();
        assert!(matches!(err, EngineError::AmountOverflow { participant: 2 }));
    }

    #[test]
    fn test_split_gap_beyond_range_is_a_mismatch() {
        let splits = [SplitRow::explicit(1, Decimal::MIN)];
        let err = resolve_shares(Decimal::MAX, &splits, &[]).unwrap_err();
        assert!(matches!(err, EngineError::SplitSumMismatch { .. }));
    }

    #[test]
    fn test_tolerance_constant() {
        assert_eq!(SPLIT_SUM_TOLERANCE, dec("0.05"));
    }
}
