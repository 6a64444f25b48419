//! Net-balance map and the balance aggregator.
//!
//! Positive balance: the group owes the participant. Negative balance: the
//! participant owes the group.

use crate::error::{EngineError, Result};
use crate::money::Money;
use crate::settle::Settlement;
use crate::shares::resolve_shares;
use crate::transaction::{ParticipantId, Transaction};
use log::{debug, warn};
use std::collections::HashMap;

/// One participant's signed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub participant: ParticipantId,
    pub amount: Money,
}

/// Insertion-ordered mapping from participant to signed amount.
///
/// Iteration follows insertion order: group members first, in the order the
/// group list gave them, then any id first seen later. The settlement
/// matcher relies on this order to break ties between equal amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetBalances {
    entries: Vec<Balance>,
    index: HashMap<ParticipantId, usize>,
}

impl NetBalances {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map with every member at zero, in group order.
    ///
    /// Duplicate ids keep their first position.
    pub fn zeroed(members: &[ParticipantId]) -> Self {
        let mut balances = NetBalances::new();
        for &member in members {
            balances.slot(member);
        }
        balances
    }

    /// Returns the position of `participant`, appending a zero entry if it
    /// is not present yet.
    fn slot(&mut self, participant: ParticipantId) -> usize {
        if let Some(&pos) = self.index.get(&participant) {
            return pos;
        }
        let pos = self.entries.len();
        self.entries.push(Balance {
            participant,
            amount: Money::ZERO,
        });
        self.index.insert(participant, pos);
        pos
    }

    /// Adds a signed `amount` to a participant's entry.
    ///
    /// # Errors
    ///
    /// [`EngineError::AmountOverflow`] if the entry leaves the decimal range;
    /// the entry is left unchanged.
    pub fn accumulate(&mut self, participant: ParticipantId, amount: Money) -> Result<()> {
        let pos = self.slot(participant);
        let entry = &mut self.entries[pos].amount;
        *entry = entry
            .checked_add(amount)
            .ok_or(EngineError::AmountOverflow { participant })?;
        Ok(())
    }

    /// Adds `amount` to a participant's balance.
    pub fn credit(&mut self, participant: ParticipantId, amount: Money) -> Result<()> {
        self.accumulate(participant, amount)
    }

    /// Subtracts `amount` from a participant's balance.
    pub fn debit(&mut self, participant: ParticipantId, amount: Money) -> Result<()> {
        let pos = self.slot(participant);
        let entry = &mut self.entries[pos].amount;
        *entry = entry
            .checked_sub(amount)
            .ok_or(EngineError::AmountOverflow { participant })?;
        Ok(())
    }

    /// Applies a settlement transfer: the debtor pays, the creditor receives.
    pub fn apply(&mut self, settlement: &Settlement) -> Result<()> {
        self.credit(settlement.debtor, settlement.amount)?;
        self.debit(settlement.creditor, settlement.amount)
    }

    pub fn get(&self, participant: ParticipantId) -> Option<Money> {
        self.index
            .get(&participant)
            .map(|&pos| self.entries[pos].amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Balance> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every entry. Zero when the input transactions were balanced.
    pub fn total(&self) -> Money {
        self.entries.iter().map(|b| b.amount).sum()
    }
}

/// Builds a map from `(participant, amount)` pairs. A repeated participant
/// keeps its first position and takes the later amount.
impl FromIterator<(ParticipantId, Money)> for NetBalances {
    fn from_iter<I: IntoIterator<Item = (ParticipantId, Money)>>(iter: I) -> Self {
        let mut balances = NetBalances::new();
        for (participant, amount) in iter {
            let pos = balances.slot(participant);
            balances.entries[pos].amount = amount;
        }
        balances
    }
}

/// Folds every transaction into a net-balance map.
///
/// Each participant's resolved share is subtracted, and each payment (or the
/// full total, for a single-payer transaction) is added to the payer. Every
/// amount is at cent precision before it touches the map, so the returned
/// entries are already rounded to 2 decimals.
///
/// Ids referenced by splits or payments but absent from `members` are
/// appended to the map, zero-initialised, after the members.
///
/// # Errors
///
/// The first share-resolution error, [`EngineError::MissingPayer`] or
/// [`EngineError::AmountOverflow`] aborts the whole aggregation; no partial
/// map is returned.
pub fn aggregate(transactions: &[Transaction], members: &[ParticipantId]) -> Result<NetBalances> {
    let mut net = NetBalances::zeroed(members);

    for tx in transactions {
        let shares = resolve_shares(tx.total_amount, &tx.splits, members).map_err(|e| {
            warn!("Transaction {}: {}", tx.id, e);
            e
        })?;

        for share in shares.iter() {
            net.debit(share.participant, share.amount)?;
        }

        if !tx.payments.is_empty() {
            for payment in &tx.payments {
                net.credit(payment.payer, Money::new(payment.amount))?;
            }
        } else if let Some(payer) = tx.payer {
            net.credit(payer, Money::new(tx.total_amount))?;
        } else {
            warn!("Transaction {}: no payments and no payer", tx.id);
            return Err(EngineError::MissingPayer { tx_id: tx.id });
        }

        debug!(
            "Transaction {}: applied {} shares and {} payments",
            tx.id,
            shares.len(),
            tx.payments.len()
        );
    }

    Ok(net)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::SplitRow;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn test_zeroed_keeps_group_order() {
        let net = NetBalances::zeroed(&[3, 1, 2, 1]);
        let ids: Vec<_> = net.iter().map(|b| b.participant).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(net.iter().all(|b| b.amount.is_zero()));
    }

    #[test]
    fn test_unknown_participant_is_appended() {
        let mut net = NetBalances::zeroed(&[1, 2]);
        net.debit(9, money("5")).unwrap();
        assert_eq!(net.len(), 3);
        assert_eq!(net.get(9), Some(money("-5")));
        assert_eq!(net.iter().last().map(|b| b.participant), Some(9));
    }

    #[test]
    fn test_single_payer_equal_split() {
        let txs = vec![Transaction::new(1, dec("90.00")).paid_by(1)];
        let net = aggregate(&txs, &[1, 2, 3]).unwrap();

        assert_eq!(net.get(1), Some(money("60.00")));
        assert_eq!(net.get(2), Some(money("-30.00")));
        assert_eq!(net.get(3), Some(money("-30.00")));
        assert!(net.total().is_zero());
    }

    #[test]
    fn test_multiple_payments() {
        let txs = vec![Transaction::new(1, dec("100"))
            .with_split(SplitRow::unspecified(1))
            .with_split(SplitRow::unspecified(2))
            .with_payment(2, dec("70"))
            .with_payment(3, dec("30"))];
        let net = aggregate(&txs, &[1, 2, 3]).unwrap();

        assert_eq!(net.get(1), Some(money("-50.00")));
        assert_eq!(net.get(2), Some(money("20.00")));
        assert_eq!(net.get(3), Some(money("30.00")));
    }

    #[test]
    fn test_payments_take_precedence_over_payer() {
        let txs = vec![Transaction::new(1, dec("10"))
            .paid_by(1)
            .with_payment(2, dec("10"))];
        let net = aggregate(&txs, &[1, 2]).unwrap();

        assert_eq!(net.get(1), Some(money("-5.00")));
        assert_eq!(net.get(2), Some(money("5.00")));
    }

    #[test]
    fn test_payment_amounts_are_rounded() {
        let txs = vec![Transaction::new(1, dec("10"))
            .with_split(SplitRow::unspecified(1))
            .with_payment(2, dec("10.004"))];
        let net = aggregate(&txs, &[1, 2]).unwrap();
        assert_eq!(net.get(2), Some(money("10.00")));
    }

    #[test]
    fn test_single_payer_credited_rounded_total() {
        let txs = vec![Transaction::new(1, dec("10.005")).paid_by(1)];
        let shares = resolve_shares(dec("10.005"), &[], &[1, 2]).unwrap();
        assert_eq!(shares.get(1), Some(money("5.00")));
        assert_eq!(shares.get(2), Some(money("5.01")));

        let net = aggregate(&txs, &[1, 2]).unwrap();
        // Credited 10.01, owes 5.00.
        assert_eq!(net.get(1), Some(money("5.01")));
        assert_eq!(net.get(2), Some(money("-5.01")));
        assert!(net.total().is_zero());
    }

    #[test]
    fn test_overflowing_balance_is_an_error() {
        let big = Decimal::MAX;
        let txs = vec![Transaction::new(1, big)
            .with_split(SplitRow::explicit(1, big))
            .with_payment(2, big)
            .with_payment(2, big)];
        let err = aggregate(&txs, &[1, 2]).unwrap_err();
        assert!(matches!(err, EngineError::AmountOverflow { participant: 2 }));
    }

    #[test]
    fn test_overflow_leaves_entry_unchanged() {
        let max = Money::new(Decimal::MAX);
        let mut net = NetBalances::zeroed(&[1]);
        net.credit(1, max).unwrap();
        assert!(net.credit(1, max).is_err());
        assert_eq!(net.get(1), Some(max));
        assert!(net.debit(1, max).is_ok());
        assert_eq!(net.get(1), Some(Money::ZERO));
    }

    #[test]
    fn test_from_iter_last_amount_wins() {
        let net: NetBalances = vec![(1, money("1")), (2, money("2")), (1, money("3"))]
            .into_iter()
            .collect();
        let ids: Vec<_> = net.iter().map(|b| b.participant).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(net.get(1), Some(money("3")));
    }

    #[test]
    fn test_missing_payer_aborts() {
        let txs = vec![
            Transaction::new(1, dec("10")).paid_by(1),
            Transaction::new(2, dec("5")),
        ];
        let err = aggregate(&txs, &[1, 2]).unwrap_err();
        assert!(matches!(err, EngineError::MissingPayer { tx_id: 2 }));
    }

    #[test]
    fn test_share_error_aborts() {
        let txs = vec![Transaction::new(1, dec("10")).paid_by(1)];
        let err = aggregate(&txs, &[]).unwrap_err();
        assert!(matches!(err, EngineError::EmptyGroup));
    }

    #[test]
    fn test_apply_settlement() {
        let mut net: NetBalances = vec![(1, money("30")), (2, money("-30"))]
            .into_iter()
            .collect();
        net.apply(&Settlement {
            debtor: 2,
            creditor: 1,
            amount: money("30"),
        })
        .unwrap();
        assert!(net.iter().all(|b| b.amount.is_zero()));
    }
}
