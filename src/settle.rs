//! Settlement matcher: greedy largest-first pairing of debtors and creditors.
//!
//! # Algorithm
//!
//! 1. Split the net map into creditors (positive) and debtors (negative,
//!    tracked as a positive owed amount). Zero balances are skipped.
//! 2. Sort both lists by amount, largest first. The sort is stable, so equal
//!    amounts keep the net map's insertion order.
//! 3. Walk both lists with one cursor each. Each step transfers the smaller
//!    of the two current amounts and advances whichever side reached zero
//!    (possibly both).
//!
//! ```text
//! Net:          A +60.00   B -30.00   C -30.00
//! Settlements:  B pays A 30.00
//!               C pays A 30.00
//! ```
//!
//! The result has at most `creditors + debtors - 1` transfers. It is not
//! guaranteed to be the minimum. The matcher does not rebalance: if the net
//! map does not sum to zero, the unmatched residue is dropped.

use crate::balance::NetBalances;
use crate::money::Money;
use crate::transaction::ParticipantId;
use log::debug;
use serde::Serialize;

/// A directed transfer from a debtor to a creditor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    /// Participant who pays.
    #[serde(rename = "from")]
    pub debtor: ParticipantId,

    /// Participant who receives.
    #[serde(rename = "to")]
    pub creditor: ParticipantId,

    /// Always positive.
    pub amount: Money,
}

/// A participant's outstanding amount while matching.
#[derive(Debug)]
struct Position {
    participant: ParticipantId,
    remaining: Money,
}

/// Computes the settlement transfers for a net-balance map.
///
/// Never fails: an empty or one-sided map simply yields no transfers.
pub fn settle(net: &NetBalances) -> Vec<Settlement> {
    let mut creditors = Vec::new();
    let mut debtors = Vec::new();

    for balance in net.iter() {
        let position = Position {
            participant: balance.participant,
            remaining: balance.amount.abs(),
        };
        if balance.amount.is_positive() {
            creditors.push(position);
        } else if balance.amount.is_negative() {
            debtors.push(position);
        }
    }

    // `sort_by` is stable: ties keep net-map order.
    creditors.sort_by(|a, b| b.remaining.cmp(&a.remaining));
    debtors.sort_by(|a, b| b.remaining.cmp(&a.remaining));

    let mut settlements = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < creditors.len() && j < debtors.len() {
        let creditor = &mut creditors[i];
        let debtor = &mut debtors[j];

        let transfer = creditor.remaining.min(debtor.remaining);
        if transfer.is_positive() {
            debug!(
                "Participant {} pays {} to participant {}",
                debtor.participant, transfer, creditor.participant
            );
            settlements.push(Settlement {
                debtor: debtor.participant,
                creditor: creditor.participant,
                amount: transfer,
            });
            creditor.remaining -= transfer;
            debtor.remaining -= transfer;
        }

        if creditor.remaining.is_zero() {
            i += 1;
        }
        if debtor.remaining.is_zero() {
            j += 1;
        }
    }

    settlements
}
