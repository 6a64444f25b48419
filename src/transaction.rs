//! Transaction models and CSV record parsing.
//!
//! Amounts on the input side stay as unrounded [`Decimal`] values; rounding
//! to cents happens inside the share resolver and the aggregator, where the
//! rules for each amount differ.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Opaque participant identifier, unique within a group.
pub type ParticipantId = u32;

/// Transaction identifier.
pub type TxId = u32;

/// One participant's share of a transaction's debt side.
///
/// Within one transaction either every row is `Explicit` or every row is
/// `Unspecified`; a mix is rejected by the share resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Share {
    /// The participant owes exactly this amount (rounded to cents on use).
    Explicit(#[serde(with = "rust_decimal::serde::str")] Decimal),

    /// The participant owes an equal part of the total.
    #[default]
    Unspecified,
}

impl Share {
    pub fn is_explicit(&self) -> bool {
        matches!(self, Share::Explicit(_))
    }
}

impl From<Option<Decimal>> for Share {
    fn from(amount: Option<Decimal>) -> Self {
        match amount {
            Some(amount) => Share::Explicit(amount),
            None => Share::Unspecified,
        }
    }
}

/// A split row: who consumed part of the expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRow {
    pub participant: ParticipantId,

    #[serde(default)]
    pub share: Share,
}

impl SplitRow {
    /// Row with an explicit owed amount.
    pub fn explicit(participant: ParticipantId, amount: Decimal) -> Self {
        SplitRow {
            participant,
            share: Share::Explicit(amount),
        }
    }

    /// Row that takes an equal part of the total.
    pub fn unspecified(participant: ParticipantId) -> Self {
        SplitRow {
            participant,
            share: Share::Unspecified,
        }
    }
}

/// A contribution toward a transaction's payment side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payer: ParticipantId,

    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

/// A shared expense.
///
/// # Payer side
///
/// When `payments` is empty, `payer` is required and is treated as having
/// paid the full `total_amount`. When `payments` is non-empty, `payer` is
/// informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,

    /// Expected to be positive; not checked.
    #[serde(with = "rust_decimal::serde::str")]
    pub total_amount: Decimal,

    /// Split rows in the order they were recorded. Empty means "split
    /// equally across the whole group".
    #[serde(default)]
    pub splits: Vec<SplitRow>,

    #[serde(default)]
    pub payments: Vec<Payment>,

    #[serde(default)]
    pub payer: Option<ParticipantId>,
}

impl Transaction {
    /// Creates a transaction with no splits, payments or payer.
    pub fn new(id: TxId, total_amount: Decimal) -> Self {
        Transaction {
            id,
            total_amount,
            splits: Vec::new(),
            payments: Vec::new(),
            payer: None,
        }
    }

    /// Sets the single payer who covered the full total.
    pub fn paid_by(mut self, payer: ParticipantId) -> Self {
        self.payer = Some(payer);
        self
    }

    pub fn with_split(mut self, row: SplitRow) -> Self {
        self.splits.push(row);
        self
    }

    pub fn with_payment(mut self, payer: ParticipantId, amount: Decimal) -> Self {
        self.payments.push(Payment { payer, amount });
        self
    }

    /// The payer recorded for this transaction: the explicit payer if set,
    /// otherwise whoever made the first payment.
    pub fn primary_payer(&self) -> Option<ParticipantId> {
        self.payer.or_else(|| self.payments.first().map(|p| p.payer))
    }

    /// Returns `true` if the payment side can be resolved.
    pub fn has_payer_side(&self) -> bool {
        !self.payments.is_empty() || self.payer.is_some()
    }
}

/// Raw input record as read from CSV.
///
/// One CSV stream carries group members and transactions. Columns that a
/// record type does not use are left empty.
#[derive(Debug, Deserialize)]
pub struct TransactionRecord {
    /// Record type: member, expense, split, payment
    #[serde(rename = "type")]
    pub record_type: String,

    /// Transaction ID (absent for member rows)
    pub tx: Option<TxId>,

    /// Member id, payer or split participant depending on the record type
    pub participant: Option<ParticipantId>,

    /// Total, owed amount or payment amount depending on the record type
    pub amount: Option<String>,
}

/// A parsed input record ready for ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRecord {
    /// Adds a participant to the group member list.
    Member(ParticipantId),

    /// Opens a transaction. The payer is optional when payments follow.
    Expense {
        tx_id: TxId,
        payer: Option<ParticipantId>,
        total: Decimal,
    },

    /// Appends a split row to an open transaction.
    Split { tx_id: TxId, row: SplitRow },

    /// Appends a payment to an open transaction.
    Payment { tx_id: TxId, payment: Payment },
}

impl TransactionRecord {
    /// Parses the raw CSV record into a typed record.
    ///
    /// Returns `None` if the record is invalid (unknown type, missing
    /// required column, unparseable amount).
    pub fn parse(&self) -> Option<ParsedRecord> {
        let record_type = self.record_type.trim().to_lowercase();

        match record_type.as_str() {
            "member" => Some(ParsedRecord::Member(self.participant?)),
            "expense" => Some(ParsedRecord::Expense {
                tx_id: self.tx?,
                payer: self.participant,
                total: self.parse_amount()??,
            }),
            "split" => Some(ParsedRecord::Split {
                tx_id: self.tx?,
                row: SplitRow {
                    participant: self.participant?,
                    share: Share::from(self.parse_amount()?),
                },
            }),
            "payment" => Some(ParsedRecord::Payment {
                tx_id: self.tx?,
                payment: Payment {
                    payer: self.participant?,
                    amount: self.parse_amount()??,
                },
            }),
            _ => None,
        }
    }

    /// Parses the optional amount column.
    ///
    /// `Some(None)` means the column is empty; `None` means it holds
    /// something that is not a decimal.
    fn parse_amount(&self) -> Option<Option<Decimal>> {
        let trimmed = match self.amount.as_deref().map(str::trim) {
            None | Some("") => return Some(None),
            Some(s) => s,
        };
        Decimal::from_str(trimmed).ok().map(Some)
    }
}
