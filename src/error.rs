//! Error types for the settlement engine.

use crate::money::Money;
use crate::transaction::{ParticipantId, TxId};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur during engine operation.
///
/// The domain variants are validation failures with no recovery path: any of
/// them aborts the whole balance computation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Some split rows carry an explicit owed amount and others do not
    #[error("Inconsistent explicit amounts: some split rows have an owed amount and others do not")]
    InconsistentSplit,

    /// Explicit split amounts are more than the tolerance away from the total
    #[error("Sum of split owed amounts ({split_sum}) != total ({total})")]
    SplitSumMismatch { split_sum: Money, total: Money },

    /// Equal split over the whole group requested with no group members
    #[error("No group members to split among")]
    EmptyGroup,

    /// Transaction has no payment records and no payer
    #[error("Transaction {tx_id} has no payments and no payer")]
    MissingPayer { tx_id: TxId },

    /// A balance or share sum left the representable decimal range
    #[error("Amount overflow while accumulating the balance of participant {participant}")]
    AmountOverflow { participant: ParticipantId },

    /// Missing input file argument
    #[error("Missing input file argument. Usage: settle-engine <input.csv> [--balances]")]
    MissingArgument,
}
