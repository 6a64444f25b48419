//! # Settle Engine
//!
//! Reconciles shared expenses within a group: works out how much each
//! participant owes or is owed, then proposes a short list of transfers
//! that settles everyone up.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: money is rounded half-up to cents via `rust_decimal`
//! - **Pure computation**: [`aggregate`] and [`settle`] hold no state between calls
//! - **Explicit failures**: inconsistent input aborts the whole computation
//! - **Deterministic output**: ties are broken by group order
//!
//! ## Example
//!
//! ```
//! use rust_decimal::Decimal;
//! use settle_engine::{aggregate, settle, Transaction};
//!
//! let members = [1, 2, 3];
//! let txs = vec![Transaction::new(1, Decimal::new(9000, 2)).paid_by(1)];
//!
//! let net = aggregate(&txs, &members).unwrap();
//! let settlements = settle(&net);
//!
//! assert_eq!(settlements.len(), 2);
//! assert_eq!(settlements[0].debtor, 2);
//! assert_eq!(settlements[0].amount.to_string(), "30.00");
//! ```

pub mod balance;
pub mod engine;
pub mod error;
pub mod money;
pub mod settle;
pub mod shares;
pub mod transaction;

pub use balance::{aggregate, Balance, NetBalances};
pub use engine::{SettlementEngine, SettlementReport};
pub use error::{EngineError, Result};
pub use money::{round2, Money};
pub use settle::{settle, Settlement};
pub use shares::{resolve_shares, Shares, SPLIT_SUM_TOLERANCE};
pub use transaction::{
    ParsedRecord, ParticipantId, Payment, Share, SplitRow, Transaction, TransactionRecord, TxId,
};
