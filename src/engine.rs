//! CSV ingestion and report output.
//!
//! Reads group members and transactions from a single CSV stream, then
//! computes net balances and settlements for the whole group in one pass.

use crate::balance::{aggregate, NetBalances};
use crate::error::{EngineError, Result};
use crate::settle::{settle, Settlement};
use crate::transaction::{ParsedRecord, ParticipantId, Transaction, TransactionRecord, TxId};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use std::collections::HashMap;
use std::io::{Read, Write};

/// Accumulates a group's members and transactions.
///
/// Members and transactions keep the order in which they were recorded;
/// that order drives equal-split remainders and settlement tie-breaks.
#[derive(Debug, Default)]
pub struct SettlementEngine {
    /// Group member list, in recording order.
    members: Vec<ParticipantId>,

    /// Transactions, in recording order.
    transactions: Vec<Transaction>,

    /// Position of each transaction in `transactions`.
    tx_index: HashMap<TxId, usize>,
}

impl SettlementEngine {
    /// Creates a new empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine for an existing group.
    pub fn with_members(members: impl IntoIterator<Item = ParticipantId>) -> Self {
        let mut engine = Self::new();
        for member in members {
            engine.add_member(member);
        }
        engine
    }

    pub fn members(&self) -> &[ParticipantId] {
        &self.members
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Adds a group member. Returns `false` if already present.
    pub fn add_member(&mut self, member: ParticipantId) -> bool {
        if self.members.contains(&member) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// Records a complete transaction.
    ///
    /// Returns `Ok(false)` if the transaction ID is already recorded.
    ///
    /// # Errors
    ///
    /// [`EngineError::MissingPayer`] if the transaction has neither payments
    /// nor a payer.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<bool> {
        if !tx.has_payer_side() {
            return Err(EngineError::MissingPayer { tx_id: tx.id });
        }
        Ok(self.insert_transaction(tx))
    }

    fn insert_transaction(&mut self, tx: Transaction) -> bool {
        if self.tx_index.contains_key(&tx.id) {
            return false;
        }
        self.tx_index.insert(tx.id, self.transactions.len());
        self.transactions.push(tx);
        true
    }

    fn transaction_mut(&mut self, tx_id: TxId) -> Option<&mut Transaction> {
        let pos = *self.tx_index.get(&tx_id)?;
        self.transactions.get_mut(pos)
    }

    /// Reads records from a CSV reader in streaming fashion.
    ///
    /// Invalid records are logged at warn level and skipped. Split and
    /// payment rows must follow the expense row they belong to.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<TransactionRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result {
                Ok(record) => match record.parse() {
                    Some(parsed) => self.process_record(parsed, row_num),
                    None => warn!("Row {}: Failed to parse record", row_num),
                },
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                }
            }
        }

        Ok(())
    }

    /// Applies a single parsed record.
    fn process_record(&mut self, record: ParsedRecord, row: usize) {
        match record {
            ParsedRecord::Member(member) => {
                if self.add_member(member) {
                    debug!("Row {}: Added member {}", row, member);
                } else {
                    warn!("Row {}: Duplicate member {}, ignoring", row, member);
                }
            }
            ParsedRecord::Expense {
                tx_id,
                payer,
                total,
            } => {
                let mut tx = Transaction::new(tx_id, total);
                tx.payer = payer;
                if self.insert_transaction(tx) {
                    debug!("Row {}: Opened transaction {} for {}", row, tx_id, total);
                } else {
                    warn!("Row {}: Duplicate transaction ID {}, ignoring", row, tx_id);
                }
            }
            ParsedRecord::Split { tx_id, row: split } => match self.transaction_mut(tx_id) {
                Some(tx) => {
                    debug!(
                        "Row {}: Split of transaction {} for participant {}",
                        row, tx_id, split.participant
                    );
                    tx.splits.push(split);
                }
                None => warn!(
                    "Row {}: Split references unknown transaction {}, ignoring",
                    row, tx_id
                ),
            },
            ParsedRecord::Payment { tx_id, payment } => match self.transaction_mut(tx_id) {
                Some(tx) => {
                    debug!(
                        "Row {}: Payment of {} by participant {} for transaction {}",
                        row, payment.amount, payment.payer, tx_id
                    );
                    tx.payments.push(payment);
                }
                None => warn!(
                    "Row {}: Payment references unknown transaction {}, ignoring",
                    row, tx_id
                ),
            },
        }
    }

    /// Computes net balances and settlements for everything recorded so far.
    pub fn report(&self) -> Result<SettlementReport> {
        SettlementReport::compute(&self.transactions, &self.members)
    }
}

/// Net balances together with the transfers that settle them.
#[derive(Debug, Clone)]
pub struct SettlementReport {
    pub net: NetBalances,
    pub settlements: Vec<Settlement>,
}

impl SettlementReport {
    /// Aggregates `transactions` over the group and settles the result.
    ///
    /// # Errors
    ///
    /// Any share-resolution or missing-payer error; no partial report is
    /// produced.
    pub fn compute(transactions: &[Transaction], members: &[ParticipantId]) -> Result<Self> {
        let net = aggregate(transactions, members)?;
        let settlements = settle(&net);
        debug!(
            "Computed {} settlements for {} participants",
            settlements.len(),
            net.len()
        );
        Ok(SettlementReport { net, settlements })
    }

    /// Writes the settlement transfers as CSV (`from,to,amount`), in
    /// emission order.
    pub fn write_settlements<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        // Header is written by hand so an empty list still gets one.
        csv_writer.write_record(["from", "to", "amount"])?;
        for settlement in &self.settlements {
            csv_writer.serialize(settlement)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes net balances as CSV (`participant,net`), in group order.
    pub fn write_balances<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["participant", "net"])?;
        for balance in self.net.iter() {
            csv_writer.write_record([balance.participant.to_string(), balance.amount.to_string()])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
