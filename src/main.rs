//! Settle Engine CLI
//!
//! Reads group members and transactions from CSV and prints the transfers
//! that settle the group.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- expenses.csv > settlements.csv
//! cargo run -- expenses.csv --balances > balances.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use settle_engine::{EngineError, Result, SettlementEngine};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(EngineError::MissingArgument);
    }

    let input_path = &args[1];
    let show_balances = args[2..].iter().any(|a| a == "--balances");

    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let mut engine = SettlementEngine::new();
    engine.process_csv(reader)?;
    let report = engine.report()?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    if show_balances {
        report.write_balances(handle)?;
    } else {
        report.write_settlements(handle)?;
    }

    Ok(())
}
