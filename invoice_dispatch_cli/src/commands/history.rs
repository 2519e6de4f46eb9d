//! The `history` subcommand: list recorded dispatch runs.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use invoice_dispatch::Db;

use crate::output::{print_history, print_history_entries, OutputFormat};

#[derive(Args)]
pub struct HistoryArgs {
    /// SQLite database path
    #[arg(long)]
    pub db: PathBuf,

    /// Show at most N runs, newest first
    #[arg(long)]
    pub limit: Option<i64>,

    /// Show the entries of one run
    #[arg(long)]
    pub run: Option<i64>,
}

pub fn run(args: &HistoryArgs, format: &OutputFormat) -> Result<()> {
    if let Some(limit) = args.limit {
        if limit <= 0 {
            bail!("--limit must be a positive integer");
        }
    }

    let db = Db::open(&args.db)?;
    db.init()?;

    if let Some(run_id) = args.run {
        if !db.run_exists(run_id)? {
            bail!("No run with id {} in {}", run_id, args.db.display());
        }
        let entries = db.run_entries(run_id)?;
        return print_history_entries(&entries, format);
    }

    let runs = db.list_runs(args.limit)?;
    if runs.is_empty() {
        eprintln!("No dispatch runs recorded yet.");
        eprintln!("Hint: Run 'invoice-dispatch dispatch' with a database configured first.");
        return Ok(());
    }
    print_history(&runs, format)
}
