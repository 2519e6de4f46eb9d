//! The `resolve` subcommand: look an entity name up in the contact directory.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use invoice_dispatch::entity_matcher::{resolve, MatchRules};
use invoice_dispatch::load_directory;

use crate::output::{print_match, OutputFormat};

#[derive(Args)]
pub struct ResolveArgs {
    /// Entity name to resolve
    pub name: String,

    /// Contact directory CSV file
    #[arg(long)]
    pub directory: PathBuf,
}

pub fn run(args: &ResolveArgs, rules: &MatchRules, format: &OutputFormat) -> Result<()> {
    if args.name.trim().is_empty() {
        bail!("Entity name must not be empty");
    }

    let directory = load_directory(&args.directory)
        .with_context(|| format!("loading directory {}", args.directory.display()))?;

    match resolve(&args.name, &directory, rules) {
        Some(m) => print_match(&args.name, &m, format),
        None => {
            eprintln!(
                "No directory entry matches '{}' ({} entries searched).",
                args.name,
                directory.len()
            );
            Ok(())
        }
    }
}
