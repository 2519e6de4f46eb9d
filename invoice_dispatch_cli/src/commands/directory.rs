//! The `directory` subcommand: show the contact directory as the resolver sees it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use invoice_dispatch::load_directory;

use crate::output::{print_directory, OutputFormat};

#[derive(Args)]
pub struct DirectoryArgs {
    /// Contact directory CSV file
    #[arg(long)]
    pub directory: PathBuf,
}

pub fn run(args: &DirectoryArgs, format: &OutputFormat) -> Result<()> {
    let directory = load_directory(&args.directory)
        .with_context(|| format!("loading directory {}", args.directory.display()))?;

    if directory.is_empty() {
        eprintln!("No usable rows in {}", args.directory.display());
        return Ok(());
    }

    print_directory(directory.entries(), format)
}
