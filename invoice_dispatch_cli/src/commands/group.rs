//! The `group` subcommand: cluster labels, or the documents of a folder, by entity.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use invoice_dispatch::discover_documents;
use invoice_dispatch::entity_matcher::{EntityClusterer, MatchRules};

use crate::output::{print_clusters, OutputFormat};

#[derive(Args)]
pub struct GroupArgs {
    /// Document labels (file names without extension)
    #[arg(conflicts_with = "documents")]
    pub labels: Vec<String>,

    /// Group the PDF documents found in this folder instead
    #[arg(long)]
    pub documents: Option<PathBuf>,
}

pub fn run(args: &GroupArgs, rules: &MatchRules, format: &OutputFormat) -> Result<()> {
    let clusterer = EntityClusterer::new(rules)?;

    match &args.documents {
        Some(dir) => {
            let documents = discover_documents(dir)
                .with_context(|| format!("listing documents in {}", dir.display()))?;
            if documents.is_empty() {
                eprintln!("No PDF documents found in {}", dir.display());
                return Ok(());
            }
            let clusters = clusterer.group(documents);
            eprintln!("{} entities", clusters.len());
            print_clusters(&clusters, format)
        }
        None => {
            if args.labels.is_empty() {
                bail!("Provide one or more labels, or --documents <DIR>");
            }
            let clusters = clusterer.group(args.labels.iter().map(String::as_str));
            eprintln!("{} entities", clusters.len());
            print_clusters(&clusters, format)
        }
    }
}
