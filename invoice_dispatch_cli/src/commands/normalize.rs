//! The `normalize` subcommand: show how names are keyed for grouping and resolution.

use anyhow::Result;
use clap::Args;
use invoice_dispatch::entity_matcher::{clean_for_resolution, normalize, MatchRules};

use crate::output::{print_normalized, NormalizedName, OutputFormat};

#[derive(Args)]
pub struct NormalizeArgs {
    /// Entity names to normalize
    #[arg(required = true)]
    pub names: Vec<String>,
}

pub fn run(args: &NormalizeArgs, rules: &MatchRules, format: &OutputFormat) -> Result<()> {
    let names: Vec<NormalizedName> = args
        .names
        .iter()
        .map(|name| NormalizedName {
            input: name.clone(),
            canonical: normalize(name, rules),
            resolution_key: clean_for_resolution(name, rules),
        })
        .collect();

    print_normalized(&names, format)
}
