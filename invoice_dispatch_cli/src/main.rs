mod commands;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use invoice_dispatch::entity_matcher::{load_default_rules, MatchRules};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "invoice-dispatch")]
#[command(about = "Group invoice documents by customer and dispatch them to the contact directory")]
struct Cli {
    /// Output format: table, json, csv, or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Match rules TOML file (defaults to the built-in rules)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the canonical and resolution forms of entity names
    Normalize(commands::normalize::NormalizeArgs),
    /// Group document labels by entity
    Group(commands::group::GroupArgs),
    /// Resolve an entity name against the contact directory
    Resolve(commands::resolve::ResolveArgs),
    /// List the contact directory as loaded
    Directory(commands::directory::DirectoryArgs),
    /// Send each entity its documents and mail the status report
    Dispatch(commands::dispatch::DispatchArgs),
    /// List recorded dispatch runs
    History(commands::history::HistoryArgs),
}

fn load_rules(path: Option<&PathBuf>) -> Result<MatchRules> {
    match path {
        Some(path) => MatchRules::from_path(path)
            .with_context(|| format!("loading match rules from {}", path.display())),
        None => Ok(load_default_rules()?),
    }
}

/// Workflow and matcher crates log at `info` unless `RUST_LOG` says otherwise.
fn log_filter(filter: EnvFilter) -> Result<EnvFilter> {
    Ok(filter
        .add_directive("invoice_dispatch=info".parse()?)
        .add_directive("entity_matcher=info".parse()?))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::from_default_env())?)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.output);
    let rules = load_rules(cli.rules.as_ref())?;

    match &cli.command {
        Commands::Normalize(args) => commands::normalize::run(args, &rules, &format)?,
        Commands::Group(args) => commands::group::run(args, &rules, &format)?,
        Commands::Resolve(args) => commands::resolve::run(args, &rules, &format)?,
        Commands::Directory(args) => commands::directory::run(args, &format)?,
        Commands::Dispatch(args) => commands::dispatch::run(args, &rules, &format).await?,
        Commands::History(args) => commands::history::run(args, &format)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_covers_matcher_and_workflow() {
        let filter = log_filter(EnvFilter::new("")).unwrap().to_string();
        assert!(filter.contains("invoice_dispatch=info"), "{filter}");
        assert!(filter.contains("entity_matcher=info"), "{filter}");
    }
}
