//! The `dispatch` subcommand: send every entity its documents and report the run.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use invoice_dispatch::entity_matcher::MatchRules;
use invoice_dispatch::{
    discover_documents, load_directory, ConfigOverrides, Db, DispatchConfig, Dispatcher,
    OutboxMailer, ReportDelivery, ReportFormat,
};

use crate::output::{print_json, print_status_entries, OutputFormat};

#[derive(Args)]
pub struct DispatchArgs {
    /// Message subject prefix (overrides INVOICE_DISPATCH_SUBJECT)
    #[arg(long)]
    pub subject: Option<String>,

    /// Folder holding the PDF documents (overrides INVOICE_DISPATCH_DOCUMENTS)
    #[arg(long)]
    pub documents: Option<PathBuf>,

    /// Contact directory CSV file (overrides INVOICE_DISPATCH_DIRECTORY)
    #[arg(long)]
    pub directory: Option<PathBuf>,

    /// Address that receives the status report (overrides INVOICE_DISPATCH_REPORT_TO)
    #[arg(long)]
    pub report_to: Option<String>,

    /// Outbox folder for outgoing messages (overrides INVOICE_DISPATCH_OUTBOX)
    #[arg(long)]
    pub outbox: Option<PathBuf>,

    /// SQLite database for the run ledger (overrides INVOICE_DISPATCH_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Report file format: markdown, csv, or json
    #[arg(long, default_value = "markdown")]
    pub report_format: String,

    /// Plan the run and show who would receive what, without sending
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_report_format(value: &str) -> Result<ReportFormat> {
    match value.trim().to_lowercase().as_str() {
        "markdown" | "md" => Ok(ReportFormat::Markdown),
        "csv" => Ok(ReportFormat::Csv),
        "json" => Ok(ReportFormat::Json),
        other => bail!(
            "Invalid --report-format value: '{}'. Valid options: markdown, csv, json",
            other
        ),
    }
}

pub async fn run(args: &DispatchArgs, rules: &MatchRules, format: &OutputFormat) -> Result<()> {
    let report_format = parse_report_format(&args.report_format)?;

    let config = DispatchConfig::from_env(ConfigOverrides {
        subject: args.subject.clone(),
        documents_dir: args.documents.clone(),
        directory_path: args.directory.clone(),
        report_to: args.report_to.clone(),
        outbox_dir: args.outbox.clone(),
        db_path: args.db.clone(),
    })?;

    let directory = load_directory(&config.directory_path)
        .with_context(|| format!("loading directory {}", config.directory_path.display()))?;
    if directory.is_empty() {
        bail!("Contact directory {} has no usable rows", config.directory_path.display());
    }

    let documents = discover_documents(&config.documents_dir)
        .with_context(|| format!("listing documents in {}", config.documents_dir.display()))?;
    if documents.is_empty() {
        eprintln!("No PDF documents found in {}", config.documents_dir.display());
        return Ok(());
    }
    eprintln!(
        "Found {} documents and {} directory entries",
        documents.len(),
        directory.len()
    );

    let mut db = match &config.db_path {
        Some(db_path) => {
            let db = Db::open(db_path)?;
            db.init()?;
            Some(db)
        }
        None => None,
    };

    let mailer = OutboxMailer::new(&config.outbox_dir)?;
    let dispatcher = Dispatcher::new(rules, &directory, &mailer, &config.subject, &config.body)?;

    let plan = dispatcher.plan(documents);
    let pb = ProgressBar::new(plan.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")
            .context("progress bar template")?,
    );
    pb.set_message(if args.dry_run { "planning..." } else { "sending..." });

    let report = dispatcher
        .run_plan(plan, args.dry_run, |entry| {
            pb.set_message(entry.entity.clone());
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    let delivery = ReportDelivery {
        dir: &config.documents_dir,
        format: report_format,
        to: &config.report_to,
    };
    let record = dispatcher.finish(&report, Some(delivery), db.as_mut()).await?;

    if let Some(path) = &record.report_path {
        eprintln!("Report saved to {} and sent to {}", path.display(), config.report_to);
    }
    if let Some(e) = &record.report_error {
        eprintln!("Report could not be sent to {}: {}", config.report_to, e);
    }
    if let (Some(run_id), Some(db_path)) = (record.run_id, &config.db_path) {
        eprintln!("Recorded run {} in {}", run_id, db_path.display());
    }

    match format {
        OutputFormat::Json => print_json(&report),
        _ => print_status_entries(&report.entries, format)?,
    }

    let summary = report.summary();
    if args.dry_run {
        eprintln!(
            "\nDry run: {} entities, {} ready to send, {} with errors",
            summary.total, summary.planned, summary.errors
        );
    } else {
        eprintln!(
            "\nDispatch complete: {} entities, {} sent, {} with errors",
            summary.total, summary.sent, summary.errors
        );
    }

    if let Some(e) = record.report_error {
        return Err(anyhow::Error::new(e).context("status report was not delivered"));
    }
    Ok(())
}
