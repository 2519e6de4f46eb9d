//! Per-run status collection and report rendering.

use std::fmt;
use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;

use chrono::{DateTime, Local};
use entity_matcher::MatchType;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::mailer::OutgoingMessage;

/// Longest failure reason kept in a report entry, in characters.
pub const MAX_REASON_CHARS: usize = 100;

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("report is not valid utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Outcome of dispatching one entity.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum DispatchStatus {
    Sent,
    /// Dry run: the message would have been sent.
    Planned,
    NoDocuments,
    NoRecipients,
    Failed(String),
}

impl DispatchStatus {
    /// A failure carrying the first [`MAX_REASON_CHARS`] characters of `reason`.
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self::Failed(reason.to_string().chars().take(MAX_REASON_CHARS).collect())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Planned => "planned",
            Self::NoDocuments => "no_documents",
            Self::NoRecipients => "no_recipients",
            Self::Failed(_) => "failed",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Sent | Self::Planned)
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => write!(f, "Sent"),
            Self::Planned => write!(f, "Planned"),
            Self::NoDocuments => write!(f, "Error - no documents found"),
            Self::NoRecipients => write!(f, "Error - entity not found in directory"),
            Self::Failed(reason) => write!(f, "Error - {}", reason),
        }
    }
}

/// One report line: an entity cluster and what happened to it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub entity: String,
    pub key: String,
    /// File names of the documents attached (or that would have been).
    pub documents: Vec<String>,
    pub matched_name: Option<String>,
    pub match_type: Option<MatchType>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub status: DispatchStatus,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub sent: usize,
    pub planned: usize,
    pub errors: usize,
}

/// Result of a dispatch run.
#[derive(Serialize, Debug, Clone)]
pub struct StatusReport {
    pub generated_at: DateTime<Local>,
    pub dry_run: bool,
    pub entries: Vec<StatusEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Tabled, Serialize)]
struct StatusRow {
    #[tabled(rename = "Entity")]
    #[serde(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Documents")]
    #[serde(rename = "Documents")]
    documents: String,
    #[tabled(rename = "Recipients")]
    #[serde(rename = "Recipients")]
    recipients: String,
    #[tabled(rename = "Status")]
    #[serde(rename = "Status")]
    status: String,
}

fn document_count(n: usize) -> String {
    if n == 1 {
        "1 file".to_string()
    } else {
        format!("{} files", n)
    }
}

fn build_status_rows(entries: &[StatusEntry]) -> Vec<StatusRow> {
    entries
        .iter()
        .map(|e| StatusRow {
            entity: e.entity.clone(),
            documents: document_count(e.documents.len()),
            recipients: e.to.join("; "),
            status: e.status.to_string(),
        })
        .collect()
}

impl StatusReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            generated_at: Local::now(),
            dry_run,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: StatusEntry) {
        self.entries.push(entry);
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            total: self.entries.len(),
            ..ReportSummary::default()
        };
        for entry in &self.entries {
            match entry.status {
                DispatchStatus::Sent => summary.sent += 1,
                DispatchStatus::Planned => summary.planned += 1,
                _ => summary.errors += 1,
            }
        }
        summary
    }

    /// `dispatch_report_<YYYYMMDD_HHMMSS>.<ext>` from the generation time.
    pub fn file_name(&self, format: ReportFormat) -> String {
        format!(
            "dispatch_report_{}.{}",
            self.generated_at.format("%Y%m%d_%H%M%S"),
            format.extension()
        )
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, ReportError> {
        match format {
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ReportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(Vec::new());
                for row in build_status_rows(&self.entries) {
                    wtr.serialize(row)?;
                }
                let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
                Ok(String::from_utf8(bytes)?)
            }
            ReportFormat::Markdown => {
                let summary = self.summary();
                let mut out = format!(
                    "# Dispatch report\n\nGenerated: {}\n\n- Total: {}\n- Sent: {}\n",
                    self.generated_at.format("%d/%m/%Y %H:%M"),
                    summary.total,
                    summary.sent,
                );
                if self.dry_run {
                    out.push_str(&format!("- Planned (dry run): {}\n", summary.planned));
                }
                out.push_str(&format!("- Errors: {}\n\n", summary.errors));

                if !self.entries.is_empty() {
                    let mut table = Table::new(build_status_rows(&self.entries));
                    table.with(Style::markdown());
                    out.push_str(&table.to_string());
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }

    /// Render and write the report into `dir`, returning the file path.
    pub fn save(&self, dir: impl AsRef<Path>, format: ReportFormat) -> Result<PathBuf, ReportError> {
        let path = dir.as_ref().join(self.file_name(format));
        std::fs::write(&path, self.render(format)?)?;
        Ok(path)
    }

    /// The message that delivers a saved report to its recipient.
    pub fn summary_message(&self, to: &str, attachment: PathBuf) -> OutgoingMessage {
        let summary = self.summary();
        let body = format!(
            "Hello,\n\n\
             Attached is the invoice dispatch report generated on {}.\n\n\
             Summary:\n\
             - Entities processed: {}\n\
             - Sent successfully: {}\n\
             - With errors: {}\n\n\
             The detailed report is attached.",
            self.generated_at.format("%d/%m/%Y at %H:%M"),
            summary.total,
            summary.sent,
            summary.errors,
        );
        OutgoingMessage {
            to: vec![to.to_string()],
            cc: Vec::new(),
            subject: format!("Invoice dispatch report - {}", self.generated_at.format("%d/%m/%Y")),
            body,
            attachments: vec![attachment],
        }
    }
}
