//! Dispatch settings from the environment, with per-field overrides.

use std::path::PathBuf;

pub const ENV_SUBJECT: &str = "INVOICE_DISPATCH_SUBJECT";
pub const ENV_DOCUMENTS: &str = "INVOICE_DISPATCH_DOCUMENTS";
pub const ENV_DIRECTORY: &str = "INVOICE_DISPATCH_DIRECTORY";
pub const ENV_REPORT_TO: &str = "INVOICE_DISPATCH_REPORT_TO";
pub const ENV_OUTBOX: &str = "INVOICE_DISPATCH_OUTBOX";
pub const ENV_DB: &str = "INVOICE_DISPATCH_DB";
pub const ENV_BODY: &str = "INVOICE_DISPATCH_BODY";

pub const DEFAULT_BODY: &str = "Hello,\n\n\
Below is the list of open invoices on your account. If payment has already \
been made, please send us the receipt so we can settle it.";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required settings: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Values that take precedence over the environment (usually CLI flags).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub subject: Option<String>,
    pub documents_dir: Option<PathBuf>,
    pub directory_path: Option<PathBuf>,
    pub report_to: Option<String>,
    pub outbox_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub subject: String,
    pub body: String,
    pub documents_dir: PathBuf,
    pub directory_path: PathBuf,
    pub report_to: String,
    pub outbox_dir: PathBuf,
    pub db_path: Option<PathBuf>,
}

impl DispatchConfig {
    /// Read from the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    /// Build from an arbitrary key lookup. Blank values count as unset, and
    /// every missing required setting is reported in one error.
    pub fn from_lookup<F>(lookup: F, overrides: ConfigOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let subject = overrides.subject.or_else(|| get(ENV_SUBJECT));
        let documents_dir = overrides.documents_dir.or_else(|| get(ENV_DOCUMENTS).map(PathBuf::from));
        let directory_path = overrides.directory_path.or_else(|| get(ENV_DIRECTORY).map(PathBuf::from));
        let report_to = overrides.report_to.or_else(|| get(ENV_REPORT_TO));
        let outbox_dir = overrides.outbox_dir.or_else(|| get(ENV_OUTBOX).map(PathBuf::from));
        let db_path = overrides.db_path.or_else(|| get(ENV_DB).map(PathBuf::from));
        let body = get(ENV_BODY).unwrap_or_else(|| DEFAULT_BODY.to_string());

        let mut missing = Vec::new();
        if subject.is_none() {
            missing.push(ENV_SUBJECT);
        }
        if documents_dir.is_none() {
            missing.push(ENV_DOCUMENTS);
        }
        if directory_path.is_none() {
            missing.push(ENV_DIRECTORY);
        }
        if report_to.is_none() {
            missing.push(ENV_REPORT_TO);
        }
        if outbox_dir.is_none() {
            missing.push(ENV_OUTBOX);
        }

        match (subject, documents_dir, directory_path, report_to, outbox_dir) {
            (Some(subject), Some(documents_dir), Some(directory_path), Some(report_to), Some(outbox_dir)) => {
                if !report_to.contains('@') {
                    return Err(ConfigError::Invalid {
                        name: ENV_REPORT_TO,
                        reason: format!("'{}' is not an email address", report_to),
                    });
                }
                Ok(Self {
                    subject,
                    body,
                    documents_dir,
                    directory_path,
                    report_to,
                    outbox_dir,
                    db_path,
                })
            }
            _ => Err(ConfigError::Missing(missing)),
        }
    }
}
