//! Invoice dispatch workflow around the entity matcher.
//!
//! Loads the contact directory from CSV, discovers the documents to send,
//! groups them by entity, resolves recipients and hands one message per
//! entity to a [`Mailer`]. Every run yields a [`StatusReport`], which can be
//! rendered, mailed and recorded in a SQLite ledger.

pub mod config;
pub mod db;
pub mod directory_loader;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod mailer;
pub mod report;

pub use entity_matcher;

pub use config::{ConfigError, ConfigOverrides, DispatchConfig};
pub use db::{Db, DbError, RunEntryRow, RunRow};
pub use directory_loader::{load_directory, load_directory_from_reader, DirectoryLoadError};
pub use dispatch::{Dispatcher, PlannedDispatch, ReportDelivery, RunRecord};
pub use documents::{discover_documents, Document};
pub use error::DispatchError;
pub use mailer::{MailError, Mailer, OutboxMailer, OutgoingMessage};
pub use report::{DispatchStatus, ReportError, ReportFormat, ReportSummary, StatusEntry, StatusReport};
