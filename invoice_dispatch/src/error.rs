//! Error type for the dispatch workflow.

use std::fmt;

use entity_matcher::RulesError;

use crate::db::DbError;
use crate::mailer::MailError;
use crate::report::ReportError;

/// Errors that stop a dispatch run before or after the per-entity loop.
/// Failures for a single entity are recorded in the report instead.
#[derive(Debug)]
pub enum DispatchError {
    /// Match rules could not be compiled.
    Rules(RulesError),
    /// The mail transport rejected a message.
    Mail(MailError),
    /// The status report could not be rendered or written.
    Report(ReportError),
    /// The run ledger failed.
    Db(DbError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rules(e) => write!(f, "Rules error: {}", e),
            Self::Mail(e) => write!(f, "Mail error: {}", e),
            Self::Report(e) => write!(f, "Report error: {}", e),
            Self::Db(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rules(e) => Some(e),
            Self::Mail(e) => Some(e),
            Self::Report(e) => Some(e),
            Self::Db(e) => Some(e),
        }
    }
}

impl From<RulesError> for DispatchError {
    fn from(e: RulesError) -> Self {
        Self::Rules(e)
    }
}

impl From<MailError> for DispatchError {
    fn from(e: MailError) -> Self {
        Self::Mail(e)
    }
}

impl From<ReportError> for DispatchError {
    fn from(e: ReportError) -> Self {
        Self::Report(e)
    }
}

impl From<DbError> for DispatchError {
    fn from(e: DbError) -> Self {
        Self::Db(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_and_source() {
        let err = DispatchError::from(RulesError::Invalid("threshold out of range".to_string()));
        assert_eq!(
            err.to_string(),
            "Rules error: Invalid rules: threshold out of range"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_mail_error_converts() {
        let err: DispatchError = MailError::NoRecipients.into();
        assert!(matches!(err, DispatchError::Mail(MailError::NoRecipients)));
        assert_eq!(err.to_string(), "Mail error: message has no recipients");
    }
}
