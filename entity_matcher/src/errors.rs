//! Error types for loading matching rules.

/// Errors that can occur when loading a [`MatchRules`](crate::MatchRules) table.
///
/// Matching itself never fails; only configuration can.
#[derive(thiserror::Error, Debug)]
pub enum RulesError {
    /// The rules file is not valid TOML or does not have the expected shape.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// The rules file could not be read.
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),
    /// The rules parsed but are unusable (empty replacement source, threshold out of range).
    #[error("Invalid rules: {0}")]
    Invalid(String),
}
