//! Vocabulary tables that drive normalization, grouping and resolution.
//!
//! A default rule set is embedded from `seed_data/match_rules.toml` at compile
//! time; callers may parse their own TOML to extend or replace it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::RulesError;

/// One literal substring replacement of the normalization table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

impl Replacement {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// An expansion rewrites a fragment into a longer form that starts with it,
    /// e.g. `" INTERN"` into `" INTERNACIONAL"`.
    pub fn is_expansion(&self) -> bool {
        self.to.len() > self.from.len() && self.to.starts_with(&self.from)
    }
}

/// Tokens used to pick the entity fragment out of a document label.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LabelRules {
    /// Part that precedes the entity name, e.g. `Boleto` in `Boleto_Name_Itau_20240101`.
    pub marker: String,
    /// Parts that follow the entity name and identify the document type.
    pub type_tokens: Vec<String>,
}

/// Word lists used only by directory resolution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRules {
    /// Organizational role words removed (as substrings) before scoring.
    pub generic_words: Vec<String>,
    /// Connector words that never count as a meaningful shared word.
    pub stopwords: Vec<String>,
}

/// Complete rule set consumed by the matcher.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MatchRules {
    /// Similarity a label must exceed (strictly) to join an existing cluster.
    pub cluster_threshold: f64,
    /// Score returned by the similarity scorer when one string contains the other.
    pub containment_similarity: f64,
    /// Lowest cleaned-name score accepted by the resolver.
    pub min_resolution_score: u8,
    pub label: LabelRules,
    /// Applied in order, each to the output of the previous one.
    pub replacements: Vec<Replacement>,
    pub resolution: ResolutionRules,
}

impl MatchRules {
    /// Parse and validate rules from TOML content.
    pub fn from_toml_str(content: &str) -> Result<Self, RulesError> {
        let rules: MatchRules = toml::from_str(content)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Read, parse and validate a rules file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), RulesError> {
        if !(0.0..=1.0).contains(&self.cluster_threshold) {
            return Err(RulesError::Invalid(format!(
                "cluster_threshold must be between 0.0 and 1.0, got {}",
                self.cluster_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.containment_similarity) {
            return Err(RulesError::Invalid(format!(
                "containment_similarity must be between 0.0 and 1.0, got {}",
                self.containment_similarity
            )));
        }
        if self.min_resolution_score > 100 {
            return Err(RulesError::Invalid(format!(
                "min_resolution_score must be at most 100, got {}",
                self.min_resolution_score
            )));
        }
        if self.label.marker.trim().is_empty() {
            return Err(RulesError::Invalid("label marker is empty".to_string()));
        }
        if let Some(pos) = self.replacements.iter().position(|r| r.from.is_empty()) {
            return Err(RulesError::Invalid(format!(
                "replacement #{} has an empty 'from'",
                pos + 1
            )));
        }
        if self.resolution.generic_words.iter().any(|w| w.is_empty()) {
            return Err(RulesError::Invalid("generic_words contains an empty word".to_string()));
        }
        Ok(())
    }

    /// Whether `word` (already uppercase) is a connector word.
    pub fn is_stopword(&self, word: &str) -> bool {
        self.resolution.stopwords.iter().any(|s| s == word)
    }
}

/// Load the rule set embedded at compile time.
pub fn load_default_rules() -> Result<MatchRules, RulesError> {
    let toml_content = include_str!("../../seed_data/match_rules.toml");
    MatchRules::from_toml_str(toml_content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
cluster_threshold = 0.8
containment_similarity = 0.9
min_resolution_score = 30
replacements = [{ from = " LTDA", to = "" }]

[label]
marker = "Doc"
type_tokens = ["TypeA", "TypeB"]

[resolution]
generic_words = ["HOSPITAL"]
stopwords = ["DE"]
"#;

    #[test]
    fn test_load_default_rules() {
        let rules = load_default_rules().unwrap();
        assert_eq!(rules.cluster_threshold, 0.8);
        assert_eq!(rules.containment_similarity, 0.9);
        assert_eq!(rules.min_resolution_score, 30);
        assert_eq!(rules.label.marker, "Boleto");
        assert!(rules.label.type_tokens.contains(&"Itau".to_string()));
        assert_eq!(rules.replacements.first(), Some(&Replacement::new("S/A", "SA")));
        assert!(rules.resolution.generic_words.contains(&"HOSPITAL".to_string()));
    }

    #[test]
    fn test_default_stopwords() {
        let rules = load_default_rules().unwrap();
        for word in ["DE", "DA", "DO", "E", "EM", "PARA", "COM"] {
            assert!(rules.is_stopword(word), "{word} should be a stopword");
        }
        assert!(!rules.is_stopword("NORTE"));
    }

    #[test]
    fn test_parse_minimal_rules() {
        let rules = MatchRules::from_toml_str(MINIMAL).unwrap();
        assert_eq!(rules.label.marker, "Doc");
        assert_eq!(rules.replacements.len(), 1);
    }

    #[test]
    fn test_reject_threshold_out_of_range() {
        let toml = MINIMAL.replace("cluster_threshold = 0.8", "cluster_threshold = 1.5");
        let err = MatchRules::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, RulesError::Invalid(_)));
    }

    #[test]
    fn test_reject_empty_replacement_source() {
        let toml = MINIMAL.replace(r#"from = " LTDA""#, r#"from = """#);
        let err = MatchRules::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, RulesError::Invalid(_)));
    }

    #[test]
    fn test_reject_malformed_toml() {
        let err = MatchRules::from_toml_str("cluster_threshold = [").unwrap_err();
        assert!(matches!(err, RulesError::TomlParse(_)));
    }

    #[test]
    fn test_expansion_detection() {
        assert!(Replacement::new(" INTERN", " INTERNACIONAL").is_expansion());
        assert!(!Replacement::new(" LTDA", "").is_expansion());
        assert!(!Replacement::new("S/A", "SA").is_expansion());
    }
}
