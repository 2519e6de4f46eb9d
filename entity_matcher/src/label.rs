//! Positional parsing of document labels.
//!
//! Labels come from file stems shaped like `<Marker>_<Entity_Words>_<Type>_<YYYYMMDD>`,
//! e.g. `Boleto_Hospital_Central_Itau_20240105`. The parser splits on `_`,
//! takes the parts between the marker and the first type token as the entity
//! name, and falls back to stripping known prefixes and suffixes when the
//! marker is missing.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::errors::RulesError;
use crate::rules::LabelRules;

/// Structured view of a document label.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    /// Entity name fragment, words separated by single spaces where the label used `_`.
    pub entity: String,
    /// The type token found after the entity name, if any.
    pub type_tag: Option<String>,
    /// Trailing 8-digit date token, if any.
    pub date_tag: Option<String>,
    /// True when the marker heuristic found nothing and the fallback was used.
    pub fallback: bool,
}

impl ParsedLabel {
    /// Interpret the date tag as `YYYYMMDD`.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date_tag
            .as_deref()
            .and_then(|tag| NaiveDate::parse_from_str(tag, "%Y%m%d").ok())
    }
}

fn is_date_token(part: &str) -> bool {
    part.len() == 8 && part.bytes().all(|b| b.is_ascii_digit())
}

/// Label parser built from the label section of the rules.
#[derive(Debug, Clone)]
pub struct LabelParser {
    marker: String,
    type_tokens: Vec<String>,
    date_suffix: Regex,
    typed_date_suffix: Option<Regex>,
}

impl LabelParser {
    pub fn new(rules: &LabelRules) -> Result<Self, RulesError> {
        let date_suffix = Regex::new(r"_(\d{8})$")
            .map_err(|e| RulesError::Invalid(format!("regex compile error: {}", e)))?;

        let typed_date_suffix = if rules.type_tokens.is_empty() {
            None
        } else {
            let alternatives: Vec<String> =
                rules.type_tokens.iter().map(|t| regex::escape(t)).collect();
            let pattern = format!(r"_({})_\d{{8}}$", alternatives.join("|"));
            Some(
                Regex::new(&pattern)
                    .map_err(|e| RulesError::Invalid(format!("regex compile error: {}", e)))?,
            )
        };

        Ok(Self {
            marker: rules.marker.clone(),
            type_tokens: rules.type_tokens.clone(),
            date_suffix,
            typed_date_suffix,
        })
    }

    fn is_type_token(&self, part: &str) -> bool {
        self.type_tokens.iter().any(|t| t == part)
    }

    /// Extract the entity fragment, type tag and date tag from a label.
    ///
    /// When no type token follows the marker, every remaining part (a trailing
    /// date included) becomes part of the entity name.
    pub fn parse(&self, label: &str) -> ParsedLabel {
        let parts: Vec<&str> = label.split('_').collect();

        if let Some(marker_idx) = parts.iter().position(|p| *p == self.marker) {
            let mut entity_parts = Vec::new();
            let mut type_tag = None;
            let mut date_tag = None;

            for (i, part) in parts.iter().enumerate().skip(marker_idx + 1) {
                if self.is_type_token(part) {
                    type_tag = Some(part.to_string());
                    date_tag = parts
                        .get(i + 1)
                        .filter(|next| is_date_token(next))
                        .map(|next| next.to_string());
                    break;
                }
                entity_parts.push(*part);
            }

            let entity = entity_parts.join(" ");
            if !entity.is_empty() {
                return ParsedLabel {
                    entity,
                    type_tag,
                    date_tag,
                    fallback: false,
                };
            }
        }

        self.parse_fallback(label)
    }

    fn parse_fallback(&self, label: &str) -> ParsedLabel {
        let mut name = label.replace(&format!("{}_", self.marker), "");

        let mut type_tag = None;
        for token in &self.type_tokens {
            let suffix = format!("_{}", token);
            if name.contains(&suffix) {
                if type_tag.is_none() {
                    type_tag = Some(token.clone());
                }
                name = name.replace(&suffix, "");
            }
        }

        let date_tag = self
            .date_suffix
            .captures(&name)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string());
        let name = self.date_suffix.replace(&name, "");

        ParsedLabel {
            entity: name.replace('_', " "),
            type_tag,
            date_tag,
            fallback: true,
        }
    }

    /// Human-readable form of a label: marker prefix and `_<Type>_<date>` suffix
    /// removed, underscores turned into spaces, trimmed.
    pub fn display_name(&self, label: &str) -> String {
        let mut name = label.replace(&format!("{}_", self.marker), "");
        if let Some(re) = &self.typed_date_suffix {
            name = re.replace(&name, "").into_owned();
        }
        name.replace('_', " ").trim().to_string()
    }

    /// The longest display name among `labels`; the first one wins ties.
    ///
    /// Returns an empty string for an empty slice.
    pub fn most_complete_name<S: AsRef<str>>(&self, labels: &[S]) -> String {
        let mut best = String::new();
        let mut best_len = 0;
        for (i, label) in labels.iter().enumerate() {
            let name = self.display_name(label.as_ref());
            let len = name.chars().count();
            if i == 0 || len > best_len {
                best_len = len;
                best = name;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::load_default_rules;

    fn parser() -> LabelParser {
        LabelParser::new(&load_default_rules().unwrap().label).unwrap()
    }

    #[test]
    fn test_parse_marker_and_type() {
        let parsed = parser().parse("Boleto_Hospital_Central_Itau_20240105");
        assert_eq!(parsed.entity, "Hospital Central");
        assert_eq!(parsed.type_tag.as_deref(), Some("Itau"));
        assert_eq!(parsed.date_tag.as_deref(), Some("20240105"));
        assert!(!parsed.fallback);
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn test_parse_marker_not_first() {
        let parsed = parser().parse("2024_Boleto_Santa_Casa_Bradesco_20240301");
        assert_eq!(parsed.entity, "Santa Casa");
        assert_eq!(parsed.type_tag.as_deref(), Some("Bradesco"));
    }

    #[test]
    fn test_parse_marker_without_type_keeps_remaining_parts() {
        let parsed = parser().parse("Boleto_Clinica_Aurora_20240105");
        assert_eq!(parsed.entity, "Clinica Aurora 20240105");
        assert_eq!(parsed.type_tag, None);
        assert_eq!(parsed.date_tag, None);
        assert!(!parsed.fallback);
    }

    #[test]
    fn test_parse_fallback_without_marker() {
        let parsed = parser().parse("Clinica_Aurora_Itau_20240105");
        assert_eq!(parsed.entity, "Clinica Aurora");
        assert_eq!(parsed.type_tag.as_deref(), Some("Itau"));
        assert_eq!(parsed.date_tag.as_deref(), Some("20240105"));
        assert!(parsed.fallback);
    }

    #[test]
    fn test_parse_fallback_when_marker_followed_by_type() {
        // Nothing between marker and type: the fallback strips what it knows.
        let parsed = parser().parse("Boleto_Itau_20240105");
        assert!(parsed.fallback);
        assert_eq!(parsed.entity, "Itau");
        assert_eq!(parsed.date_tag.as_deref(), Some("20240105"));
    }

    #[test]
    fn test_parse_plain_name() {
        let parsed = parser().parse("Hospital Central");
        assert_eq!(parsed.entity, "Hospital Central");
        assert_eq!(parsed.type_tag, None);
        assert_eq!(parsed.date_tag, None);
    }

    #[test]
    fn test_invalid_calendar_date() {
        let parsed = parser().parse("Boleto_X_Itau_20241399");
        assert_eq!(parsed.date_tag.as_deref(), Some("20241399"));
        assert_eq!(parsed.date(), None);
    }

    #[test]
    fn test_display_name() {
        let p = parser();
        assert_eq!(p.display_name("Boleto_Hospital_Central_Itau_20240105"), "Hospital Central");
        assert_eq!(p.display_name("Boleto_Hospital_Central_Ltda_Bradesco_20240105"), "Hospital Central Ltda");
        assert_eq!(p.display_name("Hospital_Central"), "Hospital Central");
    }

    #[test]
    fn test_most_complete_name_longest() {
        let labels = [
            "Boleto_Hospital_Central_Itau_20240105",
            "Boleto_Hospital_Central_Ltda_Bradesco_20240105",
        ];
        assert_eq!(parser().most_complete_name(&labels), "Hospital Central Ltda");
    }

    #[test]
    fn test_most_complete_name_first_wins_ties() {
        let labels = ["Boleto_AAAA_Itau_20240105", "Boleto_BBBB_Itau_20240105"];
        assert_eq!(parser().most_complete_name(&labels), "AAAA");
    }

    #[test]
    fn test_most_complete_name_empty() {
        let labels: [&str; 0] = [];
        assert_eq!(parser().most_complete_name(&labels), "");
    }

    #[test]
    fn test_custom_tokens() {
        let rules = LabelRules {
            marker: "Doc".to_string(),
            type_tokens: vec!["TypeA".to_string(), "TypeB".to_string()],
        };
        let parser = LabelParser::new(&rules).unwrap();
        let parsed = parser.parse("Doc_Alpha_Hospital_TypeB_20240102");
        assert_eq!(parsed.entity, "Alpha Hospital");
        assert_eq!(parsed.type_tag.as_deref(), Some("TypeB"));
        assert_eq!(parser.display_name("Doc_Alpha_Hospital_TypeB_20240102"), "Alpha Hospital");
    }

    #[test]
    fn test_parsed_label_serializes() {
        let parsed = parser().parse("Boleto_Hospital_Central_Itau_20240105");
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["entity"], "Hospital Central");
        assert_eq!(json["fallback"], false);
    }
}
