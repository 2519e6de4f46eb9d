//! Layered resolution of an entity name against the contact directory.
//!
//! Layers, each tried only when the previous one found nothing:
//! 1. Exact match, ignoring case and surrounding whitespace
//! 2. Containment: directory name contains the query or vice versa (first hit)
//! 3. Cleaned scoring over the whole directory (best score, must reach the minimum)
//! 4. Acronym of non-stopword initials (first hit)
//!
//! Layer 3 keeps the best candidate while grouping takes the first one above
//! threshold. The two policies are intentionally different.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::directory::{ContactDirectory, DirectoryEntry};
use crate::normalize::clean_for_resolution;
use crate::rules::MatchRules;

/// Layer that produced a match.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Containment,
    Scored,
    Acronym,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Containment => write!(f, "containment"),
            Self::Scored => write!(f, "scored"),
            Self::Acronym => write!(f, "acronym"),
        }
    }
}

/// Result of resolving a name to a directory entry.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DirectoryMatch<'a> {
    pub entry: &'a DirectoryEntry,
    pub match_type: MatchType,
    /// Cleaned-name score, only set for [`MatchType::Scored`].
    pub score: Option<u8>,
}

fn meaningful_shared_words(a: &str, b: &str, rules: &MatchRules) -> usize {
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    words_a
        .intersection(&words_b)
        .filter(|w| !rules.is_stopword(w))
        .count()
}

/// Score a directory name against the query on the 0–100 ladder.
///
/// * 100: cleaned names equal and non-empty
/// * 90: one cleaned name contains the other
/// * 25 per meaningful shared cleaned word, capped at 80
/// * 20 per meaningful shared raw word, capped at 70
/// * 0 otherwise
///
/// `query_upper` is the trimmed, uppercased query and `query_clean` its cleaned form.
pub fn cleaned_score(query_upper: &str, query_clean: &str, name: &str, rules: &MatchRules) -> u8 {
    let name_clean = clean_for_resolution(name, rules);
    let both = !query_clean.is_empty() && !name_clean.is_empty();

    if both && query_clean == name_clean {
        return 100;
    }
    if both && (name_clean.contains(query_clean) || query_clean.contains(&name_clean)) {
        return 90;
    }

    if both {
        let shared = meaningful_shared_words(query_clean, &name_clean, rules);
        if shared > 0 {
            return (shared * 25).min(80) as u8;
        }
    }

    let shared = meaningful_shared_words(query_upper, &name.to_uppercase(), rules);
    if shared > 0 {
        return (shared * 20).min(70) as u8;
    }

    0
}

/// Initials of the non-stopword words of an uppercased name.
///
/// `None` unless the name has more than one word and at least two initials.
pub fn acronym(name_upper: &str, rules: &MatchRules) -> Option<String> {
    let words: Vec<&str> = name_upper.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }

    let acronym: String = words
        .iter()
        .filter(|w| !rules.is_stopword(w))
        .filter_map(|w| w.chars().next())
        .collect();

    if acronym.chars().count() >= 2 {
        Some(acronym)
    } else {
        None
    }
}

/// Resolve an entity display name to a directory entry.
///
/// Returns `None` when no layer matches, or when the query is blank. A miss is
/// a normal outcome: callers skip the entity and report it.
pub fn resolve<'a>(
    name: &str,
    directory: &'a ContactDirectory,
    rules: &MatchRules,
) -> Option<DirectoryMatch<'a>> {
    let query = name.trim().to_uppercase();
    if query.is_empty() {
        warn!("blank entity name, nothing to resolve");
        return None;
    }

    // Exact
    for entry in directory.entries() {
        if entry.name.trim().to_uppercase() == query {
            info!(query = name, entry = %entry.name, "exact directory match");
            return Some(DirectoryMatch {
                entry,
                match_type: MatchType::Exact,
                score: None,
            });
        }
    }

    // Containment
    for entry in directory.entries() {
        let candidate = entry.name.trim().to_uppercase();
        if candidate.contains(&query) || query.contains(&candidate) {
            info!(query = name, entry = %entry.name, "containment directory match");
            return Some(DirectoryMatch {
                entry,
                match_type: MatchType::Containment,
                score: None,
            });
        }
    }

    // Cleaned scoring
    let query_clean = clean_for_resolution(&query, rules);
    let mut best: Option<(&DirectoryEntry, u8)> = None;
    for entry in directory.entries() {
        let score = cleaned_score(&query, &query_clean, &entry.name, rules);
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((entry, score));
        }
    }
    if let Some((entry, score)) = best {
        if score >= rules.min_resolution_score {
            info!(query = name, entry = %entry.name, score, "scored directory match");
            return Some(DirectoryMatch {
                entry,
                match_type: MatchType::Scored,
                score: Some(score),
            });
        }
    }

    // Acronym
    if let Some(query_acronym) = acronym(&query, rules) {
        for entry in directory.entries() {
            if acronym(&entry.name.to_uppercase(), rules).as_deref() == Some(query_acronym.as_str()) {
                info!(query = name, entry = %entry.name, acronym = %query_acronym, "acronym directory match");
                return Some(DirectoryMatch {
                    entry,
                    match_type: MatchType::Acronym,
                    score: None,
                });
            }
        }
    }

    warn!(query = name, "no directory match");
    None
}
