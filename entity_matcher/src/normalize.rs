//! Canonical forms of free-text organization names.
//!
//! Two normalizers live here. [`normalize`] produces the form used to compare
//! entities with each other while grouping: accents stripped, uppercase, legal
//! suffixes and connector words removed, punctuation dropped. It keeps
//! distinguishing words such as `HOSPITAL`. [`clean_for_resolution`] is
//! narrower and only used against the contact directory: it drops generic role
//! words so that `Hospital Santa Rita` can find `Santa Rita`.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::rules::{MatchRules, Replacement};

/// Upper bound on normalization passes before the result is accepted as is.
const MAX_PASSES: usize = 8;

/// Remove diacritics by decomposing to NFD and dropping combining marks.
pub fn remove_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Collapse every run of whitespace to a single space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_non_alphanumeric(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

/// Replace every non-overlapping occurrence of `rule.from`, scanning left to right.
///
/// Expansions skip occurrences that are already followed by the expanded text,
/// so `" INTERN" -> " INTERNACIONAL"` leaves `" INTERNACIONAL"` alone.
pub fn apply_replacement(text: &str, rule: &Replacement) -> String {
    let guarded = rule.is_expansion();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for (pos, _) in text.match_indices(rule.from.as_str()) {
        out.push_str(&text[last..pos]);
        if guarded && text[pos..].starts_with(rule.to.as_str()) {
            out.push_str(&rule.from);
        } else {
            out.push_str(&rule.to);
        }
        last = pos + rule.from.len();
    }
    out.push_str(&text[last..]);
    out
}

fn normalize_once(raw: &str, rules: &MatchRules) -> String {
    let upper = remove_accents(raw).to_uppercase();
    let mut name = collapse_whitespace(&upper);

    for rule in &rules.replacements {
        name = apply_replacement(&name, rule);
    }

    collapse_whitespace(&strip_non_alphanumeric(&name))
}

/// Normalize an organization name into its canonical comparable form.
///
/// Steps, each applied to the output of the previous one:
/// 1. Strip diacritics, uppercase
/// 2. Collapse whitespace
/// 3. Apply `rules.replacements` in order
/// 4. Drop characters that are neither alphanumeric nor whitespace
/// 5. Collapse whitespace again
///
/// The steps are repeated until the output stops changing, since step 4 can
/// expose a site for step 3 (`"X (LTDA)"`). This makes the function idempotent.
pub fn normalize(raw: &str, rules: &MatchRules) -> String {
    let mut current = normalize_once(raw, rules);
    for _ in 1..MAX_PASSES {
        let next = normalize_once(&current, rules);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Clean a name for directory resolution.
///
/// Uppercases, removes every generic role word as a literal substring, drops
/// non-alphanumeric characters and collapses whitespace. Accents are kept.
pub fn clean_for_resolution(name: &str, rules: &MatchRules) -> String {
    let mut upper = name.to_uppercase();
    for word in &rules.resolution.generic_words {
        upper = upper.replace(word.as_str(), "");
    }
    collapse_whitespace(&strip_non_alphanumeric(&upper))
}
