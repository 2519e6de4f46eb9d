//! Fuzzy entity matching for document dispatch.
//!
//! Normalizes free-text organization names, groups document labels that name
//! the same entity, and resolves an entity name against a contact directory.
//! Everything here is pure and synchronous; nothing in the matching contract
//! fails; a miss is `None`.

pub mod cluster;
pub mod directory;
mod errors;
pub mod label;
pub mod normalize;
pub mod resolve;
pub mod rules;
pub mod similarity;

pub use self::cluster::{EntityCluster, EntityClusterer};
pub use self::directory::{split_addresses, ContactDirectory, DirectoryEntry};
pub use self::errors::RulesError;
pub use self::label::{LabelParser, ParsedLabel};
pub use self::normalize::{clean_for_resolution, normalize, remove_accents};
pub use self::resolve::{resolve, DirectoryMatch, MatchType};
pub use self::rules::{load_default_rules, LabelRules, MatchRules, Replacement, ResolutionRules};
pub use self::similarity::{similarity, CONTAINMENT_SIMILARITY};
