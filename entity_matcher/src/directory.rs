//! Contact directory: entity display names mapped to recipient address sets.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

/// One directory entry: an entity name with its "to" and "cc" addresses.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub to: BTreeSet<String>,
    pub cc: BTreeSet<String>,
}

/// Read-only lookup structure for resolution.
///
/// Entries keep the order in which their names were first inserted; the
/// resolver's first-hit layers depend on it.
#[derive(Debug, Clone, Default)]
pub struct ContactDirectory {
    entries: Vec<DirectoryEntry>,
    index: HashMap<String, usize>,
}

/// Split a cell holding one or more addresses separated by `;` or `,`.
pub fn split_addresses(cell: &str) -> Vec<String> {
    cell.split([';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one tabular row.
    ///
    /// The name is trimmed. Rows with a blank name or no primary address are
    /// skipped and `false` is returned. Rows repeating a name merge into the
    /// existing entry.
    pub fn add_row(&mut self, name: &str, to_cell: &str, cc_cells: &[&str]) -> bool {
        let name = name.trim();
        let to = split_addresses(to_cell);
        if name.is_empty() || to.is_empty() {
            debug!(name, "skipping directory row without name or address");
            return false;
        }

        let cc: Vec<String> = cc_cells.iter().flat_map(|c| split_addresses(c)).collect();

        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.entries.push(DirectoryEntry {
                    name: name.to_string(),
                    to: BTreeSet::new(),
                    cc: BTreeSet::new(),
                });
                self.index.insert(name.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[idx];
        entry.to.extend(to);
        entry.cc.extend(cc);
        true
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Look up an entry by its exact (trimmed) name.
    pub fn get(&self, name: &str) -> Option<&DirectoryEntry> {
        self.index.get(name.trim()).map(|&idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_addresses() {
        assert_eq!(
            split_addresses(" a@x.com; b@x.com ,c@x.com;; "),
            vec!["a@x.com", "b@x.com", "c@x.com"]
        );
        assert!(split_addresses("  ").is_empty());
    }

    #[test]
    fn test_add_row_merges_same_name() {
        let mut dir = ContactDirectory::new();
        assert!(dir.add_row("Hospital Central", "fin@central.com", &["a@central.com"]));
        assert!(dir.add_row(" Hospital Central ", "fin@central.com; ti@central.com", &["", "b@central.com, a@central.com"]));

        assert_eq!(dir.len(), 1);
        let entry = dir.get("Hospital Central").unwrap();
        assert_eq!(entry.to.len(), 2);
        assert!(entry.to.contains("ti@central.com"));
        assert_eq!(
            entry.cc.iter().cloned().collect::<Vec<_>>(),
            vec!["a@central.com", "b@central.com"]
        );
    }

    #[test]
    fn test_add_row_skips_malformed() {
        let mut dir = ContactDirectory::new();
        assert!(!dir.add_row("", "a@x.com", &[]));
        assert!(!dir.add_row("Clinica Aurora", "  ", &["cc@x.com"]));
        assert!(dir.is_empty());
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut dir = ContactDirectory::new();
        dir.add_row("Zeta", "z@x.com", &[]);
        dir.add_row("Alpha", "a@x.com", &[]);
        dir.add_row("Zeta", "z2@x.com", &[]);
        let names: Vec<&str> = dir.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }
}
