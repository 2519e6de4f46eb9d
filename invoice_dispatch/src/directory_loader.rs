//! Load a [`ContactDirectory`] from a CSV export of the contact spreadsheet.
//!
//! Columns are located by keywords in the header row rather than by position,
//! since exports from different sources name and order them differently.

use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use entity_matcher::ContactDirectory;
use tracing::{debug, info};

const NAME_KEYWORDS: &[&str] = &["hospital", "hosp", "nome", "cliente", "name", "customer"];
const TO_KEYWORDS: &[&str] = &["email", "e-mail", "to", "para"];

#[derive(thiserror::Error, Debug)]
pub enum DirectoryLoadError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory has no {column} column (headers: {headers})")]
    MissingColumn {
        column: &'static str,
        headers: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    name: usize,
    to: usize,
    cc1: Option<usize>,
    cc2: Option<usize>,
}

/// Locate the name, to and cc columns from the header row.
///
/// Each header is checked against the name keywords first, then the address
/// keywords, then the two cc patterns. When several headers match the same
/// role the last one wins.
fn detect_columns(headers: &StringRecord) -> Result<Columns, DirectoryLoadError> {
    let mut name = None;
    let mut to = None;
    let mut cc1 = None;
    let mut cc2 = None;

    for (i, header) in headers.iter().enumerate() {
        let header = header.trim().to_lowercase();
        let compact = header.replace(' ', "");
        if NAME_KEYWORDS.iter().any(|k| header.contains(k)) {
            name = Some(i);
        } else if TO_KEYWORDS.iter().any(|k| header.contains(k)) {
            to = Some(i);
        } else if header.contains("cc 1") || compact.contains("cc1") {
            cc1 = Some(i);
        } else if header.contains("cc 2") || compact.contains("cc2") {
            cc2 = Some(i);
        }
    }

    let joined = || headers.iter().collect::<Vec<_>>().join(", ");
    let name = name.ok_or_else(|| DirectoryLoadError::MissingColumn {
        column: "name",
        headers: joined(),
    })?;
    let to = to.ok_or_else(|| DirectoryLoadError::MissingColumn {
        column: "email",
        headers: joined(),
    })?;

    Ok(Columns { name, to, cc1, cc2 })
}

/// Read a directory from any CSV source with a header row.
pub fn load_directory_from_reader<R: Read>(reader: R) -> Result<ContactDirectory, DirectoryLoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = detect_columns(rdr.headers()?)?;
    debug!(?columns, "directory columns detected");

    let mut directory = ContactDirectory::new();
    let mut skipped = 0usize;
    for record in rdr.records() {
        let record = record?;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let cc = [cell(columns.cc1), cell(columns.cc2)];
        if !directory.add_row(cell(Some(columns.name)), cell(Some(columns.to)), &cc) {
            skipped += 1;
        }
    }

    info!(entries = directory.len(), skipped, "contact directory loaded");
    Ok(directory)
}

/// Read a directory from a CSV file.
pub fn load_directory(path: impl AsRef<Path>) -> Result<ContactDirectory, DirectoryLoadError> {
    let file = std::fs::File::open(path.as_ref())?;
    load_directory_from_reader(file)
}
