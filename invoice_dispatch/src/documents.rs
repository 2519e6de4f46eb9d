//! Discovery of the documents waiting to be dispatched.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

/// A document on disk, labeled by its file stem.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub label: String,
}

impl Document {
    /// Build a document from a path. `None` when the path has no UTF-8 file stem.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let label = path.file_stem()?.to_str()?.to_string();
        Some(Self { path, label })
    }

    /// File name including extension, as shown in reports.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.label.clone())
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        &self.label
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// List the PDF documents directly inside `dir`, sorted by file name.
pub fn discover_documents(dir: impl AsRef<Path>) -> std::io::Result<Vec<Document>> {
    let dir = dir.as_ref();
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_pdf(&path) {
            continue;
        }
        match Document::from_path(&path) {
            Some(doc) => documents.push(doc),
            None => debug!(path = %path.display(), "skipping document with unreadable name"),
        }
    }
    documents.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    debug!(dir = %dir.display(), count = documents.len(), "documents discovered");
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_label_is_stem() {
        let doc = Document::from_path("/tmp/in/Boleto_Alpha_Itau_20240101.pdf").unwrap();
        assert_eq!(doc.label, "Boleto_Alpha_Itau_20240101");
        assert_eq!(doc.file_name(), "Boleto_Alpha_Itau_20240101.pdf");
        let as_str: &str = doc.as_ref();
        assert_eq!(as_str, doc.label);
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf.bak"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let docs = discover_documents(dir.path()).unwrap();
        let labels: Vec<&str> = docs.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_documents(dir.path().join("absent")).is_err());
    }
}
