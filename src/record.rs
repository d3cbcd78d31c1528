//! Per-paper records: the hand-off between acquisition and deck rendering.
//!
//! Each acquired paper lives in its own directory:
//!
//! ```text
//! papers/
//!  └─ arxiv.org-abs-2301.00001v1/
//!      ├─ paper.json   PaperRecord, pretty-printed
//!      ├─ paper.pdf    downloaded PDF
//!      ├─ half.png     first-page preview (written by the deck stage)
//!      └─ img01_00012.png …
//! ```
//!
//! Required fields are plain struct fields; deserialising a record without
//! them fails. The five LLM summary fields are optional and grouped in
//! [`Summary`] so a missing one is visible as `None`.

use crate::error::DeckError;
use crate::prompts::{LABEL_KEYWORDS, LABEL_METHOD, LABEL_PROBLEM, LABEL_RESULT, LABEL_TITLE_JP};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the record inside a paper directory.
pub const RECORD_FILE: &str = "paper.json";

/// File name of the downloaded PDF inside a paper directory.
pub const PDF_FILE: &str = "paper.pdf";

/// The LLM-produced summary of a paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_jp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Summary {
    /// Labels of the fields the reply did not provide, in template order.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (LABEL_TITLE_JP, &self.title_jp),
            (LABEL_KEYWORDS, &self.keywords),
            (LABEL_PROBLEM, &self.problem),
            (LABEL_METHOD, &self.method),
            (LABEL_RESULT, &self.result),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(label, _)| label)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// One acquired paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub year: String,
    pub entry_id: String,

    /// PDF file name, relative to the record's directory.
    #[serde(default = "default_pdf")]
    pub pdf: String,

    #[serde(flatten)]
    pub summary: Summary,

    /// Publication timestamp, `%Y-%m-%d %H:%M:%S`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    /// Search query that found the paper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

fn default_pdf() -> String {
    PDF_FILE.to_string()
}

impl PaperRecord {
    /// Minimal record with only the required fields set.
    pub fn new(title: impl Into<String>, year: impl Into<String>, entry_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: year.into(),
            entry_id: entry_id.into(),
            pdf: default_pdf(),
            summary: Summary::default(),
            date: None,
            authors: Vec::new(),
            primary_category: None,
            categories: Vec::new(),
            journal_ref: None,
            pdf_url: None,
            doi: None,
            abstract_text: None,
            query: None,
        }
    }

    /// Absolute-or-relative path of the PDF for a record stored in `dir`.
    pub fn pdf_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.pdf)
    }

    /// Write the record as `dir/paper.json`.
    ///
    /// The file is written to a temporary sibling and renamed into place so a
    /// crash never leaves a truncated record behind.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, DeckError> {
        let path = dir.join(RECORD_FILE);
        let write_err = |source: std::io::Error| DeckError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DeckError::Internal(format!("record serialisation: {e}")))?;

        std::fs::create_dir_all(dir).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        debug!("Saved record {}", path.display());
        Ok(path)
    }
}

/// A record read from disk together with its raw text.
///
/// The raw text is kept because the keyword filter matches against the whole
/// serialised record, not only selected fields.
#[derive(Debug, Clone)]
pub struct LoadedRecord {
    pub path: PathBuf,
    pub dir: PathBuf,
    pub text: String,
    pub record: PaperRecord,
}

/// List every `<records_dir>/*/paper.json`-style record file, sorted.
pub fn discover_records(records_dir: &Path) -> Result<Vec<PathBuf>, DeckError> {
    if !records_dir.is_dir() {
        return Err(DeckError::RecordsDirNotFound {
            path: records_dir.to_path_buf(),
        });
    }

    let pattern = format!(
        "{}/*/*.json",
        glob::Pattern::escape(&records_dir.to_string_lossy())
    );
    let entries = glob::glob(&pattern)
        .map_err(|e| DeckError::Internal(format!("bad glob pattern {pattern:?}: {e}")))?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(p) => paths.push(p),
            Err(e) => {
                return Err(DeckError::RecordRead {
                    path: e.path().to_path_buf(),
                    source: e.into_error(),
                })
            }
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read and parse one record file.
pub fn load_record(path: &Path) -> Result<LoadedRecord, DeckError> {
    let text = std::fs::read_to_string(path).map_err(|source| DeckError::RecordRead {
        path: path.to_path_buf(),
        source,
    })?;
    let record: PaperRecord =
        serde_json::from_str(&text).map_err(|source| DeckError::RecordParse {
            path: path.to_path_buf(),
            source,
        })?;
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(LoadedRecord {
        path: path.to_path_buf(),
        dir,
        text,
        record,
    })
}

/// Case-insensitive "any keyword is a substring" test. No keywords matches all.
pub fn matches_keywords(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .any(|k| haystack.contains(&k.to_lowercase()))
}
