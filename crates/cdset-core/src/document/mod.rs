//! Document loading: per-page text and raw tables.
//!
//! The extractors below treat the PDF engine as a black box. Tables are
//! rebuilt from page text because CDS reports lay out their grids with
//! pipes, tabs or column-aligned whitespace.

mod pdf;
mod text;

pub use pdf::PdfExtractor;
pub use text::TextExtractor;

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::DocumentError;

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// A loader turning a file into page text.
pub trait DocumentSource {
    /// Load a document from raw bytes.
    fn load_bytes(&self, data: &[u8]) -> Result<SourceDocument>;

    /// Load a document from disk.
    fn load(&self, path: &Path) -> Result<SourceDocument> {
        let data = std::fs::read(path)?;
        self.load_bytes(&data)
    }
}

/// Extracted content of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceDocument {
    pub pages: Vec<Page>,
}

/// One page of text with the tables found on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Page number (1-indexed).
    pub number: u32,
    pub text: String,
    pub tables: Vec<RawTable>,
}

/// Rows of cells, in reading order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl SourceDocument {
    /// Build a document from page texts, reconstructing tables per page.
    pub fn from_page_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let text = text.into();
                let tables = reconstruct_tables(&text);
                Page {
                    number: i as u32 + 1,
                    text,
                    tables,
                }
            })
            .collect();
        Self { pages }
    }

    /// Full text with pages separated by newlines.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True when no page carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

lazy_static! {
    static ref CELL_SEPARATOR: Regex = Regex::new(r"\s*\|\s*|\t+|\s{2,}").unwrap();
}

/// Split a line into cells. Returns `None` unless it holds at least two.
fn split_row(line: &str) -> Option<Vec<String>> {
    let cells: Vec<String> = CELL_SEPARATOR
        .split(line.trim())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    (cells.len() >= 2).then_some(cells)
}

/// Rebuild tables from text: consecutive multi-cell lines form one table.
pub fn reconstruct_tables(text: &str) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut current = RawTable::default();

    for line in text.lines() {
        match split_row(line) {
            Some(cells) => current.rows.push(cells),
            None if !current.rows.is_empty() => tables.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.rows.is_empty() {
        tables.push(current);
    }
    tables
}

/// Load a document, choosing the loader by file extension.
pub fn load_document(path: &Path) -> Result<SourceDocument> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => PdfExtractor::new().load(path),
        "txt" => TextExtractor::new().load(path),
        other => Err(DocumentError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reconstruct_pipe_and_space_tables() {
        let text = "B2 Enrollment by Racial/Ethnic Category\n\
                    Category | First-year | Undergraduates\n\
                    Nonresidents  120    1,500\n\
                    White   400   3,000\n\
                    \n\
                    Unrelated prose line";

        let tables = reconstruct_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0], vec!["Category", "First-year", "Undergraduates"]);
        assert_eq!(tables[0].rows[1], vec!["Nonresidents", "120", "1,500"]);
        assert_eq!(tables[0].rows.len(), 3);
    }

    #[test]
    fn test_single_spaced_prose_is_not_a_row() {
        assert!(reconstruct_tables("Total all undergraduates 7,000").is_empty());
    }

    #[test]
    fn test_blank_document() {
        let doc = SourceDocument::from_page_texts(["  ", "\n"]);
        assert!(doc.is_blank());
        assert_eq!(doc.pages[1].number, 2);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_document(Path::new("report.docx")).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedFormat(ext) if ext == "docx"));
    }
}
