//! Loader for text that was already extracted from a report.

use tracing::debug;

use super::{DocumentSource, Result, SourceDocument};
use crate::error::DocumentError;

/// Reads UTF-8 text documents. Form feeds separate pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentSource for TextExtractor {
    fn load_bytes(&self, data: &[u8]) -> Result<SourceDocument> {
        let text = std::str::from_utf8(data)
            .map_err(|e| DocumentError::TextExtraction(e.to_string()))?;
        let doc = SourceDocument::from_page_texts(text.split('\x0c'));
        debug!("Loaded text document with {} pages", doc.pages.len());
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_feed_splits_pages() {
        let doc = TextExtractor::new()
            .load_bytes(b"C1 Applications\x0cB1 Enrollment")
            .unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[1].text, "B1 Enrollment");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = TextExtractor::new().load_bytes(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, DocumentError::TextExtraction(_)));
    }
}
