//! PDF text extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::{debug, warn};

use super::{DocumentSource, Result, SourceDocument};
use crate::error::DocumentError;

/// PDF loader. `pdf-extract` provides the page text; lopdf handles
/// decryption and serves as fallback when `pdf-extract` fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Parse and, if protected by an empty password, decrypt the document.
    /// Returns the document and the bytes `pdf-extract` should read.
    fn open(&self, data: &[u8]) -> Result<(Document, Vec<u8>)> {
        let mut doc = Document::load_mem(data).map_err(|e| DocumentError::Parse(e.to_string()))?;

        if !doc.is_encrypted() {
            return Ok((doc, data.to_vec()));
        }

        if doc.decrypt("").is_err() {
            return Err(DocumentError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");

        let mut decrypted = Vec::new();
        doc.save_to(&mut decrypted)
            .map_err(|e| DocumentError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
        Ok((doc, decrypted))
    }

    fn lopdf_pages(&self, doc: &Document, page_count: u32) -> Result<Vec<String>> {
        (1..=page_count)
            .map(|n| {
                doc.extract_text(&[n])
                    .map_err(|e| DocumentError::TextExtraction(e.to_string()))
            })
            .collect()
    }
}

impl DocumentSource for PdfExtractor {
    fn load_bytes(&self, data: &[u8]) -> Result<SourceDocument> {
        let (doc, raw) = self.open(data)?;

        let page_count = doc.get_pages().len() as u32;
        if page_count == 0 {
            return Err(DocumentError::NoPages);
        }

        let texts = match pdf_extract::extract_text_from_mem_by_pages(&raw) {
            Ok(pages) if pages.len() == page_count as usize => pages,
            Ok(pages) => {
                warn!(
                    "pdf-extract returned {} pages for a {} page document, using lopdf",
                    pages.len(),
                    page_count
                );
                self.lopdf_pages(&doc, page_count)?
            }
            Err(e) => {
                warn!("pdf-extract failed ({}), using lopdf", e);
                self.lopdf_pages(&doc, page_count)?
            }
        };

        let document = SourceDocument::from_page_texts(texts);
        debug!(
            "Loaded PDF with {} pages, {} tables",
            page_count,
            document.pages.iter().map(|p| p.tables.len()).sum::<usize>()
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let err = PdfExtractor::new().load_bytes(b"not a pdf").unwrap_err();
        assert!(matches!(err, DocumentError::Parse(_)));
    }
}
