//! Text extraction for institutional report PDFs.
//!
//! A thin wrapper over `lopdf` with one job: hand back the text of each
//! page, cleaned up enough for line-oriented scanning. Layout
//! reconstruction, tables and images are explicitly out of scope; the
//! consumer only needs physical lines in page order.

use std::path::Path;

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Error)]
pub enum PdfError {
    /// Encrypted documents cannot be read; the caller should surface this
    /// as a recoverable session error, not a crash.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The document decoded but yielded no text at all, which usually
    /// means a scanned-image PDF.
    #[error("PDF contains no extractable text")]
    NoText,

    #[error("PDF parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An opened report document, ready for per-page text extraction.
pub struct ReportPdf {
    doc: lopdf::Document,
    pages: Vec<u32>,
}

impl ReportPdf {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load(path.as_ref())
            .map_err(|e| PdfError::Parse(e.to_string()))?;
        Self::from_document(doc)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;
        Self::from_document(doc)
    }

    fn from_document(doc: lopdf::Document) -> Result<Self, PdfError> {
        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        Ok(ReportPdf { doc, pages })
    }

    /// Page numbers in document order.
    pub fn page_numbers(&self) -> &[u32] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Extract the text of one page, cleaned for line scanning. An empty
    /// string is a legitimate result for a blank page.
    pub fn extract_page(&self, page: u32) -> Result<String, PdfError> {
        let bruto = self
            .doc
            .extract_text(&[page])
            .map_err(|e| PdfError::Parse(e.to_string()))?;
        Ok(clean_text(&bruto))
    }
}

/// Normalize extracted text: NFKC (reports often carry compatibility
/// forms), unify line endings, and turn non-breaking spaces into plain
/// ones so run-of-spaces splitting behaves.
pub fn clean_text(texto: &str) -> String {
    let normalizado: String = texto.nfkc().collect();
    normalizado
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{a0}', " ")
}
