use thiserror::Error;

use crate::document::{ExtractedText, SourceDocument};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    Open(String),
    #[error("failed to extract text from page {page}: {message}")]
    Page { page: usize, message: String },
}

/// Trait for PDF text extraction backends.
///
/// Implementors only recover per-page text; assembling the document text
/// (dropping textless pages, joining, trimming) is done once in
/// [`extract`](TextExtractor::extract) so every backend honours the same
/// contract.
pub trait TextExtractor: Send + Sync {
    /// Backend name for logging (e.g. "mupdf").
    fn name(&self) -> &str;

    /// Extract the text of every page, in physical page order.
    ///
    /// A page with no text layer yields an empty string, not an error.
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>, BackendError>;

    /// Extract the document-level text of a PDF.
    fn extract(&self, document: &SourceDocument) -> Result<ExtractedText, BackendError> {
        let pages = self.extract_pages(&document.data)?;
        let total = pages.len();
        let text = ExtractedText::from_pages(pages);
        tracing::debug!(
            backend = self.name(),
            document = document.display_name(),
            pages = total,
            text_pages = text.page_count(),
            chars = text.len(),
            "text extracted"
        );
        Ok(text)
    }
}
