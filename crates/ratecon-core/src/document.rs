//! Inbound documents and the text recovered from them.

/// The only media type the pipeline accepts.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Media type reported when the bytes don't look like anything we know.
pub const OCTET_STREAM: &str = "application/octet-stream";

const PDF_MAGIC: &[u8] = b"%PDF-";
const HEADER_SEARCH_WINDOW: usize = 1024;

/// A document as delivered by a transport: raw bytes plus the declared media type.
///
/// Consumed once by the pipeline and never persisted.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub data: Vec<u8>,
    pub media_type: String,
    pub filename: Option<String>,
}

impl SourceDocument {
    pub fn new(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            data,
            media_type: media_type.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Build a document whose media type is inferred from its name and bytes.
    pub fn sniffed(data: Vec<u8>, filename: Option<String>) -> Self {
        let media_type = sniff_media_type(filename.as_deref(), &data);
        Self {
            data,
            media_type,
            filename,
        }
    }

    pub fn is_pdf(&self) -> bool {
        is_pdf_media_type(&self.media_type)
    }

    /// Name used in log lines.
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("<unnamed>")
    }
}

/// Whether a declared media type is PDF.
///
/// Parameters (`; charset=...`) are ignored and the comparison is ASCII
/// case-insensitive.
pub fn is_pdf_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or("").trim();
    essence.eq_ignore_ascii_case(PDF_MEDIA_TYPE)
}

/// Infer a media type for transports that don't declare one.
///
/// The `%PDF-` header must open the file. Readers tolerate junk before the
/// header within the first kilobyte, so when the name ends in `.pdf` the
/// header is searched for there as well. The extension alone never promotes
/// a file to PDF.
pub fn sniff_media_type(filename: Option<&str>, data: &[u8]) -> String {
    if data.starts_with(PDF_MAGIC) {
        return PDF_MEDIA_TYPE.to_string();
    }
    let has_pdf_ext = filename
        .map(|f| f.to_lowercase().ends_with(".pdf"))
        .unwrap_or(false);
    if has_pdf_ext {
        let head = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
        if head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
            return PDF_MEDIA_TYPE.to_string();
        }
    }
    OCTET_STREAM.to_string()
}

/// Text recovered from a document, page by page.
///
/// Pages without recoverable text are dropped rather than kept as blank
/// entries, so they never show up as empty lines in [`as_str`](Self::as_str).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pages: Vec<String>,
    text: String,
}

impl ExtractedText {
    /// Assemble document text from per-page strings in physical order.
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages: Vec<String> = pages
            .into_iter()
            .map(Into::into)
            .filter(|p| !p.trim().is_empty())
            .collect();
        let text = pages.join("\n").trim().to_string();
        Self { pages, text }
    }

    /// The newline-joined document text, trimmed.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of pages that contributed text.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }
}

impl std::fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
