use mupdf::{Document, TextPageFlags};

use ratecon_core::config_file::ExtractionConfig;
use ratecon_core::{BackendError, PDF_MEDIA_TYPE, TextExtractor};

/// [`TextExtractor`] backed by MuPDF. Only this crate links the AGPL library.
///
/// Header and footer bands are kept by default: rate confirmations print load
/// numbers and broker contacts in the page margins.
#[derive(Debug, Clone, Default)]
pub struct MupdfBackend {
    /// Bottom band of the page to drop, as a fraction of its height.
    footer_exclusion_ratio: Option<f32>,
    /// Top band of the page to drop, as a fraction of its height.
    header_exclusion_ratio: Option<f32>,
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with the bands set in the `[extraction]` config section.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new()
            .with_header_exclusion(config.header_exclusion.unwrap_or(0.0))
            .with_footer_exclusion(config.footer_exclusion.unwrap_or(0.0))
    }

    /// Drop text blocks starting in the bottom `ratio` of each page.
    /// Ratios outside `(0.0, 1.0)` keep everything.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = band(ratio);
        self
    }

    /// Drop text blocks ending in the top `ratio` of each page.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = band(ratio);
        self
    }

    fn page_text(&self, page: &mupdf::Page, number: usize) -> Result<String, BackendError> {
        let page_err = |e: mupdf::Error| BackendError::Page {
            page: number,
            message: e.to_string(),
        };

        let text_page = page.to_text_page(TextPageFlags::empty()).map_err(page_err)?;
        let page_bounds = page.bounds().map_err(page_err)?;
        let page_height = page_bounds.y1 - page_bounds.y0;

        let header_threshold = self
            .header_exclusion_ratio
            .map(|r| page_bounds.y0 + page_height * r);
        let footer_threshold = self
            .footer_exclusion_ratio
            .map(|r| page_bounds.y1 - page_height * r);

        let mut lines = Vec::new();
        for block in text_page.blocks() {
            let block_bounds = block.bounds();

            if let Some(threshold) = header_threshold
                && block_bounds.y1 <= threshold
            {
                continue;
            }

            if let Some(threshold) = footer_threshold
                && block_bounds.y0 >= threshold
            {
                continue;
            }

            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                lines.push(line_text);
            }
        }

        Ok(lines.join("\n"))
    }
}

fn band(ratio: f32) -> Option<f32> {
    (ratio > 0.0 && ratio < 1.0).then_some(ratio)
}

impl TextExtractor for MupdfBackend {
    fn name(&self) -> &str {
        "mupdf"
    }

    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>, BackendError> {
        let document = Document::from_bytes(data, PDF_MEDIA_TYPE)
            .map_err(|e| BackendError::Open(e.to_string()))?;

        let mut pages_text = Vec::new();
        for (index, page_result) in document
            .pages()
            .map_err(|e| BackendError::Open(e.to_string()))?
            .enumerate()
        {
            let number = index + 1;
            let page = page_result.map_err(|e| BackendError::Page {
                page: number,
                message: e.to_string(),
            })?;
            pages_text.push(self.page_text(&page, number)?);
        }

        // A repaired pile of garbage opens as a zero-page document.
        if pages_text.is_empty() {
            return Err(BackendError::Open("document has no pages".into()));
        }

        Ok(pages_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_sets_bands() {
        let backend = MupdfBackend::from_config(&ExtractionConfig {
            header_exclusion: Some(0.1),
            footer_exclusion: None,
        });
        assert_eq!(backend.header_exclusion_ratio, Some(0.1));
        assert_eq!(backend.footer_exclusion_ratio, None);
    }

    #[test]
    fn out_of_range_bands_keep_everything() {
        let backend = MupdfBackend::new()
            .with_header_exclusion(1.5)
            .with_footer_exclusion(-0.2);
        assert_eq!(backend.header_exclusion_ratio, None);
        assert_eq!(backend.footer_exclusion_ratio, None);
    }
}
