use async_trait::async_trait;

use crate::domain::{ports::PdfExtractor, DomainError, ExtractedPage};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Text extraction with `pdf-extract`, run on the blocking pool.
///
/// `pdf-extract` exposes no page labels, so pages come back without a page
/// number and ingestion numbers them by position.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PdfExtractor for PdfTextExtractor {
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<ExtractedPage>, DomainError> {
        if !looks_like_pdf(&bytes) {
            return Err(DomainError::extraction("file is not a PDF document"));
        }

        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| DomainError::extraction(format!("PDF parser aborted: {e}")))?
        .map_err(|e| DomainError::extraction(format!("PDF parse error: {e}")))?;

        tracing::debug!(pages = pages.len(), "extracted PDF text");
        Ok(pages.into_iter().map(ExtractedPage::new).collect())
    }
}

/// PDF files start with `%PDF-`, possibly after a few bytes of junk.
fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_pdf() {
        assert!(looks_like_pdf(b"%PDF-1.7\n..."));
        assert!(looks_like_pdf(b"\xEF\xBB\xBF%PDF-1.4"));
        assert!(!looks_like_pdf(b"hello world"));
        assert!(!looks_like_pdf(b""));
    }

    #[tokio::test]
    async fn test_rejects_non_pdf_bytes() {
        let err = PdfTextExtractor::new()
            .extract_pages(b"this is plain text".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_rejects_truncated_pdf() {
        let err = PdfTextExtractor::new()
            .extract_pages(b"%PDF-1.4\n1 0 obj\n<<".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Extraction(_)));
    }
}
