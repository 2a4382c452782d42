use crate::domain::{errors::DomainError, ExtractedPage};
use async_trait::async_trait;

#[async_trait]
pub trait PdfExtractor: Send + Sync {
    /// Per-page text in page order.
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<ExtractedPage>, DomainError>;
}
