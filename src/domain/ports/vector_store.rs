use crate::domain::{errors::DomainError, DocumentChunk, Embedding, SearchResult};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the index if it is missing and waits until it accepts writes.
    /// Safe to call repeatedly.
    async fn ensure_index(&self) -> Result<(), DomainError>;

    /// Writes all points in a single request.
    async fn upsert_batch(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Embedding],
    ) -> Result<(), DomainError>;

    /// Nearest chunks whose `doc_id` equals `doc_id`, best match first.
    async fn search(
        &self,
        query: &Embedding,
        doc_id: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError>;

    async fn health_check(&self) -> Result<(), DomainError>;
}
