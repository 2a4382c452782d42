use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embeds a question for retrieval.
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;

    /// One embedding per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError>;

    /// Dimensionality the vector index is created with.
    fn dimension(&self) -> usize;
}
