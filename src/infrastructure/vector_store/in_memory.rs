use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::domain::{ports::VectorStore, DocumentChunk, DomainError, Embedding, SearchResult};

/// Process-local index with exact cosine search. Used for tests and for
/// running the service without a vector database.
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<(DocumentChunk, Embedding)>>,
    provisioned: AtomicBool,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            provisioned: AtomicBool::new(false),
        }
    }

    pub fn is_provisioned(&self) -> bool {
        self.provisioned.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.chunks.read().map(|c| c.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_index(&self) -> Result<(), DomainError> {
        self.provisioned.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert_batch(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Embedding],
    ) -> Result<(), DomainError> {
        if chunks.len() != embeddings.len() {
            return Err(DomainError::internal(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut store = self
            .chunks
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let replaced: HashSet<_> = chunks.iter().map(|c| c.id).collect();
        store.retain(|(c, _)| !replaced.contains(&c.id));
        store.extend(chunks.iter().cloned().zip(embeddings.iter().cloned()));
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        doc_id: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let store = self
            .chunks
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut results: Vec<SearchResult> = store
            .iter()
            .filter(|(chunk, _)| chunk.metadata.doc_id == doc_id)
            .map(|(chunk, embedding)| SearchResult {
                chunk: chunk.clone(),
                score: query.cosine_similarity(embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChunkMetadata;

    fn chunk(doc_id: &str, content: &str) -> DocumentChunk {
        DocumentChunk::new(
            content,
            ChunkMetadata {
                doc_id: doc_id.to_string(),
                page_number: 1,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let store = InMemoryVectorStore::new();

        store
            .upsert_batch(
                &[chunk("doc-a", "near"), chunk("doc-a", "far")],
                &[
                    Embedding::new(vec![1.0, 0.0, 0.0]),
                    Embedding::new(vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0, 0.0]);
        let results = store.search(&query, "doc-a", 1).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "near");
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_search_is_scoped_to_document() {
        let store = InMemoryVectorStore::new();
        store
            .upsert_batch(
                &[chunk("doc-a", "alpha")],
                &[Embedding::new(vec![1.0, 0.0])],
            )
            .await
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0]);
        assert!(store.search(&query, "doc-b", 5).await.unwrap().is_empty());
        assert_eq!(store.search(&query, "doc-a", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_chunks_with_same_id() {
        let store = InMemoryVectorStore::new();
        let first = chunk("doc-a", "first draft");
        let second = chunk("doc-a", "second");
        store
            .upsert_batch(
                &[first.clone(), second.clone()],
                &[Embedding::new(vec![1.0, 0.0]), Embedding::new(vec![0.0, 1.0])],
            )
            .await
            .unwrap();

        let mut revised = first.clone();
        revised.content = "final text".to_string();
        store
            .upsert_batch(&[revised], &[Embedding::new(vec![1.0, 0.0])])
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
        let results = store
            .search(&Embedding::new(vec![1.0, 0.0]), "doc-a", 5)
            .await
            .unwrap();
        assert_eq!(results[0].chunk.id, first.id);
        assert_eq!(results[0].chunk.content, "final text");
        assert_eq!(results[1].chunk.id, second.id);
    }

    #[tokio::test]
    async fn test_rejects_mismatched_batch() {
        let store = InMemoryVectorStore::new();
        let err = store
            .upsert_batch(&[chunk("doc-a", "alpha")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
        assert!(store.is_empty());
    }
}
