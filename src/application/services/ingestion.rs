use std::path::Path;
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    ports::{EmbeddingService, PdfExtractor, VectorStore},
    ChunkMetadata, DocumentChunk, DomainError, Page, TextSplitter,
};

/// PDF → pages → chunks → embeddings → vector index.
pub struct IngestionService {
    extractor: Arc<dyn PdfExtractor>,
    splitter: TextSplitter,
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
}

impl IngestionService {
    pub fn new(
        extractor: Arc<dyn PdfExtractor>,
        splitter: TextSplitter,
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            extractor,
            splitter,
            embedding,
            vector_store,
        }
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_file(
        &self,
        path: &Path,
        doc_id: Option<String>,
    ) -> Result<String, DomainError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DomainError::extraction(format!("cannot read {}: {e}", path.display())))?;
        self.ingest_bytes(bytes, doc_id).await
    }

    /// Indexes a PDF and returns its document id (generated when `doc_id`
    /// is `None`).
    #[instrument(skip(self, bytes), fields(size = bytes.len(), doc_id))]
    pub async fn ingest_bytes(
        &self,
        bytes: Vec<u8>,
        doc_id: Option<String>,
    ) -> Result<String, DomainError> {
        let doc_id = resolve_doc_id(doc_id)?;
        tracing::Span::current().record("doc_id", doc_id.as_str());

        match self.run(bytes, &doc_id).await {
            Ok(chunk_count) => {
                tracing::info!(doc_id = %doc_id, chunks = chunk_count, "document ingested");
                Ok(doc_id)
            }
            Err(e) => {
                tracing::error!(doc_id = %doc_id, error = %e, "ingestion failed");
                Err(e)
            }
        }
    }

    async fn run(&self, bytes: Vec<u8>, doc_id: &str) -> Result<usize, DomainError> {
        let extracted = self.extractor.extract_pages(bytes).await?;
        tracing::debug!(pages = extracted.len(), "loaded pages");

        let pages: Vec<Page> = extracted
            .into_iter()
            .enumerate()
            .map(|(i, page)| Page::stamp(page, doc_id, i))
            .collect();

        let mut chunks = self.split_pages(&pages);
        restamp(&mut chunks, doc_id);
        tracing::debug!(
            chunks = chunks.len(),
            chunk_size = self.splitter.chunk_size(),
            chunk_overlap = self.splitter.chunk_overlap(),
            "split document"
        );

        if chunks.is_empty() {
            tracing::warn!(doc_id, "document has no extractable text, nothing indexed");
            return Ok(0);
        }

        self.vector_store.ensure_index().await?;

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedding.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(DomainError::external(format!(
                "embedding service returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        self.vector_store.upsert_batch(&chunks, &embeddings).await?;
        Ok(chunks.len())
    }

    pub fn split_pages(&self, pages: &[Page]) -> Vec<DocumentChunk> {
        pages
            .iter()
            .flat_map(|page| {
                self.splitter
                    .split(&page.text)
                    .into_iter()
                    .map(move |span| (page, span))
            })
            .enumerate()
            .map(|(chunk_index, (page, span))| {
                DocumentChunk::new(
                    span.text,
                    ChunkMetadata {
                        doc_id: page.metadata.doc_id.clone(),
                        page_number: page.metadata.page_number,
                        start_index: span.start_index,
                        chunk_index,
                    },
                )
            })
            .collect()
    }
}

fn resolve_doc_id(doc_id: Option<String>) -> Result<String, DomainError> {
    match doc_id.map(|id| id.trim().to_string()) {
        Some(id) if id.is_empty() => Err(DomainError::validation("doc_id must not be blank")),
        Some(id) => Ok(id),
        None => Ok(Uuid::new_v4().to_string()),
    }
}

/// Gives every chunk that lost its document id the resolved one.
fn restamp(chunks: &mut [DocumentChunk], doc_id: &str) {
    for chunk in chunks.iter_mut().filter(|c| c.metadata.doc_id.is_empty()) {
        chunk.metadata.doc_id = doc_id.to_string();
    }
}
