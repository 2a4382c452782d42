use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CollectionStatus, Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
    Distance, FieldType, Filter, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tokio::sync::OnceCell;
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::{
    ports::VectorStore, ChunkMetadata, DocumentChunk, DomainError, Embedding, SearchResult,
};
use crate::infrastructure::config::VectorStoreConfig;

const DOC_ID_FIELD: &str = "doc_id";
const NAMESPACE_FIELD: &str = "namespace";

/// Qdrant-backed index. A collection is the index; the namespace is a
/// payload field every point carries and every query filters on.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    namespace: String,
    dimension: usize,
    poll_interval: Duration,
    ready_timeout: Duration,
    provisioned: OnceCell<()>,
}

impl QdrantVectorStore {
    pub fn new(
        config: &VectorStoreConfig,
        api_key: Option<String>,
        dimension: usize,
    ) -> Result<Self, DomainError> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder
            .build()
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.index_name.clone(),
            namespace: config.namespace.clone(),
            dimension,
            poll_interval: Duration::from_millis(config.ready_poll_interval_ms),
            ready_timeout: Duration::from_secs(config.ready_timeout_seconds),
            provisioned: OnceCell::new(),
        })
    }

    async fn collection_exists(&self) -> Result<bool, DomainError> {
        self.client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| DomainError::external(e.to_string()))
    }

    async fn provision(&self) -> Result<(), DomainError> {
        if !self.collection_exists().await.map_err(provisioning)? {
            tracing::info!(
                collection = %self.collection,
                dimension = self.dimension,
                "creating vector index"
            );

            let created = self
                .client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await;

            if let Err(e) = created {
                // Another process may have won the race.
                if !self.collection_exists().await.map_err(provisioning)? {
                    return Err(DomainError::provisioning(e.to_string()));
                }
                tracing::debug!(error = %e, "collection appeared concurrently");
            }

            self.client
                .create_field_index(
                    CreateFieldIndexCollectionBuilder::new(
                        &self.collection,
                        DOC_ID_FIELD,
                        FieldType::Keyword,
                    )
                    .wait(true),
                )
                .await
                .map_err(|e| DomainError::provisioning(e.to_string()))?;
        }

        self.wait_until_ready().await
    }

    async fn wait_until_ready(&self) -> Result<(), DomainError> {
        let deadline = Instant::now() + self.ready_timeout;

        loop {
            let info = self
                .client
                .collection_info(&self.collection)
                .await
                .map_err(|e| DomainError::provisioning(e.to_string()))?;

            let ready = info
                .result
                .map(|c| c.status() == CollectionStatus::Green)
                .unwrap_or(false);
            if ready {
                tracing::info!(collection = %self.collection, "vector index ready");
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(DomainError::provisioning(format!(
                    "index '{}' not ready after {:?}",
                    self.collection, self.ready_timeout
                )));
            }

            tracing::debug!(collection = %self.collection, "waiting for vector index");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn scope_filter(&self, doc_id: &str) -> Filter {
        Filter::must([
            Condition::matches(DOC_ID_FIELD, doc_id.to_string()),
            Condition::matches(NAMESPACE_FIELD, self.namespace.clone()),
        ])
    }

    fn to_point(
        &self,
        chunk: &DocumentChunk,
        embedding: &Embedding,
    ) -> Result<PointStruct, DomainError> {
        if embedding.dimension() != self.dimension {
            return Err(DomainError::internal(format!(
                "embedding has {} dimensions, index expects {}",
                embedding.dimension(),
                self.dimension
            )));
        }

        let payload: Payload = serde_json::json!({
            "chunk_id": chunk.id.to_string(),
            "content": chunk.content,
            "doc_id": chunk.metadata.doc_id,
            "namespace": self.namespace,
            "page_number": chunk.metadata.page_number,
            "start_index": chunk.metadata.start_index,
            "chunk_index": chunk.metadata.chunk_index,
        })
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

        Ok(PointStruct::new(
            chunk.id.to_string(),
            embedding.as_slice().to_vec(),
            payload,
        ))
    }
}

/// Rebuilds a chunk from a scored point. Points without the required
/// payload fields are skipped.
fn point_to_result(point: ScoredPoint) -> Option<SearchResult> {
    let payload = point.payload;

    let chunk_id: Uuid = payload.get("chunk_id")?.as_str()?.parse().ok()?;
    let content = payload.get("content")?.as_str()?.to_string();
    let doc_id = payload.get(DOC_ID_FIELD)?.as_str()?.to_string();
    let page_number = payload.get("page_number")?.as_integer()?;
    let start_index = payload
        .get("start_index")
        .and_then(|v| v.as_integer())
        .unwrap_or_default();
    let chunk_index = payload
        .get("chunk_index")
        .and_then(|v| v.as_integer())
        .unwrap_or_default();

    let chunk = DocumentChunk {
        id: chunk_id,
        content,
        metadata: ChunkMetadata {
            doc_id,
            page_number: u32::try_from(page_number).ok()?,
            start_index: usize::try_from(start_index).unwrap_or_default(),
            chunk_index: usize::try_from(chunk_index).unwrap_or_default(),
        },
    };

    Some(SearchResult {
        chunk,
        score: point.score,
    })
}

fn provisioning(e: DomainError) -> DomainError {
    DomainError::provisioning(e.to_string())
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_index(&self) -> Result<(), DomainError> {
        self.provisioned
            .get_or_try_init(|| self.provision())
            .await
            .map(|_| ())
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
        if chunks.is_empty() {
            return Ok(());
        }

        let points = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| self.to_point(chunk, embedding))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        doc_id: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        if self.provisioned.get().is_none() && !self.collection_exists().await? {
            tracing::debug!(collection = %self.collection, "index not created yet");
            return Ok(Vec::new());
        }

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.as_slice().to_vec(), top_k as u64)
                    .filter(self.scope_filter(doc_id))
                    .with_payload(true),
            )
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        let search_results: Vec<SearchResult> = results
            .result
            .into_iter()
            .filter_map(point_to_result)
            .collect();

        Ok(search_results)
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        self.client
            .health_check()
            .await
            .map(|_| ())
            .map_err(|e| DomainError::external(e.to_string()))
    }
}
