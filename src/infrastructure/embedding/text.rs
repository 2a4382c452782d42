use async_trait::async_trait;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingModel;
use rig::providers::openai;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

const EMBED_BATCH_SIZE: usize = 512;

/// OpenAI embeddings through rig. The client is built once and reused.
pub struct TextEmbedding {
    client: openai::Client,
    model: String,
    dimension: usize,
}

impl TextEmbedding {
    /// Reads `OPENAI_API_KEY` from the environment; validate the config
    /// before calling this.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            client: openai::Client::from_env(),
            model: config.model.clone(),
            dimension: config.dimension,
        }
    }
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::external("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.client.embedding_model(&self.model);
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let vectors = model
                .embed_texts(batch.iter().map(|t| t.to_string()))
                .await
                .map_err(|e| DomainError::external(e.to_string()))?;

            if vectors.len() != batch.len() {
                return Err(DomainError::external(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            embeddings.extend(vectors.into_iter().map(|emb| {
                let vec_f32: Vec<f32> = emb.vec.into_iter().map(|x| x as f32).collect();
                Embedding::new(vec_f32)
            }));
        }

        tracing::debug!(count = embeddings.len(), model = %self.model, "embedded texts");
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
