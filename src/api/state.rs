use std::sync::Arc;

use crate::application::{IngestionService, RagService};
use crate::domain::ports::VectorStore;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionService>,
    pub rag: Arc<RagService>,
    pub vector_store: Arc<dyn VectorStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        ingestion: Arc<IngestionService>,
        rag: Arc<RagService>,
        vector_store: Arc<dyn VectorStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            ingestion,
            rag,
            vector_store,
            config: Arc::new(config),
        }
    }
}
