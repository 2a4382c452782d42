use std::net::SocketAddr;
use std::sync::Arc;

use pdf_chat::api::{create_router, AppState};
use pdf_chat::application::{IngestionService, RagService, RagSettings};
use pdf_chat::domain::{
    ports::{EmbeddingService, VectorStore},
    TextSplitter,
};
use pdf_chat::infrastructure::config::VectorBackend;
use pdf_chat::infrastructure::{
    init_tracing, AppConfig, InMemoryVectorStore, PdfTextExtractor, QdrantVectorStore, RigLlm,
    TextEmbedding,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("api=debug,pdf_chat=debug,tower_http=debug");

    let app_config = AppConfig::load()?;
    app_config.validate(|key| std::env::var(key).ok())?;
    let cfg = &app_config.config;

    let embedding = Arc::new(TextEmbedding::from_config(&cfg.embedding));

    let vector_store: Arc<dyn VectorStore> = match cfg.vector_store.backend {
        VectorBackend::Qdrant => {
            let api_key = std::env::var("QDRANT_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
            Arc::new(QdrantVectorStore::new(
                &cfg.vector_store,
                api_key,
                embedding.dimension(),
            )?)
        }
        VectorBackend::Memory => Arc::new(InMemoryVectorStore::new()),
    };
    info!(
        backend = ?cfg.vector_store.backend,
        index = %cfg.vector_store.index_name,
        namespace = %cfg.vector_store.namespace,
        "vector store configured"
    );

    let llm = RigLlm::from_config(&cfg.llm);
    info!(provider = llm.provider_name(), model = %cfg.llm.model, "LLM configured");

    let splitter = TextSplitter::new(cfg.chunking.chunk_size, cfg.chunking.chunk_overlap)?;
    let ingestion = Arc::new(IngestionService::new(
        Arc::new(PdfTextExtractor::new()),
        splitter,
        embedding.clone(),
        vector_store.clone(),
    ));
    let rag = Arc::new(RagService::new(
        embedding,
        vector_store.clone(),
        Arc::new(llm),
        RagSettings {
            top_k: cfg.rag.top_k,
            snippet_chars: cfg.rag.snippet_chars,
            system_prompt: app_config.prompts.qa.system_prompt(),
        },
    ));

    let addr = SocketAddr::new(cfg.server.host.parse()?, cfg.server.port);
    let state = AppState::new(ingestion, rag, vector_store, app_config.clone());
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
