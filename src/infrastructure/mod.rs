pub mod config;
pub mod embedding;
pub mod history;
pub mod http_client;
pub mod llm;
pub mod logging;
pub mod pdf;
pub mod vector_store;

pub use config::{AppConfig, Config, PromptsConfig};
pub use embedding::TextEmbedding;
pub use history::JsonHistoryStore;
pub use http_client::ApiClient;
pub use llm::RigLlm;
pub use logging::init_tracing;
pub use pdf::PdfTextExtractor;
pub use vector_store::{InMemoryVectorStore, QdrantVectorStore};
