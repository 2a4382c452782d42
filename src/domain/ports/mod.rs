mod chat_backend;
mod embedding;
mod history_store;
mod llm;
mod pdf;
mod vector_store;

pub use chat_backend::ChatBackend;
pub use embedding::EmbeddingService;
pub use history_store::{HistoryStore, SessionMap};
pub use llm::LlmService;
pub use pdf::PdfExtractor;
pub use vector_store::VectorStore;
