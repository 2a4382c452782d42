mod ingestion;
mod rag;
mod sessions;

pub use ingestion::IngestionService;
pub use rag::{build_context, ComposedPrompt, ContextBlock, RagService, RagSettings, Retrieved};
pub use sessions::{SessionManager, SessionState};
