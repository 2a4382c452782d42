use crate::domain::{errors::DomainError, Answer, ChatQuery};
use async_trait::async_trait;

/// The question-answering service as seen from the chat client.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn upload_pdf(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, DomainError>;
    async fn chat(&self, query: &ChatQuery) -> Result<Answer, DomainError>;
}
