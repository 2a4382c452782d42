mod conversation;
mod document;
mod embedding;
mod qa;

pub use conversation::{
    truncate_chars, unix_now, Message, MessageRole, Session, DEFAULT_TITLE,
};
pub use document::{ChunkMetadata, DocumentChunk, ExtractedPage, Page, PageMetadata, SearchResult};
pub use embedding::Embedding;
pub use qa::{Answer, ChatQuery, PageLabel, SourceRef, UploadReceipt};
