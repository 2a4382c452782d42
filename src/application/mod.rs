//! Application layer - Use cases and orchestration.
//!
//! Services depend on domain ports (traits) rather than concrete adapters.

pub mod services;

pub use services::{IngestionService, RagService, RagSettings, SessionManager, SessionState};
