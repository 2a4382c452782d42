use std::collections::BTreeMap;

use crate::domain::{errors::DomainError, Session};

/// Sessions keyed by session id.
pub type SessionMap = BTreeMap<String, Session>;

pub trait HistoryStore: Send + Sync {
    /// Loads every persisted session. An unreadable store loads as empty.
    fn load(&self) -> SessionMap;

    /// Replaces the persisted store with `sessions`.
    fn save(&self, sessions: &SessionMap) -> Result<(), DomainError>;
}
