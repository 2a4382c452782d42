use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    ports::{ChatBackend, HistoryStore, SessionMap},
    Answer, ChatQuery, DomainError, MessageRole, Session,
};

/// All sessions plus the id of the active one. The active id always names
/// an entry of `sessions`.
#[derive(Debug, Clone)]
pub struct SessionState {
    sessions: SessionMap,
    active: String,
}

impl SessionState {
    pub fn sessions(&self) -> &SessionMap {
        &self.sessions
    }

    pub fn active_id(&self) -> &str {
        &self.active
    }

    /// Sessions ordered most recent first.
    pub fn by_recency(&self) -> Vec<(&str, &Session)> {
        let mut list: Vec<(&str, &Session)> = self
            .sessions
            .iter()
            .map(|(id, s)| (id.as_str(), s))
            .collect();
        list.sort_by(|a, b| recency(b, a));
        list
    }

    fn most_recent(&self) -> Option<String> {
        self.by_recency().first().map(|(id, _)| id.to_string())
    }
}

fn recency(a: &(&str, &Session), b: &(&str, &Session)) -> Ordering {
    a.1.timestamp
        .partial_cmp(&b.1.timestamp)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(b.0))
}

/// Client-side conversation state, persisted after every mutation.
pub struct SessionManager {
    store: Arc<dyn HistoryStore>,
    backend: Arc<dyn ChatBackend>,
    state: SessionState,
}

impl SessionManager {
    /// Loads the history and activates the most recent session, creating
    /// one when the history is empty.
    pub fn open(
        store: Arc<dyn HistoryStore>,
        backend: Arc<dyn ChatBackend>,
    ) -> Result<Self, DomainError> {
        let sessions = store.load();
        let mut manager = Self {
            store,
            backend,
            state: SessionState {
                sessions,
                active: String::new(),
            },
        };

        match manager.state.most_recent() {
            Some(id) => manager.state.active = id,
            None => {
                manager.create()?;
            }
        }
        tracing::debug!(
            sessions = manager.state.sessions.len(),
            active = %manager.state.active,
            "history loaded"
        );
        Ok(manager)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active_id(&self) -> &str {
        &self.state.active
    }

    pub fn active(&self) -> &Session {
        // active always names an existing entry
        &self.state.sessions[&self.state.active]
    }

    fn active_mut(&mut self) -> Result<&mut Session, DomainError> {
        self.state
            .sessions
            .get_mut(&self.state.active)
            .ok_or_else(|| DomainError::internal("active session missing"))
    }

    fn persist(&self) -> Result<(), DomainError> {
        self.store.save(&self.state.sessions)
    }

    /// Saves the current state, or puts `before` back when the save fails so
    /// memory never runs ahead of the history file.
    fn commit(&mut self, before: SessionState) -> Result<(), DomainError> {
        if let Err(e) = self.persist() {
            self.state = before;
            return Err(e);
        }
        Ok(())
    }

    fn insert_fresh(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.state.sessions.insert(id.clone(), Session::new());
        self.state.active = id.clone();
        id
    }

    pub fn create(&mut self) -> Result<String, DomainError> {
        let before = self.state.clone();
        let id = self.insert_fresh();
        self.commit(before)?;
        Ok(id)
    }

    pub fn switch(&mut self, id: &str) -> Result<(), DomainError> {
        if !self.state.sessions.contains_key(id) {
            return Err(DomainError::not_found(format!("session {id}")));
        }
        self.state.active = id.to_string();
        Ok(())
    }

    /// Removes a session. Deleting the active one activates the most
    /// recent remaining session, or a fresh one.
    pub fn delete(&mut self, id: &str) -> Result<(), DomainError> {
        if !self.state.sessions.contains_key(id) {
            return Err(DomainError::not_found(format!("session {id}")));
        }
        let before = self.state.clone();
        self.state.sessions.remove(id);

        if self.state.active == id {
            match self.state.most_recent() {
                Some(next) => self.state.active = next,
                None => {
                    self.insert_fresh();
                }
            }
        }
        self.commit(before)
    }

    /// Resolves a 1-based position in the recency list or a unique id prefix.
    pub fn resolve(&self, selector: &str) -> Result<String, DomainError> {
        let selector = selector.trim();
        let list = self.state.by_recency();

        if let Ok(n) = selector.parse::<usize>() {
            return n
                .checked_sub(1)
                .and_then(|i| list.get(i))
                .map(|(id, _)| id.to_string())
                .ok_or_else(|| DomainError::not_found(format!("no session number {n}")));
        }

        let matches: Vec<&str> = list
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !selector.is_empty() && id.starts_with(selector))
            .collect();
        match matches.as_slice() {
            [id] => Ok(id.to_string()),
            [] => Err(DomainError::not_found(format!("no session matches {selector:?}"))),
            _ => Err(DomainError::validation(format!(
                "{selector:?} matches {} sessions",
                matches.len()
            ))),
        }
    }

    pub fn append_message(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<(), DomainError> {
        let before = self.state.clone();
        self.active_mut()?.add_message(role, content);
        self.commit(before)
    }

    pub fn bind_document(&mut self, doc_id: &str, file_name: &str) -> Result<(), DomainError> {
        let before = self.state.clone();
        let session = self.active_mut()?;
        if session.doc_id.is_some() {
            return Err(DomainError::validation(
                "session already has a document, unlink it first",
            ));
        }
        session.doc_id = Some(doc_id.to_string());
        session.title_from_file(file_name);
        session.touch();
        self.commit(before)
    }

    pub fn unlink_document(&mut self) -> Result<(), DomainError> {
        let before = self.state.clone();
        let session = self.active_mut()?;
        session.doc_id = None;
        session.touch();
        self.commit(before)
    }

    /// Uploads a local PDF and binds the active session to it.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload(&mut self, path: &Path) -> Result<String, DomainError> {
        if self.active().doc_id.is_some() {
            return Err(DomainError::validation(
                "session already has a document, unlink it first",
            ));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DomainError::storage(format!("cannot read {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let doc_id = self.backend.upload_pdf(&file_name, bytes).await?;
        self.bind_document(&doc_id, &file_name)?;
        tracing::info!(doc_id = %doc_id, file = %file_name, "document bound to session");
        Ok(doc_id)
    }

    /// Sends a question about the bound document. The user message is kept
    /// even when the request fails.
    #[instrument(skip(self, question), fields(session = %self.state.active))]
    pub async fn ask(&mut self, question: &str) -> Result<Answer, DomainError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }
        let doc_id = self.active().doc_id.clone().ok_or(DomainError::NoDocument)?;

        let history = self.active().messages.clone();
        let before = self.state.clone();
        let session = self.active_mut()?;
        session.title_from_question(question);
        session.add_message(MessageRole::User, question);
        self.commit(before)?;

        let query = ChatQuery::new(doc_id, question).with_history(history);
        let answer = self.backend.chat(&query).await?;

        self.append_message(MessageRole::Assistant, answer.answer.clone())?;
        Ok(answer)
    }
}
