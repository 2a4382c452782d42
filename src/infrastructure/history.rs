use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::{
    ports::{HistoryStore, SessionMap},
    DomainError,
};

/// Session history kept in one JSON file, rewritten whole on every save.
///
/// Saves go to a sibling temp file that is then renamed over the target, so
/// the file on disk always holds a complete store.
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "chat_history.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load(&self) -> SessionMap {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SessionMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read history, starting empty");
                return SessionMap::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "corrupt history, starting empty");
            SessionMap::new()
        })
    }

    fn save(&self, sessions: &SessionMap) -> Result<(), DomainError> {
        let json = serde_json::to_string_pretty(sessions)
            .map_err(|e| DomainError::storage(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DomainError::storage(e.to_string()))?;
        }

        let temp = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&temp);
            DomainError::storage(format!("{}: {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageRole, Session};

    fn sample() -> SessionMap {
        let mut bound = Session::new();
        bound.title = "report.pdf".into();
        bound.doc_id = Some("4f1c2a5e-doc".into());
        bound.add_message(MessageRole::User, "What is the total on page 2?");
        bound.add_message(MessageRole::Assistant, "The total is 42 €.");

        let mut sessions = SessionMap::new();
        sessions.insert("a".into(), bound);
        sessions.insert("b".into(), Session::new());
        sessions
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("chat_history.json"));

        let sessions = sample();
        store.save(&sessions).unwrap();

        assert_eq!(store.load(), sessions);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("absent.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_history.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(JsonHistoryStore::new(path).load().is_empty());
    }

    #[test]
    fn test_entry_with_missing_fields_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_history.json");
        fs::write(
            &path,
            r#"{
                "old": {"title": "legacy.pdf", "messages": []},
                "new": {"title": "report.pdf", "messages": [], "doc_id": "d", "timestamp": 12.5}
            }"#,
        )
        .unwrap();

        let sessions = JsonHistoryStore::new(path).load();

        assert_eq!(sessions.len(), 2);
        assert!(sessions["old"].doc_id.is_none());
        assert_eq!(sessions["old"].timestamp, 0.0);
        assert_eq!(sessions["new"].doc_id.as_deref(), Some("d"));
    }

    #[test]
    fn test_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("chat_history.json"));
        store.save(&sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["a"]["title"], "report.pdf");
        assert_eq!(raw["a"]["doc_id"], "4f1c2a5e-doc");
        assert_eq!(raw["a"]["messages"][0]["role"], "user");
        assert!(raw["a"]["timestamp"].is_f64());
        assert!(raw["b"]["doc_id"].is_null());
        assert!(!dir.path().join("chat_history.json.tmp").exists());
    }

    #[test]
    fn test_save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("nested").join("history.json"));

        store.save(&sample()).unwrap();
        store.save(&SessionMap::new()).unwrap();

        assert!(store.load().is_empty());
    }
}
