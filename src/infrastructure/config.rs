use std::path::Path;

use serde::Deserialize;

use crate::domain::{splitter, DomainError};

const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
const DEFAULT_PROMPTS_PATH: &str = "config/prompts.yaml";

/// Service configuration plus prompt templates.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub rag: RagConfig,
    pub chunking: ChunkingConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Gemini,
}

impl LlmProvider {
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            other => Err(DomainError::configuration(format!(
                "unknown LLM provider '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub max_tokens: u64,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Qdrant,
    Memory,
}

impl std::str::FromStr for VectorBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            other => Err(DomainError::configuration(format!(
                "unknown vector store backend '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub backend: VectorBackend,
    pub url: String,
    pub index_name: String,
    pub namespace: String,
    pub ready_poll_interval_ms: u64,
    pub ready_timeout_seconds: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Qdrant,
            url: "http://localhost:6334".to_string(),
            index_name: "pdf-chat".to_string(),
            namespace: String::new(),
            ready_poll_interval_ms: 1000,
            ready_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
    pub snippet_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            snippet_chars: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: splitter::DEFAULT_CHUNK_SIZE,
            chunk_overlap: splitter::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub qa: QaPrompts,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QaPrompts {
    /// System instruction. `{not_found}` is replaced with `not_found`.
    pub system: String,
    pub not_found: String,
}

impl Default for QaPrompts {
    fn default() -> Self {
        Self {
            system: "You are a domain expert assistant that answers questions using the \
                     provided context. If the answer is not contained in the context, \
                     respond with '{not_found}'"
                .to_string(),
            not_found: "I could not find that in the document.".to_string(),
        }
    }
}

impl QaPrompts {
    pub fn system_prompt(&self) -> String {
        self.system.replace("{not_found}", &self.not_found)
    }
}

impl AppConfig {
    /// Reads the YAML files named by `CONFIG_PATH` / `PROMPTS_PATH` (falling
    /// back to defaults when a file is absent) and applies environment
    /// overrides.
    pub fn load() -> Result<Self, DomainError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let prompts_path =
            std::env::var("PROMPTS_PATH").unwrap_or_else(|_| DEFAULT_PROMPTS_PATH.into());

        let mut app = Self {
            config: read_yaml(Path::new(&config_path))?,
            prompts: read_yaml(Path::new(&prompts_path))?,
        };
        app.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(app)
    }

    pub fn from_yaml(config: &str, prompts: &str) -> Result<Self, DomainError> {
        Ok(Self {
            config: parse_yaml(config)?,
            prompts: parse_yaml(prompts)?,
        })
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), DomainError> {
        let cfg = &mut self.config;

        if let Some(host) = lookup("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            cfg.server.port = parse_var("SERVER_PORT", &port)?;
        }
        if let Some(backend) = lookup("VECTOR_BACKEND") {
            cfg.vector_store.backend = backend.parse()?;
        }
        if let Some(url) = lookup("QDRANT_URL") {
            cfg.vector_store.url = url;
        }
        if let Some(name) = lookup("VECTOR_INDEX_NAME") {
            cfg.vector_store.index_name = name;
        }
        if let Some(namespace) = lookup("VECTOR_NAMESPACE") {
            cfg.vector_store.namespace = namespace;
        }
        if let Some(dimension) = lookup("EMBEDDING_DIMENSION") {
            cfg.embedding.dimension = parse_var("EMBEDDING_DIMENSION", &dimension)?;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            cfg.embedding.model = model;
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            cfg.llm.provider = provider.parse()?;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            cfg.llm.model = model;
        }

        Ok(())
    }

    /// Credential variables that are required by this configuration but not
    /// set (or blank).
    pub fn missing_credentials(&self, lookup: impl Fn(&str) -> Option<String>) -> Vec<&'static str> {
        let mut required = vec!["OPENAI_API_KEY"];
        let chat_key = self.config.llm.provider.api_key_var();
        if !required.contains(&chat_key) {
            required.push(chat_key);
        }

        required
            .into_iter()
            .filter(|key| lookup(key).map_or(true, |v| v.trim().is_empty()))
            .collect()
    }

    /// Fails when credentials are missing or values are inconsistent.
    pub fn validate(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), DomainError> {
        let missing = self.missing_credentials(lookup);
        if !missing.is_empty() {
            return Err(DomainError::configuration(format!(
                "missing required credentials: {}",
                missing.join(", ")
            )));
        }

        let cfg = &self.config;
        if cfg.embedding.dimension == 0 {
            return Err(DomainError::configuration("embedding.dimension must be positive"));
        }
        if cfg.rag.top_k == 0 {
            return Err(DomainError::configuration("rag.top_k must be positive"));
        }
        if cfg.vector_store.index_name.trim().is_empty() {
            return Err(DomainError::configuration("vector_store.index_name is empty"));
        }

        Ok(())
    }
}

fn read_yaml<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T, DomainError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => parse_yaml(&raw).map_err(|e| {
            DomainError::configuration(format!("{}: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(DomainError::configuration(format!(
            "cannot read {}: {e}",
            path.display()
        ))),
    }
}

fn parse_yaml<T: Default + for<'de> Deserialize<'de>>(raw: &str) -> Result<T, DomainError> {
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(raw).map_err(|e| DomainError::configuration(e.to_string()))
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DomainError> {
    value
        .trim()
        .parse()
        .map_err(|_| DomainError::configuration(format!("invalid value for {key}: '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let app = AppConfig::default();
        assert_eq!(app.config.rag.top_k, 5);
        assert_eq!(app.config.chunking.chunk_size, 1000);
        assert_eq!(app.config.chunking.chunk_overlap, 150);
        assert_eq!(app.config.vector_store.ready_poll_interval_ms, 1000);
        assert_eq!(app.config.llm.provider, LlmProvider::OpenAi);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let app = AppConfig::from_yaml(
            "vector_store:\n  index_name: contracts\n  namespace: tenant-a\nllm:\n  provider: anthropic\n  model: claude-3-5-haiku-latest\n",
            "",
        )
        .unwrap();

        assert_eq!(app.config.vector_store.index_name, "contracts");
        assert_eq!(app.config.vector_store.namespace, "tenant-a");
        assert_eq!(app.config.vector_store.url, "http://localhost:6334");
        assert_eq!(app.config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(app.config.llm.max_tokens, 1024);
        assert_eq!(app.config.embedding.dimension, 1536);
    }

    #[test]
    fn test_env_overrides() {
        let mut app = AppConfig::default();
        app.apply_overrides(env(&[
            ("SERVER_PORT", "9000"),
            ("VECTOR_NAMESPACE", "ns"),
            ("LLM_PROVIDER", "Gemini"),
            ("EMBEDDING_DIMENSION", "3072"),
            ("VECTOR_BACKEND", "memory"),
        ]))
        .unwrap();

        assert_eq!(app.config.vector_store.backend, VectorBackend::Memory);
        assert_eq!(app.config.server.port, 9000);
        assert_eq!(app.config.vector_store.namespace, "ns");
        assert_eq!(app.config.llm.provider, LlmProvider::Gemini);
        assert_eq!(app.config.embedding.dimension, 3072);
    }

    #[test]
    fn test_invalid_override_is_configuration_error() {
        let mut app = AppConfig::default();
        let err = app
            .apply_overrides(env(&[("SERVER_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn test_missing_credentials_fail_validation() {
        let mut app = AppConfig::default();
        app.config.llm.provider = LlmProvider::Anthropic;

        assert_eq!(
            app.missing_credentials(env(&[("OPENAI_API_KEY", "sk-test")])),
            vec!["ANTHROPIC_API_KEY"]
        );
        assert!(matches!(
            app.validate(env(&[("ANTHROPIC_API_KEY", "  ")])),
            Err(DomainError::Configuration(_))
        ));
        assert!(app
            .validate(env(&[("OPENAI_API_KEY", "a"), ("ANTHROPIC_API_KEY", "b")]))
            .is_ok());
    }

    #[test]
    fn test_system_prompt_embeds_not_found_phrase() {
        let prompts = QaPrompts::default();
        assert!(prompts
            .system_prompt()
            .ends_with("respond with 'I could not find that in the document.'"));
    }

    #[test]
    fn test_shipped_config_files_parse() {
        let app = AppConfig::from_yaml(
            include_str!("../../config/config.yaml"),
            include_str!("../../config/prompts.yaml"),
        )
        .unwrap();

        assert_eq!(app.config.server.port, 8000);
        assert_eq!(app.config.vector_store.backend, VectorBackend::Qdrant);
        assert_eq!(app.config.upload.max_bytes, UploadConfig::default().max_bytes);
        assert!(app
            .prompts
            .qa
            .system_prompt()
            .ends_with("'I could not find that in the document.'"));
    }
}
