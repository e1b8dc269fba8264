//! Configuration management for bookrag.
//!
//! Configuration is layered, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.bookrag/config.yaml` or `BOOKRAG_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The answering pipeline only ever sees the resolved [`RagConfig`], which is
//! handed over once at construction and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .bookrag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("ollama", "openai", "openrouter")
    pub provider: String,

    /// Model identifier for generation
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Chunk store location
    pub store: StoreSettings,

    /// Pipeline thresholds and budgets
    pub rag: RagConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// OpenAI-compatible chat completions (OpenAI, OpenRouter)
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model name configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Endpoint override, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }
}

/// Embedding provider settings.
///
/// Must match the provider and model used when the corpus was ingested,
/// otherwise query vectors land in a different space than chunk vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Provider name: "mock", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Endpoint override for HTTP providers
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Chunk store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite file holding chunks and embeddings.
    /// Relative paths resolve against the workspace; defaults to `.bookrag/book.sqlite`.
    pub path: Option<PathBuf>,
}

/// Timeout and retry budget for every external call made by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles after each failure
    pub initial_backoff_ms: u64,

    /// Upper bound for a single backoff sleep
    pub max_backoff_ms: u64,

    /// Per-attempt timeout
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
            timeout_secs: 30,
        }
    }
}

/// Immutable configuration consumed by the answering pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Candidates requested from the vector index per query
    pub top_k: usize,

    /// Minimum similarity (0.0 - 1.0) for a candidate to be kept
    pub similarity_threshold: f32,

    /// Maximum tokens of assembled context handed to the model
    pub context_token_budget: usize,

    /// Sampling temperature for generation
    pub temperature: f32,

    /// Maximum tokens the model may generate
    pub max_response_tokens: u32,

    /// Maximum query length in characters
    pub max_query_length: usize,

    /// Book contexts shorter than this many characters count as insufficient
    pub min_context_chars: usize,

    /// Minimum support score for a claim to count as grounded. The default 1.0
    /// requires every content word of the claim to appear in one passage.
    pub claim_support_threshold: f32,

    /// Claim support scorer: "lexical" or "trigram"
    pub scorer: String,

    /// Text returned when the answer is refused
    pub refusal_message: String,

    /// Text shown when a dependency is down
    pub unavailable_message: String,

    /// Timeout and retry budget for external calls
    pub retry: RetrySettings,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.7,
            context_token_budget: 2048,
            temperature: 0.1,
            max_response_tokens: 500,
            max_query_length: 1000,
            min_context_chars: 50,
            claim_support_threshold: 1.0,
            scorer: "lexical".to_string(),
            refusal_message:
                "I cannot answer this question: the book does not contain enough information about it."
                    .to_string(),
            unavailable_message:
                "The service is temporarily unavailable. Please try again in a moment.".to_string(),
            retry: RetrySettings::default(),
        }
    }
}

impl RagConfig {
    /// Check that every value is inside its meaningful range.
    pub fn validate(&self) -> AppResult<()> {
        if self.top_k == 0 {
            return Err(AppError::Config("rag.top_k must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AppError::Config(format!(
                "rag.similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.context_token_budget == 0 {
            return Err(AppError::Config(
                "rag.context_token_budget must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Config(format!(
                "rag.temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_response_tokens == 0 {
            return Err(AppError::Config(
                "rag.max_response_tokens must be at least 1".to_string(),
            ));
        }
        if self.max_query_length == 0 {
            return Err(AppError::Config(
                "rag.max_query_length must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.claim_support_threshold) || self.claim_support_threshold == 0.0 {
            return Err(AppError::Config(format!(
                "rag.claim_support_threshold must be within (0, 1], got {}",
                self.claim_support_threshold
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "rag.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.timeout_secs == 0 {
            return Err(AppError::Config(
                "rag.retry.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.refusal_message.trim().is_empty() {
            return Err(AppError::Config(
                "rag.refusal_message must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    embedding: Option<EmbeddingSettings>,
    store: Option<StoreSettings>,
    rag: Option<RagConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            llm: None,
            embedding: EmbeddingSettings::default(),
            store: StoreSettings::default(),
            rag: RagConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `BOOKRAG_WORKSPACE`: Override workspace path
    /// - `BOOKRAG_CONFIG`: Path to config file
    /// - `BOOKRAG_PROVIDER`, `BOOKRAG_MODEL`, `BOOKRAG_API_KEY`: generation provider
    /// - `BOOKRAG_TOP_K`, `BOOKRAG_SIMILARITY_THRESHOLD`, `BOOKRAG_CONTEXT_TOKEN_BUDGET`,
    ///   `BOOKRAG_TEMPERATURE`, `BOOKRAG_MAX_RESPONSE_TOKENS`, `BOOKRAG_MAX_QUERY_LENGTH`:
    ///   pipeline overrides
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], with the workspace and config file fixed up
    /// front so the right YAML file is merged.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("BOOKRAG_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("BOOKRAG_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".bookrag/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        if let Ok(provider) = std::env::var("BOOKRAG_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("BOOKRAG_MODEL") {
            config.model = model;
        }

        if let Ok(key) = std::env::var("BOOKRAG_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        config.rag = apply_rag_env(config.rag, |name| std::env::var(name).ok())?;

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }
            result.llm = Some(llm);
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(store) = config_file.store {
            result.store = store;
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_json = true;
        }

        self
    }

    /// Get the path to the .bookrag directory.
    pub fn bookrag_dir(&self) -> PathBuf {
        self.workspace.join(".bookrag")
    }

    /// Resolve the chunk store path against the workspace.
    pub fn store_path(&self) -> PathBuf {
        match &self.store.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.workspace.join(path),
            None => self.bookrag_dir().join("book.sqlite"),
        }
    }

    /// Get the configuration for a named provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the API key for a provider.
    ///
    /// `BOOKRAG_API_KEY` wins; otherwise the provider's `apiKeyEnv` is read.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => std::env::var(api_key_env).ok(),
            _ => None,
        }
    }

    /// Validate configuration for the active provider and the pipeline.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "openrouter", "ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if self.provider != "ollama" && self.resolve_api_key(&self.provider).is_none() {
            return Err(AppError::Config(format!(
                "Provider '{}' requires an API key (set BOOKRAG_API_KEY or apiKeyEnv)",
                self.provider
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }

        self.rag.validate()
    }
}

/// Apply `BOOKRAG_*` pipeline overrides using the given variable lookup.
fn apply_rag_env<F>(mut rag: RagConfig, lookup: F) -> AppResult<RagConfig>
where
    F: Fn(&str) -> Option<String>,
{
    fn parse<T: std::str::FromStr>(name: &str, value: String) -> AppResult<T> {
        value
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid value for {}: {:?}", name, value)))
    }

    if let Some(v) = lookup("BOOKRAG_TOP_K") {
        rag.top_k = parse("BOOKRAG_TOP_K", v)?;
    }
    if let Some(v) = lookup("BOOKRAG_SIMILARITY_THRESHOLD") {
        rag.similarity_threshold = parse("BOOKRAG_SIMILARITY_THRESHOLD", v)?;
    }
    if let Some(v) = lookup("BOOKRAG_CONTEXT_TOKEN_BUDGET") {
        rag.context_token_budget = parse("BOOKRAG_CONTEXT_TOKEN_BUDGET", v)?;
    }
    if let Some(v) = lookup("BOOKRAG_TEMPERATURE") {
        rag.temperature = parse("BOOKRAG_TEMPERATURE", v)?;
    }
    if let Some(v) = lookup("BOOKRAG_MAX_RESPONSE_TOKENS") {
        rag.max_response_tokens = parse("BOOKRAG_MAX_RESPONSE_TOKENS", v)?;
    }
    if let Some(v) = lookup("BOOKRAG_MAX_QUERY_LENGTH") {
        rag.max_query_length = parse("BOOKRAG_MAX_QUERY_LENGTH", v)?;
    }

    Ok(rag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.rag.claim_support_threshold, 1.0);
        assert_eq!(config.rag.similarity_threshold, 0.7);
        assert!(!config.verbose);
        assert!(config.rag.validate().is_ok());
    }

    #[test]
    fn test_store_path_defaults_under_bookrag_dir() {
        let config = AppConfig::default();
        assert!(config.store_path().ends_with(".bookrag/book.sqlite"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("openrouter".to_string()),
            Some("google/gemini-pro".to_string()),
            None,
            true,
            false,
            true,
        );

        assert_eq!(overridden.provider, "openrouter");
        assert_eq!(overridden.model, "google/gemini-pro");
        assert!(overridden.verbose);
        assert!(overridden.log_json);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: openrouter
  providers:
    openrouter:
      apiKeyEnv: OPENROUTER_API_KEY
      model: google/gemini-pro
      endpoint: https://openrouter.ai/api/v1
embedding:
  provider: ollama
  model: nomic-embed-text
  dimensions: 768
store:
  path: data/book.sqlite
rag:
  top_k: 8
  similarity_threshold: 0.55
logging:
  level: warn
  json: true
"#,
        )
        .unwrap();

        let mut base = AppConfig::default();
        base.workspace = temp.path().to_path_buf();
        let merged = base.merge_yaml(&path).unwrap();

        assert_eq!(merged.provider, "openrouter");
        assert_eq!(merged.model, "google/gemini-pro");
        assert_eq!(merged.embedding.dimensions, 768);
        assert_eq!(merged.rag.top_k, 8);
        assert_eq!(merged.rag.similarity_threshold, 0.55);
        // Unspecified rag fields keep their defaults
        assert_eq!(merged.rag.context_token_budget, 2048);
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert!(merged.log_json);
        assert_eq!(merged.store_path(), temp.path().join("data/book.sqlite"));
        assert_eq!(
            merged
                .get_provider_config("openrouter")
                .and_then(|p| p.endpoint()),
            Some("https://openrouter.ai/api/v1")
        );
    }

    #[test]
    fn test_load_with_reads_workspace_config() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".bookrag")).unwrap();
        std::fs::write(
            temp.path().join(".bookrag/config.yaml"),
            "rag:\n  context_token_budget: 1024\n",
        )
        .unwrap();

        let config = AppConfig::load_with(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.rag.context_token_budget, 1024);

        let missing = AppConfig::load_with(Some(temp.path().join("nope")), None);
        assert!(matches!(missing, Err(AppError::Config(_))));
    }

    #[test]
    fn test_rag_env_overrides() {
        let rag = apply_rag_env(RagConfig::default(), |name| match name {
            "BOOKRAG_TOP_K" => Some("3".to_string()),
            "BOOKRAG_SIMILARITY_THRESHOLD" => Some(" 0.4 ".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(rag.top_k, 3);
        assert_eq!(rag.similarity_threshold, 0.4);
        assert_eq!(rag.max_query_length, 1000);
    }

    #[test]
    fn test_rag_env_rejects_garbage() {
        let result = apply_rag_env(RagConfig::default(), |name| {
            (name == "BOOKRAG_TOP_K").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_rag_validate_ranges() {
        let mut rag = RagConfig::default();
        rag.similarity_threshold = 1.5;
        assert!(rag.validate().is_err());

        let mut rag = RagConfig::default();
        rag.top_k = 0;
        assert!(rag.validate().is_err());

        let mut rag = RagConfig::default();
        rag.retry.max_attempts = 0;
        assert!(rag.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }
}
