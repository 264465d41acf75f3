//! Configuration management for Groundwork.
//!
//! Configuration is layered, later layers winning:
//! - Built-in defaults
//! - A YAML config file (`groundwork.yaml` or `$GROUNDWORK_CONFIG`)
//! - Environment variables
//! - Command-line flags (see [`AppConfig::with_overrides`])

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default config file name looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "groundwork.yaml";

/// Providers the LLM factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config file this configuration was merged from, if any
    pub config_file: Option<PathBuf>,

    /// Socket address the HTTP server binds to
    pub bind: String,

    /// Language-model settings
    pub llm: LlmSettings,

    /// Retrieval pipeline settings
    pub retrieval: RetrievalSettings,

    /// Base URL overrides for the source providers
    pub sources: SourceEndpoints,

    /// Optional YAML file overriding the grounding prompt
    pub prompt_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Language-model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider identifier ("openai" or "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint (OpenAI-compatible gateway or Ollama host)
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: String,

    /// Resolved API key; never read from or written to the config file
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens generated per answer
    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 1000,
        }
    }
}

/// Retrieval pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Upper bound for a single source adapter call, in seconds
    #[serde(rename = "adapterTimeoutSecs")]
    pub adapter_timeout_secs: u64,

    /// Number of raw results requested from each source
    #[serde(rename = "searchLimit")]
    pub search_limit: usize,

    /// Candidates kept per source after reranking
    #[serde(rename = "topK")]
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: 15,
            search_limit: 10,
            top_k: 3,
        }
    }
}

/// Base URL overrides for source providers.
///
/// `None` means the provider's public API host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceEndpoints {
    pub confluence: Option<String>,
    pub gmail: Option<String>,
    pub slack: Option<String>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    server: Option<ServerSection>,
    llm: Option<LlmSettings>,
    retrieval: Option<RetrievalSettings>,
    sources: Option<SourceEndpoints>,
    prompt: Option<PromptSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSection {
    bind: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
struct PromptSection {
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            bind: "0.0.0.0:8085".to_string(),
            llm: LlmSettings::default(),
            retrieval: RetrievalSettings::default(),
            sources: SourceEndpoints::default(),
            prompt_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// `config_file` takes precedence over `$GROUNDWORK_CONFIG`; when neither
    /// is set, `./groundwork.yaml` is used if it exists. An explicitly named
    /// file that does not exist is an error.
    ///
    /// Environment variables:
    /// - `GROUNDWORK_CONFIG`: Path to config file
    /// - `GROUNDWORK_BIND` / `APP_PORT`: Listen address / port
    /// - `GROUNDWORK_PROVIDER`, `GROUNDWORK_LLM_ENDPOINT`: LLM provider
    /// - `OPENAI_MODEL`: Model identifier
    /// - `OPENAI_API_KEY` (or the configured `apiKeyEnv`): API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        let explicit = config_file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("GROUNDWORK_CONFIG").ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                Self::default().merge_yaml(&path)?
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::default().merge_yaml(&path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();
        result.config_file = Some(path.to_path_buf());

        if let Some(server) = file.server {
            if let Some(bind) = server.bind {
                result.bind = bind;
            } else if let Some(port) = server.port {
                result.bind = format!("0.0.0.0:{}", port);
            }
        }

        if let Some(llm) = file.llm {
            result.llm = llm;
        }

        if let Some(retrieval) = file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(sources) = file.sources {
            result.sources = sources;
        }

        if let Some(prompt) = file.prompt {
            result.prompt_file = prompt.file;
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply environment variables through `lookup`.
    ///
    /// Taking the lookup as a closure keeps this testable without touching
    /// the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("GROUNDWORK_BIND") {
            self.bind = bind;
        } else if let Some(port) = lookup("APP_PORT") {
            self.bind = format!("0.0.0.0:{}", port);
        }

        if let Some(provider) = lookup("GROUNDWORK_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Some(endpoint) = lookup("GROUNDWORK_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }

        if let Some(model) = lookup("OPENAI_MODEL") {
            self.llm.model = model;
        }

        if let Some(key) = lookup(&self.llm.api_key_env).filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }

        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }

        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the file and environment.
    pub fn with_overrides(
        mut self,
        bind: Option<String>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(bind) = bind {
            self.bind = bind;
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
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

        self
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.llm.provider.to_lowercase();

        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "openai" && self.llm.api_key.is_none() {
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.llm.api_key_env
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Per-call adapter timeout.
    pub fn adapter_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.retrieval.adapter_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.bind, "0.0.0.0:8085");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.search_limit, 10);
        assert!(!config.verbose);
    }

    #[test]
    fn test_apply_env() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("APP_PORT", "9000"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("NO_COLOR", "1"),
        ]));

        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.no_color);
    }

    #[test]
    fn test_empty_api_key_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("OPENAI_API_KEY", "")]));
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_merge_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("groundwork.yaml");
        std::fs::write(
            &path,
            r#"
server:
  port: 7070
llm:
  provider: ollama
  model: llama3.2
  endpoint: http://localhost:11434
retrieval:
  adapterTimeoutSecs: 5
sources:
  slack: http://127.0.0.1:9999
logging:
  level: debug
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(config.bind, "0.0.0.0:7070");
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.temperature, 0.3);
        assert_eq!(config.retrieval.adapter_timeout_secs, 5);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.sources.slack.as_deref(), Some("http://127.0.0.1:9999"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(config.no_color);
        assert_eq!(config.config_file, Some(path));
    }

    #[test]
    fn test_merge_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "llm: [unclosed").unwrap();
        assert!(AppConfig::default().merge_yaml(&path).is_err());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = AppConfig::load(Some(Path::new("/definitely/not/here.yaml")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some("127.0.0.1:3000".to_string()),
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.bind, "127.0.0.1:3000");
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model, "llama3.2");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_openai_requires_key() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_err());
        config.llm.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_ollama() {
        let mut config = AppConfig::default();
        config.llm.provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }
}
