use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Knowledge file types whose content can be inlined into a prompt.
pub const SUPPORTED_KNOWLEDGE_TYPES: &[&str] = &["text/plain", "text/markdown", "application/json"];

/// Top-level config (recoup.toml + RECOUP_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoupConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Where the base system prompt comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Optional file whose contents replace the built-in base prompt.
    pub base_prompt_path: Option<String>,
}

/// Artist knowledge-base retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Per-file timeout when a knowledge entry has to be fetched by URL.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// MIME types eligible for the prompt. Anything else is skipped.
    #[serde(default = "default_supported_types")]
    pub supported_types: Vec<String>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            supported_types: default_supported_types(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}
fn default_supported_types() -> Vec<String> {
    SUPPORTED_KNOWLEDGE_TYPES.iter().map(|s| s.to_string()).collect()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.recoup/recoup.db", home)
}

impl RecoupConfig {
    /// Load config from a TOML file with RECOUP_* env var overrides.
    ///
    /// Nested keys use a double underscore in env vars because field names
    /// contain single underscores: `RECOUP_KNOWLEDGE__FETCH_TIMEOUT_SECS=5`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::RecoupError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("RECOUP_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.recoup/recoup.toml", home)
}
