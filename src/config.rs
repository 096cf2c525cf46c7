use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::MoatError;

const REDACTED: &str = "REDACTED";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MoatConfig {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub environment: String,
    pub debug: bool,
    pub log_level: String,
    pub secret_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub journal_path: String,
    pub trace_log: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iters: usize,
    pub retrieve_k: usize,
    pub min_response_len: usize,
    pub context_preview_chars: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            debug: true,
            log_level: "info".into(),
            secret_key: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_moat_dir()
            .join("moat.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            journal_path: "memories.json".into(),
            trace_log: "logs/traces.log".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_moat_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: crate::embedding::local::DEFAULT_MODEL.into(),
            cache_dir,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iters: 5,
            retrieve_k: 3,
            min_response_len: 50,
            context_preview_chars: 100,
        }
    }
}

/// Returns `~/.moat/`, or `./.moat/` when no home directory is known.
pub fn default_moat_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".moat")
}

/// Returns the default config file path: `~/.moat/config.toml`
pub fn default_config_path() -> PathBuf {
    default_moat_dir().join("config.toml")
}

/// Load `.env` from the working directory (or a parent) into the process
/// environment. Returns the file that was read, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

impl MoatConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MoatConfig::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    ///
    /// Recognized: MOAT_ENV, MOAT_DEBUG, SECRET_KEY, OPENAI_API_KEY, MOAT_DB,
    /// DATABASE_URL, MOAT_JOURNAL, MOAT_TRACE_LOG, MOAT_LOG_LEVEL.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("MOAT_ENV") {
            self.app.environment = val;
        }
        if let Some(val) = lookup("MOAT_DEBUG") {
            match parse_bool(&val) {
                Some(b) => self.app.debug = b,
                None => warn!(value = %val, "ignoring unparseable MOAT_DEBUG"),
            }
        }
        if let Some(val) = lookup("SECRET_KEY").filter(|v| !v.is_empty()) {
            self.app.secret_key = Some(val);
        }
        if let Some(val) = lookup("OPENAI_API_KEY").filter(|v| !v.is_empty()) {
            self.llm.api_key = Some(val);
        }
        if let Some(val) = lookup("DATABASE_URL") {
            match sqlite_path_from_url(&val) {
                Some(path) => self.storage.db_path = path,
                None => warn!(url = %val, "DATABASE_URL is not a sqlite location, ignoring"),
            }
        }
        // MOAT_DB wins over DATABASE_URL
        if let Some(val) = lookup("MOAT_DB") {
            self.storage.db_path = val;
        }
        if let Some(val) = lookup("MOAT_JOURNAL") {
            self.storage.journal_path = val;
        }
        if let Some(val) = lookup("MOAT_TRACE_LOG") {
            self.storage.trace_log = val;
        }
        if let Some(val) = lookup("MOAT_LOG_LEVEL") {
            self.app.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn resolved_journal_path(&self) -> PathBuf {
        expand_tilde(&self.storage.journal_path)
    }

    pub fn resolved_trace_log(&self) -> PathBuf {
        expand_tilde(&self.storage.trace_log)
    }

    /// Whole config as JSON with secrets replaced by `"REDACTED"`.
    pub fn redacted(&self) -> serde_json::Value {
        let mut safe = self.clone();
        if secret_set(&safe.app.secret_key) {
            safe.app.secret_key = Some(REDACTED.into());
        }
        if secret_set(&safe.llm.api_key) {
            safe.llm.api_key = Some(REDACTED.into());
        }
        serde_json::to_value(&safe).unwrap_or(serde_json::Value::Null)
    }

    /// Fail loudly when production runs without its secrets.
    pub fn ensure_required(&self) -> Result<(), MoatError> {
        if !self.app.environment.eq_ignore_ascii_case("production") {
            return Ok(());
        }
        let mut missing = Vec::new();
        if !secret_set(&self.app.secret_key) {
            missing.push("SECRET_KEY".to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MoatError::MissingSettings {
                environment: self.app.environment.clone(),
                missing,
            })
        }
    }
}

/// Empty strings count as unset, wherever they came from.
fn secret_set(secret: &Option<String>) -> bool {
    secret.as_deref().is_some_and(|s| !s.is_empty())
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Accepts `sqlite:///abs/path`, `sqlite://rel/path`, `sqlite:path` or a bare path.
fn sqlite_path_from_url(url: &str) -> Option<String> {
    if let Some(rest) = url.strip_prefix("sqlite://") {
        return (!rest.is_empty()).then(|| rest.to_string());
    }
    if let Some(rest) = url.strip_prefix("sqlite:") {
        return (!rest.is_empty()).then(|| rest.to_string());
    }
    if url.contains("://") || url.is_empty() {
        return None;
    }
    Some(url.to_string())
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
