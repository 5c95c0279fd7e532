//! TOML configuration.
//!
//! Every section has defaults so a minimal file only needs the values that
//! differ per deployment. Secrets (the OpenAI key and the JWT signing secret)
//! are never read from the file; the config only names the environment
//! variables that hold them.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub profiling: ProfilingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Upper bound for multipart request bodies.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3001".to_string()
}
fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            api_key_env: default_api_key_env(),
            max_retries: default_llm_max_retries(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_llm_max_retries() -> u32 {
    3
}
fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_reset_ttl_secs")]
    pub reset_ttl_secs: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            session_ttl_secs: default_session_ttl_secs(),
            reset_ttl_secs: default_reset_ttl_secs(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

fn default_jwt_secret_env() -> String {
    "JWT_SECRET".to_string()
}
fn default_session_ttl_secs() -> u64 {
    3 * 60 * 60
}
fn default_reset_ttl_secs() -> u64 {
    10 * 60
}
fn default_bcrypt_cost() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Scratch root for uploads, archived LLM responses, scripts and reports.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Additional or overriding upload destinations, keyed by multipart field.
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            destinations: Vec::new(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./uploads")
}

#[derive(Debug, Deserialize, Clone)]
pub struct DestinationConfig {
    pub field: String,
    /// Directory relative to `storage.root`.
    pub dir: String,
    pub prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfilingConfig {
    /// Program used to run generated scripts: `<interpreter> <script> <in> <out>`.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Language named in the script-generation prompt.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_script_extension")]
    pub script_extension: String,
    #[serde(default = "default_profiling_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_profiling_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            language: default_language(),
            script_extension: default_script_extension(),
            max_retries: default_profiling_max_retries(),
            timeout_secs: default_profiling_timeout_secs(),
        }
    }
}

fn default_interpreter() -> String {
    "python3".to_string()
}
fn default_language() -> String {
    "Python".to_string()
}
fn default_script_extension() -> String {
    "py".to_string()
}
fn default_profiling_max_retries() -> u32 {
    3
}
fn default_profiling_timeout_secs() -> u64 {
    300
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    match config.llm.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.llm.model.trim().is_empty() {
        anyhow::bail!("llm.model must not be empty");
    }

    if config.profiling.interpreter.trim().is_empty() {
        anyhow::bail!("profiling.interpreter must not be empty");
    }

    if config.profiling.timeout_secs == 0 {
        anyhow::bail!("profiling.timeout_secs must be > 0");
    }

    if config.auth.session_ttl_secs == 0 || config.auth.reset_ttl_secs == 0 {
        anyhow::bail!("auth token lifetimes must be > 0");
    }

    if !(4..=31).contains(&config.auth.bcrypt_cost) {
        anyhow::bail!("auth.bcrypt_cost must be in [4, 31]");
    }

    for dest in &config.storage.destinations {
        if dest.field.is_empty() || dest.prefix.is_empty() {
            anyhow::bail!("storage.destinations entries need a field and a prefix");
        }
    }

    Ok(())
}
