use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_ANALYZER_CONCURRENCY, DEFAULT_EMERGENCY_KEYWORDS, DEFAULT_HOST,
    DEFAULT_LLM_TIMEOUT_SECS, DEFAULT_MARKET_INTERVAL_SECS, DEFAULT_MAX_PAGES,
    DEFAULT_NOISE_KEYWORDS, DEFAULT_OFF_INTERVAL_SECS, DEFAULT_PORT, DEFAULT_REQUEST_DELAY_MS,
    ENV_CONFIG, ENV_EMBED_URL, ENV_LLM_BASE_URL, ENV_LLM_MODEL, ENV_LLM_PROVIDER, ENV_QDRANT_URL,
    ENV_SQLITE_PATH,
};

// =============================================================================
// Infra Backend Enum
// =============================================================================

/// Backend for the stream bus and the dedup window
///
/// `memory` keeps everything in-process (development, tests, single
/// instance). `redis` uses Redis Streams and SETs for durability across
/// restarts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InfraBackendType {
    #[default]
    Memory,
    Redis,
}

impl fmt::Display for InfraBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfraBackendType::Memory => write!(f, "memory"),
            InfraBackendType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for InfraBackendType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(InfraBackendType::Memory),
            "redis" => Ok(InfraBackendType::Redis),
            other => Err(format!("unknown infra backend: {other}")),
        }
    }
}

// =============================================================================
// Config Sections
// =============================================================================

/// HTTP server binding
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Stream bus + dedup substrate
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InfraConfig {
    pub backend: InfraBackendType,
    /// Required when `backend = "redis"`
    pub redis_url: Option<String>,
}

/// Relational store (sentiment rows + stock universe)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/sentinews.db"),
        }
    }
}

/// Pipeline tuning and the curated keyword lists
///
/// Keyword lists are configuration, not code constants, so operators can
/// tune them without a deploy; the compiled-in defaults apply when the
/// config file omits them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pages crawled per ticker
    pub max_pages: u32,
    /// Delay between tickers (and pages) in milliseconds
    pub request_delay_ms: u64,
    /// Seconds between cycles during market hours
    pub market_interval_secs: u64,
    /// Seconds between cycles off-hours
    pub off_interval_secs: u64,
    /// Concurrent in-flight LLM calls in the analyzer
    pub analyzer_concurrency: usize,
    /// Headline blocklist applied before publish
    pub noise_keywords: Vec<String>,
    /// Breaking-news markers surfaced by the analyzer
    pub emergency_keywords: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            market_interval_secs: DEFAULT_MARKET_INTERVAL_SECS,
            off_interval_secs: DEFAULT_OFF_INTERVAL_SECS,
            analyzer_concurrency: DEFAULT_ANALYZER_CONCURRENCY,
            noise_keywords: DEFAULT_NOISE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            emergency_keywords: DEFAULT_EMERGENCY_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Sentiment LLM provider selection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name in the registry (`openai`, `ollama`)
    pub provider: String,
    /// Base URL of the provider endpoint
    pub base_url: String,
    /// Model id passed through to the provider
    pub model: String,
    /// Optional API key (OpenAI-compatible servers may not need one)
    pub api_key: Option<String>,
    /// Per-call timeout ceiling in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "http://localhost:8000/v1".to_string(),
            model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            api_key: None,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

/// Vector sink (embedding server + vector store)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VectorConfig {
    pub qdrant_url: String,
    /// OpenAI-compatible embeddings base URL
    pub embed_url: String,
    pub embed_model: String,
    pub collection: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6333".to_string(),
            embed_url: "http://localhost:8002/v1".to_string(),
            embed_model: "nlpai-lab/KURE-v1".to_string(),
            collection: "rag_stock_data".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Application configuration
///
/// Sources, in increasing precedence: compiled defaults, JSON config
/// file, environment variables, CLI flags.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub infra: InfraConfig,
    pub database: DatabaseConfig,
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    pub vector: VectorConfig,
}

impl AppConfig {
    /// Load configuration, merging file, environment, and CLI
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let path = Self::resolve_config_path(cli);
        let mut config = match &path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };

        config.apply_env_overrides();
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    fn resolve_config_path(cli: &CliConfig) -> Option<PathBuf> {
        if let Some(path) = &cli.config {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return Some(PathBuf::from(path));
        }
        Some(PathBuf::from(CONFIG_FILE_NAME))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(ENV_SQLITE_PATH) {
            self.database.sqlite_path = PathBuf::from(path);
        }
        if let Ok(provider) = std::env::var(ENV_LLM_PROVIDER) {
            self.llm.provider = provider;
        }
        if let Ok(url) = std::env::var(ENV_LLM_BASE_URL) {
            self.llm.base_url = url;
        }
        if let Ok(model) = std::env::var(ENV_LLM_MODEL) {
            self.llm.model = model;
        }
        if let Ok(url) = std::env::var(ENV_QDRANT_URL) {
            self.vector.qdrant_url = url;
        }
        if let Ok(url) = std::env::var(ENV_EMBED_URL) {
            self.vector.embed_url = url;
        }
    }

    fn apply_cli(&mut self, cli: &CliConfig) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(backend) = cli.infra_backend {
            self.infra.backend = backend;
        }
        if let Some(url) = &cli.redis_url {
            self.infra.redis_url = Some(url.clone());
        }
    }

    fn validate(&self) -> Result<()> {
        if self.infra.backend == InfraBackendType::Redis && self.infra.redis_url.is_none() {
            bail!("infra.redis_url is required when infra.backend = \"redis\"");
        }
        if self.vector.chunk_overlap >= self.vector.chunk_size {
            bail!("vector.chunk_overlap must be smaller than vector.chunk_size");
        }
        Ok(())
    }
}
