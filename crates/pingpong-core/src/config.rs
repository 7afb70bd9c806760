use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::process::{DEFAULT_AGENT_CLASS, DEFAULT_AGENT_MODULE};

/// Deployment mode flag. Only `production` persists conversations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum DeploymentMode {
    Production,
    NonProduction(String),
}

impl DeploymentMode {
    /// Exact, case-sensitive match on `production`.
    pub fn parse(value: &str) -> Self {
        if value == "production" {
            Self::Production
        } else {
            Self::NonProduction(value.to_string())
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Production => "production",
            Self::NonProduction(name) => name,
        }
    }
}

impl Default for DeploymentMode {
    fn default() -> Self {
        Self::NonProduction("development".to_string())
    }
}

impl From<String> for DeploymentMode {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Spawn one external process per request.
    #[default]
    Process,
    /// Answer in-process with the built-in ping-pong agent.
    Builtin,
}

impl AgentKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "process" => Some(Self::Process),
            "builtin" => Some(Self::Builtin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub kind: AgentKind,
    pub program: String,
    /// Arguments passed to `program`; `None` runs the bundled bootstrap script.
    pub args: Option<Vec<String>>,
    pub module: String,
    pub class: String,
    pub timeout_secs: u64,
    /// Extra environment variables for the agent process.
    pub env: HashMap<String, String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            kind: AgentKind::Process,
            program: "python3".to_string(),
            args: None,
            module: DEFAULT_AGENT_MODULE.to_string(),
            class: DEFAULT_AGENT_CLASS.to_string(),
            timeout_secs: 30,
            env: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Redb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Redb,
            path: PathBuf::from("pingpong.redb"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub sweep_interval_secs: u64,
    pub sweep_on_startup: bool,
    pub page_size: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60 * 60,
            sweep_on_startup: true,
            page_size: crate::retention::DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: DeploymentMode,
    pub agent: AgentConfig,
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: DeploymentMode::default(),
            agent: AgentConfig::default(),
            storage: StorageConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    agent: AgentConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    retention: RetentionConfig,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    environment: DeploymentMode,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: DeploymentMode::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

impl From<FileConfig> for ServerConfig {
    fn from(file: FileConfig) -> Self {
        Self {
            host: file.server.host,
            port: file.server.port,
            environment: file.server.environment,
            agent: file.agent,
            storage: file.storage,
            retention: file.retention,
        }
    }
}

impl ServerConfig {
    /// Load from the TOML file (if any), then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match load_from_file()? {
            Some(file_config) => Self::from(file_config),
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let parsed: FileConfig = toml::from_str(contents)?;
        Ok(Self::from(parsed))
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(mode) = lookup("ENVIRONMENT") {
            self.environment = DeploymentMode::parse(&mode);
        }
        if let Some(host) = lookup("PINGPONG_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PINGPONG_PORT").and_then(|value| value.parse::<u16>().ok()) {
            self.port = port;
        }
        if let Some(path) = lookup("PINGPONG_DB_PATH") {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(secs) =
            lookup("PINGPONG_AGENT_TIMEOUT_SECS").and_then(|value| value.parse::<u64>().ok())
        {
            self.agent.timeout_secs = secs;
        }
        if let Some(kind) = lookup("PINGPONG_AGENT_KIND").and_then(|value| AgentKind::parse(&value))
        {
            self.agent.kind = kind;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("PINGPONG_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("pingpong.toml").exists() {
        Some("pingpong.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;
    Ok(Some(parsed))
}
