//! Unified configuration for productviz.
//!
//! Settings are read from `.productviz/productviz.toml` and layered
//! file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [history]
//! max_size = 50
//! max_payload_bytes = 0
//!
//! [progress]
//! tick_interval_ms = 200
//! success_settle_ms = 800
//! error_settle_ms = 0
//!
//! [generator]
//! model = "gemini-2.5-flash-image"
//! endpoint = "https://generativelanguage.googleapis.com"
//! api_key_env = "GEMINI_API_KEY"
//! timeout_secs = 120
//!
//! [source]
//! max_source_bytes = 5242880
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::init::{CONFIG_FILE, DATABASE_FILE, get_viz_dir};

/// Environment variable overriding `[history] max_size`.
pub const ENV_MAX_HISTORY: &str = "PRODUCTVIZ_MAX_HISTORY";
/// Environment variable overriding `[generator] model`.
pub const ENV_MODEL: &str = "PRODUCTVIZ_MODEL";

/// History size and storage capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySection {
    /// Maximum number of artifacts kept in the history
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Cumulative payload cap for the store in bytes (0 = unlimited)
    #[serde(default)]
    pub max_payload_bytes: u64,
}

fn default_max_size() -> usize {
    50
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            max_payload_bytes: 0,
        }
    }
}

/// Progress estimator and status settle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSection {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Delay before a successful run returns to idle
    #[serde(default = "default_success_settle_ms")]
    pub success_settle_ms: u64,
    /// Delay before a failed run returns to idle (0 = immediately)
    #[serde(default)]
    pub error_settle_ms: u64,
}

fn default_tick_interval_ms() -> u64 {
    200
}

fn default_success_settle_ms() -> u64 {
    800
}

impl Default for ProgressSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            success_settle_ms: default_success_settle_ms(),
            error_settle_ms: 0,
        }
    }
}

/// Remote image generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSection {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Source image upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: u64,
}

fn default_max_source_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            max_source_bytes: default_max_source_bytes(),
        }
    }
}

/// The complete productviz.toml configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VizToml {
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub progress: ProgressSection,
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub source: SourceSection,
}

impl VizToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse productviz.toml")
    }

    /// Load from `<viz_dir>/productviz.toml`, or defaults if the file is missing.
    pub fn load_or_default(viz_dir: &Path) -> Result<Self> {
        let config_path = viz_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize productviz.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.history.max_size == 0 {
            warnings.push("history.max_size must be at least 1".to_string());
        }
        if self.progress.tick_interval_ms == 0 {
            warnings.push("progress.tick_interval_ms must be greater than 0".to_string());
        }
        if self.generator.model.trim().is_empty() {
            warnings.push("generator.model cannot be empty".to_string());
        }
        if !self.generator.endpoint.starts_with("http://")
            && !self.generator.endpoint.starts_with("https://")
        {
            warnings.push(format!(
                "generator.endpoint '{}' should start with http:// or https://",
                self.generator.endpoint
            ));
        }
        if self.source.max_source_bytes == 0 {
            warnings.push("source.max_source_bytes must be greater than 0".to_string());
        }

        warnings
    }
}

/// Orchestrator timing and sizing, resolved from [`VizConfig`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_history: usize,
    pub tick_interval: Duration,
    pub success_settle: Duration,
    pub error_settle: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        let toml = VizToml::default();
        Self {
            max_history: toml.history.max_size,
            tick_interval: Duration::from_millis(toml.progress.tick_interval_ms),
            success_settle: Duration::from_millis(toml.progress.success_settle_ms),
            error_settle: Duration::from_millis(toml.progress.error_settle_ms),
        }
    }
}

/// Configuration combining `VizToml` with environment and CLI overrides.
#[derive(Debug, Clone)]
pub struct VizConfig {
    pub project_dir: PathBuf,
    pub viz_dir: PathBuf,
    pub toml: VizToml,
    pub verbose: bool,
    /// CLI override for history.max_size
    pub cli_max_history: Option<usize>,
}

impl VizConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let viz_dir = get_viz_dir(&project_dir);
        let toml = VizToml::load_or_default(&viz_dir)?;

        Ok(Self {
            project_dir,
            viz_dir,
            toml,
            verbose: false,
            cli_max_history: None,
        })
    }

    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        max_history: Option<usize>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.cli_max_history = max_history;
        Ok(config)
    }

    /// History size (CLI → env → file → default), never below 1.
    pub fn max_history(&self) -> usize {
        self.cli_max_history
            .or_else(|| {
                std::env::var(ENV_MAX_HISTORY)
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(self.toml.history.max_size)
            .max(1)
    }

    /// Generator model (env → file → default).
    pub fn model(&self) -> String {
        std::env::var(ENV_MODEL)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.toml.generator.model.clone())
    }

    /// Read the generator API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.toml.generator.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            max_history: self.max_history(),
            tick_interval: Duration::from_millis(self.toml.progress.tick_interval_ms.max(1)),
            success_settle: Duration::from_millis(self.toml.progress.success_settle_ms),
            error_settle: Duration::from_millis(self.toml.progress.error_settle_ms),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.viz_dir.join(CONFIG_FILE)
    }

    pub fn database_file(&self) -> PathBuf {
        self.viz_dir.join(DATABASE_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.viz_dir.join("logs")
    }

    /// Cumulative payload cap, `None` when unlimited.
    pub fn max_payload_bytes(&self) -> Option<u64> {
        match self.toml.history.max_payload_bytes {
            0 => None,
            n => Some(n),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
