use crate::cli::{Cli, OutputFormat};
use crate::engine::EngineConfig;
use crate::error::{ConfigError, ConfigResult as Result};
use crate::includes::{DEFAULT_EXCLUDE_PATTERNS, ExcludeFilter};
use crate::output::DEFAULT_THRESHOLD;
use crate::pool::DEFAULT_POOL_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Trait for abstracting environment variable access
#[cfg_attr(test, mockall::automock)]
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub engine: EngineSection,
    pub report: ReportSection,
    pub documents: DocumentsSection,
    pub extensions: ExtensionsSection,
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSection {
    /// Number of documents processed concurrently
    pub concurrency: usize,
    /// Per-document timeout in seconds
    pub document_timeout_seconds: Option<u64>,
    /// Overall deadline in seconds
    pub deadline_seconds: Option<u64>,
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportSection {
    /// Issue count up to which CI annotations are emitted inline
    pub threshold: usize,
    pub format: OutputFormat,
    /// Render for a CI log
    pub ci: bool,
    /// Report issues of the entry document too
    pub include_entry_document: bool,
}

/// Document tree configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentsSection {
    pub content_dir: PathBuf,
    /// Entry document, relative to `content_dir`
    pub index_file: String,
    /// Partial/include-only documents (glob syntax)
    pub exclude_patterns: Vec<String>,
}

/// Extension selection; empty means every built-in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ExtensionsSection {
    pub enabled: Vec<String>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_POOL_SIZE,
            document_timeout_seconds: None,
            deadline_seconds: None,
        }
    }
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            format: OutputFormat::Human,
            ci: false,
            include_entry_document: false,
        }
    }
}

impl Default for DocumentsSection {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("."),
            index_file: "index.adoc".to_string(),
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Settings for the validation engine
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            concurrency: self.engine.concurrency,
            document_timeout: self.engine.document_timeout_seconds.map(Duration::from_secs),
            deadline: self.engine.deadline_seconds.map(Duration::from_secs),
            exclude_patterns: self.documents.exclude_patterns.clone(),
        }
    }
}

fn parse_env<T: FromStr>(env: &impl EnvProvider, key: &str) -> Result<Option<T>> {
    match env.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value))),
        None => Ok(None),
    }
}

fn parse_env_bool(env: &impl EnvProvider, key: &str) -> Result<Option<bool>> {
    match env.get(key) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" | "" => Ok(Some(false)),
            _ => Err(ConfigError::Environment(format!(
                "Invalid {} value: {}",
                key, value
            ))),
        },
        None => Ok(None),
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(&SystemEnvProvider, cli).await
    }

    pub async fn load_config_with(env: &impl EnvProvider, cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            if !config_path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: config_path.clone(),
                });
            }
            config = Self::load_from_file(config_path).await?;
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = found_config;
        }

        config = Self::apply_environment_overrides(env, config)?;
        config = Self::merge_with_cli(config, cli);
        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON). Missing keys keep
    /// their defaults.
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "validate-docs.toml",
            "validate-docs.json",
            ".validate-docs.toml",
            ".validate-docs.json",
        ];

        // Check current directory first
        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                tracing::debug!(path = %path.display(), "using configuration file");
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("validate-docs");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    tracing::debug!(path = %path.display(), "using configuration file");
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides from `env`
    pub fn apply_environment_overrides(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(concurrency) = parse_env(env, "VALIDATE_DOCS_CONCURRENCY")? {
            config.engine.concurrency = concurrency;
        }
        if let Some(timeout) = parse_env(env, "VALIDATE_DOCS_TIMEOUT")? {
            config.engine.document_timeout_seconds = Some(timeout);
        }
        if let Some(deadline) = parse_env(env, "VALIDATE_DOCS_DEADLINE")? {
            config.engine.deadline_seconds = Some(deadline);
        }

        if let Some(threshold) = parse_env(env, "VALIDATE_DOCS_THRESHOLD")? {
            config.report.threshold = threshold;
        }
        if let Some(format) = env.get("VALIDATE_DOCS_FORMAT") {
            config.report.format = format.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid VALIDATE_DOCS_FORMAT value: {}", format))
            })?;
        }

        // GitHub Actions always sets GITHUB_ACTIONS=true
        if env.get("GITHUB_ACTIONS").as_deref() == Some("true") {
            config.report.ci = true;
        }
        if let Some(ci) = parse_env_bool(env, "VALIDATE_DOCS_CI")? {
            config.report.ci = ci;
        }

        if let Some(content_dir) = env.get("VALIDATE_DOCS_CONTENT_DIR") {
            config.documents.content_dir = PathBuf::from(content_dir);
        }
        if let Some(index) = env.get("VALIDATE_DOCS_INDEX") {
            config.documents.index_file = index;
        }

        if let Some(extensions) = env.get("VALIDATE_DOCS_EXTENSIONS") {
            config.extensions.enabled = extensions
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(concurrency) = cli.concurrency {
            config.engine.concurrency = concurrency;
        }
        if let Some(timeout) = cli.timeout {
            config.engine.document_timeout_seconds = Some(timeout);
        }
        if let Some(deadline) = cli.deadline {
            config.engine.deadline_seconds = Some(deadline);
        }

        if let Some(threshold) = cli.threshold {
            config.report.threshold = threshold;
        }
        if let Some(format) = cli.format {
            config.report.format = format;
        }
        config.report.ci |= cli.ci;
        config.report.include_entry_document |= cli.include_entry_document;

        if let Some(content_dir) = &cli.content_dir {
            config.documents.content_dir = content_dir.clone();
        }
        if let Some(index) = &cli.index {
            config.documents.index_file = index.clone();
        }
        if !cli.exclude_patterns.is_empty() {
            config.documents.exclude_patterns = cli.exclude_patterns.clone();
        }

        if !cli.extensions.is_empty() {
            config.extensions.enabled = cli.extensions.clone();
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        // Concurrency, timeout and deadline share the engine's checks
        config.engine_config().validate()?;
        ExcludeFilter::new(&config.documents.exclude_patterns)?;

        if config.report.threshold == 0 {
            return Err(ConfigError::Validation(
                "Threshold must be greater than 0".to_string(),
            ));
        }

        if config.documents.index_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Index file must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
