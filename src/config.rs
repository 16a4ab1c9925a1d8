//! Configuration management for the traffic sign service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment variable overrides, e.g. `SIGNSERVE__SERVER__PORT=9000`
const ENV_PREFIX: &str = "SIGNSERVE";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Classifier model configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX model artifact
    pub path: PathBuf,
    /// Number of intra-op threads for ONNX Runtime
    pub intra_threads: usize,
    /// Input height to use when the model declares a dynamic height
    pub input_height: Option<usize>,
    /// Input width to use when the model declares a dynamic width
    pub input_width: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("traffic_sign_model.onnx"),
            intra_threads: 1,
            input_height: None,
            input_width: None,
        }
    }
}

/// Cross-origin access configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Front-end origins allowed to call the API
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, if present
    pub fn load() -> Result<Self> {
        Self::build(File::with_name(DEFAULT_CONFIG_PATH).required(false))
    }

    /// Load configuration from a specific path, which must exist
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(File::from(path.as_ref()).required(true))
    }

    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self> {
        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
