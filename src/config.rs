//! Configuration types for figsplit-batch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public FigSplit deployment
pub const DEFAULT_ENDPOINT: &str = "https://www.eecis.udel.edu/~compbio/FigSplit";

/// Remote splitting service settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the splitting service; uploads go to `{endpoint}/modified_uploader`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Timeout for one upload, including reading the result page (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Timeout for one archive download, body included (default: 600 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download_timeout: Duration,

    /// Image extensions to upload, without dots, matched case-insensitively
    /// (default: jpg, jpeg, png, bmp, tif)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout: default_request_timeout(),
            download_timeout: default_download_timeout(),
            extensions: default_extensions(),
        }
    }
}

impl ServiceConfig {
    /// Full upload URL
    pub fn upload_url(&self) -> String {
        format!("{}/modified_uploader", self.endpoint.trim_end_matches('/'))
    }

    /// Whether `path` has one of the configured image extensions
    pub fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let ext = ext.to_string_lossy().to_lowercase();
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').to_lowercase() == ext)
    }
}

/// Chunking and worker pool settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of items dispatched together before a barrier (default: 128)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Maximum number of items processed concurrently inside a chunk (default: 10)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            worker_count: default_worker_count(),
        }
    }
}

/// Main configuration for a batch run
///
/// Sub-config fields are flattened, so the JSON form is a single flat object:
///
/// ```json
/// { "input_path": "/data/run", "chunk_size": 12, "worker_count": 4 }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one subdirectory per item
    #[serde(default)]
    pub input_path: PathBuf,

    /// Base name for the ledger (`processed_<name>.log`) and diagnostic log (`<name>.log`)
    #[serde(default = "default_run_name")]
    pub run_name: String,

    /// Remote service settings
    #[serde(flatten)]
    pub service: ServiceConfig,

    /// Chunking and concurrency settings
    #[serde(flatten)]
    pub dispatch: DispatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(PathBuf::new())
    }
}

impl Config {
    /// Create a configuration for `input_path` with every other setting at its default
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            run_name: default_run_name(),
            service: ServiceConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file {}: {}", path.display(), e),
            key: None,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Ledger of completed items
    pub fn ledger_path(&self) -> PathBuf {
        self.input_path.join(format!("processed_{}.log", self.run_name))
    }

    /// Human-oriented diagnostic log
    pub fn log_path(&self) -> PathBuf {
        self.input_path.join(format!("{}.log", self.run_name))
    }

    /// Check that every setting is usable before any side effect happens
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.chunk_size == 0 {
            return Err(Error::config("chunk_size", "chunk size must be at least 1"));
        }
        if self.dispatch.worker_count == 0 {
            return Err(Error::config(
                "worker_count",
                "worker count must be at least 1",
            ));
        }
        if self.service.request_timeout.is_zero() {
            return Err(Error::config(
                "request_timeout",
                "request timeout must be greater than zero",
            ));
        }
        if self.service.download_timeout.is_zero() {
            return Err(Error::config(
                "download_timeout",
                "download timeout must be greater than zero",
            ));
        }
        if self
            .service
            .extensions
            .iter()
            .all(|e| e.trim_start_matches('.').is_empty())
        {
            return Err(Error::config(
                "extensions",
                "at least one image extension is required",
            ));
        }
        if self.run_name.is_empty() || self.run_name.contains(['/', '\\']) {
            return Err(Error::config(
                "run_name",
                format!("invalid run name {:?}", self.run_name),
            ));
        }

        let endpoint = url::Url::parse(&self.service.endpoint).map_err(|e| {
            Error::config(
                "endpoint",
                format!("invalid endpoint {:?}: {}", self.service.endpoint, e),
            )
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::config(
                "endpoint",
                format!("unsupported endpoint scheme {:?}", endpoint.scheme()),
            ));
        }

        Ok(())
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_extensions() -> Vec<String> {
    vec![
        "jpg".into(),
        "jpeg".into(),
        "png".into(),
        "bmp".into(),
        "tif".into(),
    ]
}

fn default_chunk_size() -> usize {
    128
}

fn default_worker_count() -> usize {
    10
}

fn default_run_name() -> String {
    "figsplit".to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
