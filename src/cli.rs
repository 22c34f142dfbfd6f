use clap::Parser;
use figsplit_batch::{Config, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Command line options; anything not given falls back to `--config`, then to defaults
#[derive(Debug, Parser, Clone)]
#[command(
    name = "figsplit",
    version,
    about = "Split every compound figure under a directory through the FigSplit service"
)]
pub struct Cli {
    /// Directory holding one subdirectory per item
    pub input_path: PathBuf,

    /// Number of concurrent workers per chunk [default: 10]
    #[arg(long = "num_workers", alias = "num-workers")]
    pub num_workers: Option<usize>,

    /// Number of items dispatched together [default: 128]
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Base URL of the splitting service
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds [default: 60]
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Comma-separated image extensions to upload [default: jpg,jpeg,png,bmp,tif]
    #[arg(long, value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// JSON configuration file; command line flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Merge the config file (if any) and flags into a validated configuration
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        config.input_path = self.input_path.clone();
        if let Some(workers) = self.num_workers {
            config.dispatch.worker_count = workers;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.dispatch.chunk_size = chunk_size;
        }
        if let Some(endpoint) = &self.endpoint {
            config.service.endpoint = endpoint.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.service.request_timeout = Duration::from_secs(secs);
        }
        if let Some(extensions) = &self.extensions {
            config.service.extensions = extensions
                .iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
        }

        config.validate()?;
        Ok(config)
    }
}
