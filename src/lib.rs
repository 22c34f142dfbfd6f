//! # figsplit-batch
//!
//! Resumable batch client for the FigSplit compound-figure splitting service.
//!
//! An input directory holds one subdirectory per item (typically one article), each
//! containing figure images. A run uploads every image of every item that is not yet
//! recorded in the progress ledger, unpacks the returned panels next to the image and
//! appends one ledger line per finished item. Items are dispatched in fixed-size chunks
//! through a bounded worker pool; a server-side failure stops the run after the chunk it
//! occurred in, and the next run picks up whatever is still pending.
//!
//! ## Quick Start
//!
//! ```no_run
//! use figsplit_batch::{Config, HttpSplitClient, RunController};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::new("/data/articles");
//!     config.dispatch.worker_count = 4;
//!     config.validate()?;
//!
//!     let client = HttpSplitClient::new(&config.service)?;
//!     let outcome = RunController::new(config, Arc::new(client)).run().await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Splitting service client
pub mod client;
/// Configuration types
pub mod config;
/// Run orchestration
pub mod controller;
/// Chunked parallel dispatch
pub mod dispatcher;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Progress ledger
pub mod ledger;
/// Diagnostic log setup
pub mod logging;
/// Per-item processing
pub mod processor;
/// Stopping a run on SIGINT / SIGTERM
pub mod shutdown;
/// Core types
pub mod types;

// unwrap/expect are acceptable in test helpers for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use client::{HttpSplitClient, SplitClient};
pub use config::{Config, DispatchConfig, ServiceConfig};
pub use controller::RunController;
pub use dispatcher::BatchDispatcher;
pub use error::{Error, ExtractionError, Result, SplitError};
pub use ledger::{LedgerEntry, ProgressLedger};
pub use logging::init_file_logging;
pub use processor::ItemProcessor;
pub use shutdown::cancel_on_signal;
pub use types::{DispatchReport, Item, ItemId, ItemOutcome, RunOutcome, RunState};
