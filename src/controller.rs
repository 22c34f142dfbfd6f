//! Run orchestration: discover item folders, diff against the ledger, dispatch.

use crate::client::SplitClient;
use crate::config::Config;
use crate::dispatcher::BatchDispatcher;
use crate::error::{Error, Result};
use crate::ledger::ProgressLedger;
use crate::processor::ItemProcessor;
use crate::types::{Item, RunOutcome, RunState};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives one run over the configured input directory
pub struct RunController {
    config: Config,
    client: Arc<dyn SplitClient>,
    ledger: Arc<ProgressLedger>,
    cancel_token: CancellationToken,
    state: Mutex<RunState>,
}

impl RunController {
    /// Create a controller for `config`; `client` talks to the splitting service
    pub fn new(config: Config, client: Arc<dyn SplitClient>) -> Self {
        let ledger = Arc::new(ProgressLedger::open(config.ledger_path()));
        Self {
            config,
            client,
            ledger,
            cancel_token: CancellationToken::new(),
            state: Mutex::new(RunState::Init),
        }
    }

    /// Stop dispatching new chunks once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: RunState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!(from = ?*state, to = ?next, "run state change");
        *state = next;
    }

    /// The ledger this run records into
    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// Every immediate subdirectory of the input path, sorted by identifier.
    ///
    /// Folders whose name is not valid UTF-8 or cannot be written to the ledger
    /// (contains a comma or a line break) are skipped with a warning.
    pub async fn discover_items(&self) -> Result<Vec<Item>> {
        let mut entries = tokio::fs::read_dir(&self.config.input_path).await?;
        let mut items = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = ?raw, "skipping folder with non UTF-8 name");
                    continue;
                }
            };
            if name.contains([',', '\n', '\r']) {
                warn!(%name, "skipping folder whose name cannot be recorded in the ledger");
                continue;
            }

            items.push(Item::new(name, entry.path()));
        }

        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    /// Discovered items that have no ledger entry yet
    pub async fn pending_items(&self) -> Result<Vec<Item>> {
        let discovered = self.discover_items().await?;
        let processed = self.ledger.read_processed().await?;
        let total = discovered.len();

        let pending: Vec<Item> = discovered
            .into_iter()
            .filter(|item| !processed.contains(&item.id))
            .collect();

        info!(
            discovered = total,
            already_processed = total - pending.len(),
            pending = pending.len(),
            "computed pending items"
        );
        Ok(pending)
    }

    /// Run discovery and dispatch to completion or abort.
    ///
    /// A systemic abort is a normal outcome, not an error; errors are reserved for
    /// failures to read the input directory or the ledger.
    pub async fn run(&self) -> Result<RunOutcome> {
        let input = &self.config.input_path;
        match tokio::fs::metadata(input).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(Error::config(
                    "input_path",
                    format!("{} is not a directory", input.display()),
                ));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = ?input, "input path does not exist");
                return Ok(RunOutcome::InputMissing);
            }
            Err(e) => return Err(e.into()),
        }

        info!(path = ?input, ledger = ?self.ledger.path(), "starting run");

        self.set_state(RunState::Discovering);
        let pending = self.pending_items().await?;

        self.set_state(RunState::Dispatching);
        let processor = Arc::new(ItemProcessor::new(
            Arc::clone(&self.client),
            self.config.service.clone(),
        ));
        let dispatcher = BatchDispatcher::new(
            processor,
            Arc::clone(&self.ledger),
            self.config.dispatch.clone(),
        )
        .with_cancellation(self.cancel_token.clone());

        let report = dispatcher.run_all(&pending).await;

        if report.aborted {
            error!(
                chunks_dispatched = report.chunks_dispatched,
                chunks_total = report.chunks_total,
                "ending because of server error"
            );
            self.set_state(RunState::Aborted);
            return Ok(RunOutcome::Aborted(report));
        }

        info!(
            recorded = report.recorded,
            worker_failures = report.worker_failures,
            cancelled = report.cancelled,
            "run finished"
        );
        self.set_state(RunState::Completed);
        Ok(RunOutcome::Completed(report))
    }
}
