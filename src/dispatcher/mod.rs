//! Chunked parallel dispatch of pending items.
//!
//! The pending set is cut into consecutive chunks. Each chunk gets a fresh worker
//! pool (a semaphore with `worker_count` permits) and the dispatcher waits for every
//! worker of the chunk before deciding whether to continue. A systemic error anywhere
//! in a chunk stops the dispatch after that chunk drains.

use crate::config::DispatchConfig;
use crate::ledger::ProgressLedger;
use crate::processor::ItemProcessor;
use crate::types::{DispatchReport, Item, ItemId, ItemOutcome};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};


/// What one worker produced
#[derive(Debug)]
pub(crate) enum WorkerResult {
    /// Processed without a systemic error and written to the ledger
    Recorded(ItemOutcome),
    /// The service reported a server-side failure; not recorded
    Systemic(ItemOutcome),
    /// The worker failed (unlistable folder, panic, ledger write) without a recordable
    /// outcome
    Failed {
        /// The item the worker was handling
        id: ItemId,
        /// Description of the failure
        reason: String,
    },
}

/// Split `items` into consecutive chunks of at most `chunk_size` items
pub fn partition(items: &[Item], chunk_size: usize) -> std::slice::Chunks<'_, Item> {
    items.chunks(chunk_size.max(1))
}

/// Runs the pending set chunk by chunk through a bounded worker pool
pub struct BatchDispatcher {
    processor: Arc<ItemProcessor>,
    ledger: Arc<ProgressLedger>,
    config: DispatchConfig,
    cancel_token: CancellationToken,
}

impl BatchDispatcher {
    /// Create a dispatcher; outcomes are recorded in `ledger`
    pub fn new(
        processor: Arc<ItemProcessor>,
        ledger: Arc<ProgressLedger>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            processor,
            ledger,
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Stop dispatching new chunks once `token` is cancelled.
    ///
    /// The chunk in flight when the token fires still runs to completion.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Dispatch every chunk of `pending` in order, stopping after the first chunk that
    /// reports a systemic error
    pub async fn run_all(&self, pending: &[Item]) -> DispatchReport {
        let chunk_size = self.config.chunk_size.max(1);
        let mut report = DispatchReport {
            chunks_total: pending.len().div_ceil(chunk_size),
            ..Default::default()
        };

        info!(
            pending = pending.len(),
            chunks = report.chunks_total,
            chunk_size,
            workers = self.config.worker_count,
            "starting dispatch"
        );

        for (index, chunk) in partition(pending, chunk_size).enumerate() {
            if self.cancel_token.is_cancelled() {
                warn!(
                    dispatched = report.chunks_dispatched,
                    remaining = report.chunks_total - report.chunks_dispatched,
                    "interrupted, not dispatching further chunks"
                );
                report.cancelled = true;
                break;
            }

            debug!(chunk = index + 1, size = chunk.len(), "dispatching chunk");
            let results = self.run_chunk(chunk).await;
            report.chunks_dispatched += 1;

            let mut chunk_systemic = false;
            for result in results {
                match result {
                    WorkerResult::Recorded(outcome) => {
                        if !outcome.is_complete() {
                            debug!(
                                item = %outcome.id,
                                found = outcome.found,
                                succeeded = outcome.succeeded,
                                "item recorded with failed images"
                            );
                        }
                        report.recorded += 1;
                    }
                    WorkerResult::Systemic(outcome) => {
                        warn!(item = %outcome.id, "item left pending after server error");
                        report.systemic_failures += 1;
                        chunk_systemic = true;
                    }
                    WorkerResult::Failed { id, reason } => {
                        warn!(item = %id, %reason, "item left pending after worker failure");
                        report.worker_failures += 1;
                    }
                }
            }

            info!(
                chunk = index + 1,
                of = report.chunks_total,
                recorded = report.recorded,
                "chunk complete"
            );

            if chunk_systemic {
                error!(chunk = index + 1, "server error reported, stopping dispatch");
                report.aborted = true;
                break;
            }
        }

        report
    }

    /// Run one chunk on a fresh pool and wait for all of its workers
    async fn run_chunk(&self, chunk: &[Item]) -> Vec<WorkerResult> {
        let pool = Arc::new(Semaphore::new(self.config.worker_count.max(1)));
        let mut handles = Vec::with_capacity(chunk.len());

        for item in chunk {
            let pool = Arc::clone(&pool);
            let processor = Arc::clone(&self.processor);
            let ledger = Arc::clone(&self.ledger);
            let id = item.id.clone();
            let item = item.clone();

            let handle = tokio::spawn(async move {
                let _permit = match pool.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return WorkerResult::Failed {
                            id: item.id,
                            reason: format!("worker pool closed: {}", e),
                        };
                    }
                };
                run_worker(&processor, &ledger, &item).await
            });
            handles.push((id, handle));
        }

        let joined = join_all(
            handles
                .into_iter()
                .map(|(id, handle)| async move { (id, handle.await) }),
        )
        .await;

        joined
            .into_iter()
            .map(|(id, joined)| match joined {
                Ok(result) => result,
                Err(e) => {
                    error!(item = %id, error = %e, "worker task failed");
                    WorkerResult::Failed {
                        id,
                        reason: e.to_string(),
                    }
                }
            })
            .collect()
    }
}

/// Process one item and record it unless the service failed or the folder could not
/// be listed
pub(crate) async fn run_worker(
    processor: &ItemProcessor,
    ledger: &ProgressLedger,
    item: &Item,
) -> WorkerResult {
    let outcome = match processor.process(item).await {
        Ok(outcome) => outcome,
        Err(e) => {
            return WorkerResult::Failed {
                id: item.id.clone(),
                reason: e.to_string(),
            };
        }
    };
    if outcome.systemic_error {
        return WorkerResult::Systemic(outcome);
    }

    match ledger.append(&outcome).await {
        Ok(()) => WorkerResult::Recorded(outcome),
        Err(e) => {
            error!(item = %outcome.id, error = %e, "failed to record item");
            WorkerResult::Failed {
                id: outcome.id,
                reason: e.to_string(),
            }
        }
    }
}
