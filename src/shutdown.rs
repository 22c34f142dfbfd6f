//! Operator interrupts.
//!
//! An interrupt never kills workers: it cancels the run token, the dispatcher lets the
//! chunk in flight finish and then stops.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Cancel `token` when SIGINT (Ctrl+C) or, on Unix, SIGTERM arrives
pub fn cancel_on_signal(token: CancellationToken) -> JoinHandle<()> {
    cancel_when(token, termination_requested())
}

/// Cancel `token` once `trigger` completes, unless it was cancelled first
pub fn cancel_when<F>(token: CancellationToken, trigger: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = trigger => {
                warn!("interrupt received, stopping after the current chunk");
                token.cancel();
            }
        }
    })
}

/// Resolves on the first termination request; never resolves when no handler can be
/// installed, so a broken signal setup cannot stop a run by itself
async fn termination_requested() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("SIGTERM"),
                    result = tokio::signal::ctrl_c() => interrupted(result).await,
                }
                return;
            }
            Err(e) => warn!(error = %e, "no SIGTERM handler, only Ctrl+C stops the run"),
        }
    }

    interrupted(tokio::signal::ctrl_c().await).await;
}

async fn interrupted(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("SIGINT"),
        Err(e) => {
            error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn trigger_cancels_token() {
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = cancel_when(token.clone(), async move {
            rx.await.ok();
        });
        assert!(!token.is_cancelled());

        tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn pending_trigger_leaves_token_alone() {
        let token = CancellationToken::new();
        let handle = cancel_when(token.clone(), std::future::pending());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!token.is_cancelled());

        // Cancelling from elsewhere releases the watcher task
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
