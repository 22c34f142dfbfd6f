//! Core types for figsplit-batch

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stable identifier of an item, derived from its folder name
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of work: a folder of related images
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    /// Identifier (the folder name)
    pub id: ItemId,
    /// Absolute path to the item folder
    pub path: PathBuf,
}

impl Item {
    /// Create a new item
    pub fn new(id: impl Into<ItemId>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// Result of processing one item
///
/// Always satisfies `found >= attempted >= succeeded`.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemOutcome {
    /// The processed item
    pub id: ItemId,
    /// Number of files matching the extension allow-list
    pub found: usize,
    /// Number of files an upload was attempted for
    pub attempted: usize,
    /// Number of files that completed the upload/download/extract cycle
    pub succeeded: usize,
    /// Whether the remote service reported a server-side failure for any file
    pub systemic_error: bool,
}

impl ItemOutcome {
    /// Outcome for an item where nothing could be attempted
    pub fn empty(id: ItemId) -> Self {
        Self {
            id,
            found: 0,
            attempted: 0,
            succeeded: 0,
            systemic_error: false,
        }
    }

    /// Whether every matching file was split successfully
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.found
    }
}

/// Summary of a dispatch over the pending set
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of chunks the pending set was partitioned into
    pub chunks_total: usize,
    /// Number of chunks that were actually dispatched
    pub chunks_dispatched: usize,
    /// Items written to the ledger
    pub recorded: usize,
    /// Items whose outcome carried the systemic-error flag
    pub systemic_failures: usize,
    /// Items whose worker failed without producing a recordable outcome
    pub worker_failures: usize,
    /// A systemic error stopped the dispatch
    pub aborted: bool,
    /// An operator interrupt stopped the dispatch between chunks
    pub cancelled: bool,
}

/// Lifecycle of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Constructed, nothing done yet
    Init,
    /// Listing item folders and reading the ledger
    Discovering,
    /// Dispatching chunks to workers
    Dispatching,
    /// Every chunk was dispatched (or the run was interrupted between chunks)
    Completed,
    /// A systemic error stopped the run
    Aborted,
}

/// How a run ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The input directory does not exist; nothing was touched
    InputMissing,
    /// The run finished without a systemic error
    Completed(DispatchReport),
    /// A systemic error stopped the run; re-run once the service recovers
    Aborted(DispatchReport),
}

impl RunOutcome {
    /// Whether the run stopped because of a systemic error
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted(_))
    }

    /// Dispatch summary, if dispatch happened
    pub fn report(&self) -> Option<&DispatchReport> {
        match self {
            RunOutcome::InputMissing => None,
            RunOutcome::Completed(report) | RunOutcome::Aborted(report) => Some(report),
        }
    }
}
