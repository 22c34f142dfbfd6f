//! Durable record of completed items
//!
//! One line per item, `identifier,found,attempted,succeeded`, appended as workers
//! finish. The ledger is read once at startup to compute the pending set; an
//! identifier present here is never processed again.

use crate::error::{Error, Result};
use crate::types::{ItemId, ItemOutcome};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One ledger line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Item identifier
    pub id: ItemId,
    /// Matching images found
    pub found: usize,
    /// Images attempted
    pub attempted: usize,
    /// Images split successfully
    pub succeeded: usize,
}

impl LedgerEntry {
    /// Serialize as a newline-terminated ledger line
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{}\n",
            self.id, self.found, self.attempted, self.succeeded
        )
    }

    /// Parse a full ledger line; `None` when the counts are missing or malformed
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.trim_end_matches(['\r', '\n']).split(',');
        let id = fields.next().filter(|id| !id.is_empty())?;
        let found = fields.next()?.trim().parse().ok()?;
        let attempted = fields.next()?.trim().parse().ok()?;
        let succeeded = fields.next()?.trim().parse().ok()?;
        Some(Self {
            id: ItemId::new(id),
            found,
            attempted,
            succeeded,
        })
    }
}

impl From<&ItemOutcome> for LedgerEntry {
    fn from(outcome: &ItemOutcome) -> Self {
        Self {
            id: outcome.id.clone(),
            found: outcome.found,
            attempted: outcome.attempted,
            succeeded: outcome.succeeded,
        }
    }
}

/// Append-only progress ledger backed by a plain text file
///
/// Appends from concurrent workers are serialized through an async mutex so lines
/// never interleave.
pub struct ProgressLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProgressLedger {
    /// Bind a ledger to `path`; the file is created on first append
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_contents(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = ?self.path, "ledger not yet created");
                Ok(None)
            }
            Err(e) => Err(Error::Ledger {
                path: self.path.clone(),
                reason: format!("failed to read ledger: {}", e),
            }),
        }
    }

    /// Identifiers already recorded (first comma-delimited field of every line).
    ///
    /// A missing file yields an empty set.
    pub async fn read_processed(&self) -> Result<HashSet<ItemId>> {
        let Some(content) = self.read_contents().await? else {
            return Ok(HashSet::new());
        };

        let ids: HashSet<ItemId> = content
            .lines()
            .filter_map(|line| line.split(',').next())
            .map(|id| id.trim_end_matches('\r'))
            .filter(|id| !id.is_empty())
            .map(ItemId::new)
            .collect();

        debug!(path = ?self.path, count = ids.len(), "read processed identifiers");
        Ok(ids)
    }

    /// Every well-formed entry, in file order; malformed lines are skipped
    pub async fn read_entries(&self) -> Result<Vec<LedgerEntry>> {
        let Some(content) = self.read_contents().await? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match LedgerEntry::parse_line(line) {
                Some(entry) => entries.push(entry),
                None => warn!(
                    path = ?self.path,
                    line = line_no + 1,
                    "skipping malformed ledger line"
                ),
            }
        }
        Ok(entries)
    }

    /// Record `outcome` as one appended line, synced to disk before returning
    pub async fn append(&self, outcome: &ItemOutcome) -> Result<()> {
        let line = LedgerEntry::from(outcome).to_line();
        let ledger_err = |e: std::io::Error| Error::Ledger {
            path: self.path.clone(),
            reason: format!("failed to append to ledger: {}", e),
        };

        let _guard = self.write_lock.lock().await;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(ledger_err)?;
        file.write_all(line.as_bytes()).await.map_err(ledger_err)?;
        file.flush().await.map_err(ledger_err)?;
        file.sync_data().await.map_err(ledger_err)?;

        debug!(item = %outcome.id, "recorded in ledger");
        Ok(())
    }
}
