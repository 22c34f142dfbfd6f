//! Per-item processing: split every matching image of one item folder.

use crate::client::SplitClient;
use crate::config::ServiceConfig;
use crate::error::{Error, Result, SplitError};
use crate::extraction::{ZipExtractor, archive_path_for, split_output_dirs};
use crate::types::{Item, ItemOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Splits the images of one item folder through a [`SplitClient`].
///
/// Holds no per-item state, so one instance can be shared by all workers as long as
/// they work on disjoint folders.
pub struct ItemProcessor {
    client: Arc<dyn SplitClient>,
    service: ServiceConfig,
}

impl ItemProcessor {
    /// Create a processor using `service` for the extension allow-list
    pub fn new(client: Arc<dyn SplitClient>, service: ServiceConfig) -> Self {
        Self { client, service }
    }

    /// Regular files directly inside `dir` whose extension is allowed, in name order
    pub async fn list_images(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut images = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if self.service.matches_extension(&path) {
                images.push(path);
            }
        }

        images.sort();
        Ok(images)
    }

    /// Split every matching image of `item`.
    ///
    /// Per-image errors are logged and reflected in the counts, and a non-200 upload
    /// answer sets `systemic_error` without stopping the remaining images.
    ///
    /// # Errors
    /// Returns [`Error::ItemUnreadable`] if the folder cannot be listed; no image was
    /// attempted and the item must not be recorded
    pub async fn process(&self, item: &Item) -> Result<ItemOutcome> {
        let images = self.list_images(&item.path).await.map_err(|e| {
            error!(
                item = %item.id,
                path = ?item.path,
                error = %e,
                "failed to list item folder"
            );
            Error::ItemUnreadable {
                path: item.path.clone(),
                source: e,
            }
        })?;

        let mut outcome = ItemOutcome {
            id: item.id.clone(),
            found: images.len(),
            attempted: 0,
            succeeded: 0,
            systemic_error: false,
        };

        debug!(item = %item.id, found = outcome.found, "processing item");

        let output_dirs = split_output_dirs(&item.path, &images);
        for (image, output_dir) in images.iter().zip(&output_dirs) {
            outcome.attempted += 1;
            match self.split_image(&item.path, image, output_dir).await {
                Ok(panels) => {
                    outcome.succeeded += 1;
                    debug!(item = %item.id, ?image, panels, "image split");
                }
                Err(e) if e.is_systemic() => {
                    error!(item = %item.id, ?image, error = %e, "splitting service failure");
                    outcome.systemic_error = true;
                }
                Err(e) => {
                    warn!(item = %item.id, ?image, error = %e, "image failed, continuing");
                }
            }
        }

        info!(
            item = %item.id,
            found = outcome.found,
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            systemic_error = outcome.systemic_error,
            "item processed"
        );
        Ok(outcome)
    }

    /// Upload, download and unpack one image; returns the number of extracted files
    async fn split_image(
        &self,
        item_dir: &Path,
        image: &Path,
        output_dir: &Path,
    ) -> std::result::Result<usize, SplitError> {
        let link = self.client.upload(image).await?;

        let archive = archive_path_for(item_dir, image);
        self.client.download(&link, &archive).await?;

        let panels = ZipExtractor::unpack_and_remove(&archive, output_dir).await?;
        Ok(panels.len())
    }
}
