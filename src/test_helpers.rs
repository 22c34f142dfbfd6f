//! Shared test utilities: a scripted [`SplitClient`] and item folder fixtures.

use crate::client::SplitClient;
use crate::error::SplitError;
use crate::types::Item;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What the scripted service does for one image file name
#[derive(Clone, Copy, Debug)]
pub(crate) enum Behavior {
    /// Upload succeeds, download returns a valid archive
    Split,
    /// Upload answers with this status
    ServerError(u16),
    /// Upload times out
    Timeout,
    /// Upload succeeds but the page has no link
    NoLink,
    /// Download returns bytes that are not a ZIP
    BadArchive,
    /// The worker panics inside the upload
    Panic,
}

/// In-memory splitting service keyed by image file name
pub(crate) struct ScriptedClient {
    behaviors: HashMap<String, Behavior>,
    uploads: Mutex<Vec<PathBuf>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            uploads: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with(mut self, file_name: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(file_name.to_string(), behavior);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn uploads(&self) -> Vec<PathBuf> {
        self.uploads.lock().unwrap().clone()
    }

    /// Names of the item folders that saw at least one upload
    pub(crate) fn uploaded_items(&self) -> Vec<String> {
        let mut items: Vec<String> = self
            .uploads()
            .iter()
            .filter_map(|p| p.parent()?.file_name()?.to_str().map(String::from))
            .collect();
        items.sort();
        items.dedup();
        items
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn behavior_for(&self, path: &Path) -> Behavior {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .trim_end_matches(".zip");
        self.behaviors.get(name).copied().unwrap_or(Behavior::Split)
    }
}

#[async_trait]
impl SplitClient for ScriptedClient {
    async fn upload(&self, image: &Path) -> Result<String, SplitError> {
        self.uploads.lock().unwrap().push(image.to_path_buf());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.behavior_for(image) {
            Behavior::ServerError(status) => Err(SplitError::UploadStatus {
                image: image.to_path_buf(),
                status,
            }),
            Behavior::Timeout => Err(SplitError::Timeout {
                image: image.to_path_buf(),
            }),
            Behavior::NoLink => Err(SplitError::MissingDownloadLink {
                image: image.to_path_buf(),
            }),
            Behavior::Panic => panic!("scripted worker panic for {}", image.display()),
            Behavior::Split | Behavior::BadArchive => {
                Ok(format!("http://scripted/out/{}.zip", image.display()))
            }
        }
    }

    async fn download(&self, _url: &str, dest: &Path) -> Result<(), SplitError> {
        let written = match self.behavior_for(dest) {
            Behavior::BadArchive => std::fs::write(dest, b"<html>expired</html>"),
            _ => write_zip(dest, &[("panel_1.jpg", b"panel")]),
        };
        written.map_err(|e| SplitError::Io {
            path: dest.to_path_buf(),
            source: e,
        })
    }
}

/// Write a stored (uncompressed) ZIP archive
pub(crate) fn write_zip(path: &Path, files: &[(&str, &[u8])]) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options)?;
        writer.write_all(content)?;
    }
    writer.finish()?;
    Ok(())
}

/// Create `<root>/<id>/` holding one small file per name
pub(crate) fn make_item(root: &Path, id: &str, files: &[&str]) -> Item {
    let dir = root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    for name in files {
        std::fs::write(dir.join(name), b"image bytes").unwrap();
    }
    Item::new(id, dir)
}
