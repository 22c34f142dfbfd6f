//! Archive extraction for split results
//!
//! The splitting service returns one ZIP per uploaded image. Each archive is unpacked
//! into a folder named after the image and removed afterwards.

use crate::error::ExtractionError;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Archive extractor for ZIP files
pub struct ZipExtractor;

impl ZipExtractor {
    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_zip_entry(
        mut file: zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>, ExtractionError> {
        let entry_failed = |reason: String, entry: &str| ExtractionError::EntryFailed {
            archive: archive_path.to_path_buf(),
            entry: entry.to_string(),
            reason,
        };

        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(entry = file.name(), "skipping entry with unsafe path");
                return Ok(None);
            }
        };
        let entry_name = file.name().to_string();

        if file.is_dir() {
            std::fs::create_dir_all(&file_path).map_err(|e| {
                entry_failed(format!("failed to create directory: {}", e), &entry_name)
            })?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                entry_failed(
                    format!("failed to create parent directories: {}", e),
                    &entry_name,
                )
            })?;
        }

        let mut outfile = std::fs::File::create(&file_path).map_err(|e| {
            entry_failed(format!("failed to create output file: {}", e), &entry_name)
        })?;

        std::io::copy(&mut file, &mut outfile)
            .map_err(|e| entry_failed(format!("failed to write file: {}", e), &entry_name))?;

        Ok(Some(file_path))
    }

    /// Extract every entry of `archive_path` into `dest_path`
    ///
    /// Entries whose names would escape `dest_path` are skipped. Returns the extracted
    /// file paths (directories are created but not listed).
    pub fn extract_to(
        archive_path: &Path,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        debug!(?archive_path, ?dest_path, "attempting ZIP extraction");

        let invalid = |reason: String| ExtractionError::InvalidArchive {
            archive: archive_path.to_path_buf(),
            reason,
        };

        std::fs::create_dir_all(dest_path)
            .map_err(|e| invalid(format!("failed to create destination: {}", e)))?;

        let file = std::fs::File::open(archive_path)
            .map_err(|e| invalid(format!("failed to open ZIP archive: {}", e)))?;

        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| invalid(format!("failed to read ZIP archive: {}", e)))?;

        let mut extracted_files = Vec::new();

        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| invalid(format!("failed to read ZIP entry {}: {}", i, e)))?;

            if let Some(file_path) = Self::extract_zip_entry(file, dest_path, archive_path)? {
                extracted_files.push(file_path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }

    /// Extract on the blocking pool, then delete the archive
    ///
    /// The archive is kept when extraction fails. Files already written by a failed
    /// extraction are left in place. An archive that cannot be deleted fails the call
    /// even though its panels were extracted.
    pub async fn unpack_and_remove(
        archive_path: &Path,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        let archive_owned = archive_path.to_path_buf();
        let dest_owned = dest_path.to_path_buf();

        let files = spawn_blocking(move || Self::extract_to(&archive_owned, &dest_owned))
            .await
            .map_err(|e| ExtractionError::TaskFailed {
                archive: archive_path.to_path_buf(),
                reason: e.to_string(),
            })??;

        Self::remove_archive(archive_path).await?;
        Ok(files)
    }

    async fn remove_archive(archive_path: &Path) -> Result<(), ExtractionError> {
        tokio::fs::remove_file(archive_path).await.map_err(|e| {
            warn!(?archive_path, error = %e, "failed to remove archive after extraction");
            ExtractionError::ArchiveNotRemoved {
                archive: archive_path.to_path_buf(),
                source: e,
            }
        })
    }
}

/// Where the split panels of `image` are extracted: `<item_dir>/<image stem>`
pub fn split_output_dir(item_dir: &Path, image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "split".into());
    item_dir.join(stem)
}

/// Output folders for every image of one item, in the order given.
///
/// Each image gets its stem, except when two images share a stem (`fig.jpg` and
/// `fig.png`): those get the file name with dots replaced (`fig_jpg`, `fig_png`).
pub fn split_output_dirs(item_dir: &Path, images: &[PathBuf]) -> Vec<PathBuf> {
    let mut stem_counts: HashMap<OsString, usize> = HashMap::new();
    for image in images {
        if let Some(stem) = image.file_stem() {
            *stem_counts.entry(stem.to_os_string()).or_default() += 1;
        }
    }

    images
        .iter()
        .map(|image| {
            let shared = image
                .file_stem()
                .and_then(|stem| stem_counts.get(stem))
                .is_some_and(|count| *count > 1);
            match image.file_name() {
                Some(name) if shared => item_dir.join(name.to_string_lossy().replace('.', "_")),
                _ => split_output_dir(item_dir, image),
            }
        })
        .collect()
}

/// Where the archive for `image` is downloaded: `<item_dir>/<image file name>.zip`
pub fn archive_path_for(item_dir: &Path, image: &Path) -> PathBuf {
    let mut name = image
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "split".into());
    name.push(".zip");
    item_dir.join(name)
}
