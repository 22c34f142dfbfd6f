//! HTTP client for the remote splitting service
//!
//! [`SplitClient`] is the seam between item processing and the network, so the
//! processor and dispatcher can be driven by an in-memory client in tests.

use crate::config::ServiceConfig;
use crate::error::{Result, SplitError};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[allow(clippy::expect_used)]
static HREF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).expect("href pattern is valid"));

/// Abstraction over the splitting service
#[async_trait]
pub trait SplitClient: Send + Sync {
    /// Upload one image and return the URL of the archive holding its panels.
    ///
    /// A non-200 answer must be reported as [`SplitError::UploadStatus`].
    async fn upload(&self, image: &Path) -> std::result::Result<String, SplitError>;

    /// Download the archive at `url` to `dest`
    async fn download(&self, url: &str, dest: &Path) -> std::result::Result<(), SplitError>;
}

/// Find the archive link in the HTML returned by a successful upload.
///
/// The link sits on the first line that mentions both `download` and the service
/// endpoint; its `href` attribute is the archive URL.
pub fn find_download_link(html: &str, endpoint: &str) -> Option<String> {
    let endpoint = endpoint.trim_end_matches('/');
    html.lines()
        .filter(|line| line.contains("download") && line.contains(endpoint))
        .find_map(|line| {
            HREF_PATTERN
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
}

/// Production [`SplitClient`] backed by reqwest
pub struct HttpSplitClient {
    http_client: reqwest::Client,
    endpoint: String,
    upload_url: String,
    upload_timeout: Duration,
    download_timeout: Duration,
}

impl HttpSplitClient {
    /// Create a client.
    ///
    /// Uploads are bounded by `request_timeout`, archive downloads by the longer
    /// `download_timeout`; connecting never takes longer than `request_timeout`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            upload_url: config.upload_url(),
            upload_timeout: config.request_timeout,
            download_timeout: config.download_timeout,
        })
    }
}

#[async_trait]
impl SplitClient for HttpSplitClient {
    async fn upload(&self, image: &Path) -> std::result::Result<String, SplitError> {
        let bytes = tokio::fs::read(image).await.map_err(|e| SplitError::Io {
            path: image.to_path_buf(),
            source: e,
        })?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        );

        let response = self
            .http_client
            .post(&self.upload_url)
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SplitError::from_request(image, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SplitError::UploadStatus {
                image: image.to_path_buf(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SplitError::from_request(image, e))?;

        let link = find_download_link(&body, &self.endpoint).ok_or_else(|| {
            SplitError::MissingDownloadLink {
                image: image.to_path_buf(),
            }
        })?;
        debug!(?image, %link, "split archive available");
        Ok(link)
    }

    async fn download(&self, url: &str, dest: &Path) -> std::result::Result<(), SplitError> {
        let mut response = self
            .http_client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| SplitError::from_request(dest, e))?;

        if !response.status().is_success() {
            return Err(SplitError::DownloadStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let io_err = |e: std::io::Error| SplitError::Io {
            path: dest.to_path_buf(),
            source: e,
        };

        let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SplitError::from_request(dest, e))?
        {
            file.write_all(&chunk).await.map_err(io_err)?;
        }
        file.flush().await.map_err(io_err)?;

        Ok(())
    }
}
