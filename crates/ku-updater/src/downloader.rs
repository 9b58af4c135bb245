// SPDX-License-Identifier: MIT

//! Streaming installer downloader
//!
//! Redirects are followed by hand so the hop count can be bounded and
//! relative `Location` headers resolved against the previous URL. Data is
//! streamed into `<destination>.part` and only renamed onto the destination
//! once complete, so a failed download never leaves a truncated installer
//! behind.

use crate::error::{Result, UpdateError};
use crate::release_checker::USER_AGENT;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::Sender;

pub const MAX_REDIRECTS: usize = 5;
pub const CONNECT_TIMEOUT_SECS: u64 = 30;
/// Longest silence tolerated between two reads; slow but steady transfers never time out
pub const IDLE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
}

impl DownloadProgress {
    pub fn percent(&self) -> Option<u8> {
        self.total_bytes.map(|total| {
            if total == 0 {
                100
            } else {
                let percent = (self.downloaded_bytes.saturating_mul(100)) / total;
                u8::try_from(percent.min(100)).unwrap_or(100)
            }
        })
    }
}

pub type DownloadProgressSender = Sender<DownloadProgress>;

/// Book-keeping for one in-flight download
#[derive(Debug, Clone)]
pub struct DownloadState {
    pub url: String,
    pub destination: PathBuf,
    pub bytes_received: u64,
    /// From Content-Length, `0` when the server did not send one
    pub total_bytes: u64,
    pub redirect_count: usize,
}

impl DownloadState {
    fn new(url: &str, destination: &Path) -> Self {
        Self {
            url: url.to_owned(),
            destination: destination.to_path_buf(),
            bytes_received: 0,
            total_bytes: 0,
            redirect_count: 0,
        }
    }

    fn progress(&self) -> DownloadProgress {
        DownloadProgress {
            downloaded_bytes: self.bytes_received,
            total_bytes: (self.total_bytes > 0).then_some(self.total_bytes),
        }
    }
}

/// `installer.exe` -> `installer.exe.part`
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    max_redirects: usize,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        Self::with_idle_timeout(Some(Duration::from_secs(IDLE_TIMEOUT_SECS)))
    }

    /// `idle` bounds each read, not the whole transfer
    pub fn with_idle_timeout(idle: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS));
        if let Some(idle) = idle {
            builder = builder.read_timeout(idle);
        }
        let client = builder
            .build()
            .map_err(|e| UpdateError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_redirects: MAX_REDIRECTS,
        })
    }

    /// Download `url` into `destination`, replacing any previous file there
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        progress_tx: Option<DownloadProgressSender>,
    ) -> Result<DownloadState> {
        let mut state = DownloadState::new(url, destination);
        let mut current =
            Url::parse(url).map_err(|e| UpdateError::Network(format!("Invalid URL {url}: {e}")))?;

        let mut response = loop {
            tracing::debug!(url = %current, hop = state.redirect_count, "Requesting installer");
            let response = self
                .client
                .get(current.clone())
                .header(ACCEPT, "application/octet-stream")
                .send()
                .await
                .map_err(|e| UpdateError::Network(format!("Request failed: {e}")))?;

            let status = response.status();
            if is_redirect(status) {
                if state.redirect_count >= self.max_redirects {
                    return Err(UpdateError::TooManyRedirects {
                        max: self.max_redirects,
                    });
                }
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(UpdateError::MissingRedirectLocation)?;
                current = current.join(location).map_err(|e| {
                    UpdateError::Network(format!("Invalid redirect location {location}: {e}"))
                })?;
                state.redirect_count += 1;
                continue;
            }

            if status.as_u16() >= 400 {
                return Err(UpdateError::DownloadHttp {
                    status: status.as_u16(),
                });
            }

            break response;
        };

        state.total_bytes = response.content_length().unwrap_or(0);
        state.url = current.to_string();

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part = partial_path(destination);
        let mut file = File::create(&part).await?;
        emit_progress(progress_tx.as_ref(), &state).await;

        let streamed = async {
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| UpdateError::Stream(e.to_string()))?
            {
                file.write_all(&chunk).await?;
                state.bytes_received = state.bytes_received.saturating_add(chunk.len() as u64);
                emit_progress(progress_tx.as_ref(), &state).await;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok::<(), UpdateError>(())
        }
        .await;

        drop(file);

        if let Err(e) = streamed {
            tracing::warn!(error = %e, path = %part.display(), "Download interrupted, removing partial file");
            let _ = tokio::fs::remove_file(&part).await;
            return Err(match e {
                UpdateError::Io(io) => UpdateError::Stream(io.to_string()),
                other => other,
            });
        }

        if let Err(e) = tokio::fs::rename(&part, destination).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e.into());
        }

        tracing::info!(
            path = %destination.display(),
            bytes = state.bytes_received,
            redirects = state.redirect_count,
            "Download complete"
        );
        Ok(state)
    }
}

async fn emit_progress(progress_tx: Option<&DownloadProgressSender>, state: &DownloadState) {
    let progress = state.progress();
    match progress.percent() {
        Some(percent) => tracing::trace!(percent, "Download progress"),
        None => tracing::trace!(kb = state.bytes_received / 1024, "Download progress"),
    }
    if let Some(progress_tx) = progress_tx {
        let _ = progress_tx.send(progress).await;
    }
}
