// SPDX-License-Identifier: MIT

//! Error types for the updater crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("network error: {0}")]
    Network(String),

    #[error("release feed returned HTTP {status}")]
    Http { status: u16 },

    #[error("failed to parse release feed: {0}")]
    Parse(String),

    #[error("release feed response has no tag_name")]
    MissingTag,

    #[error("too many redirects (more than {max})")]
    TooManyRedirects { max: usize },

    #[error("redirect response without a Location header")]
    MissingRedirectLocation,

    #[error("download failed with HTTP {status}")]
    DownloadHttp { status: u16 },

    #[error("download stream interrupted: {0}")]
    Stream(String),

    #[error("no installer found for {platform}/{arch}")]
    NoMatchingAsset { platform: String, arch: String },

    #[error("could not launch installer: {0}")]
    InstallLaunch(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UpdateError>;
