// SPDX-License-Identifier: MIT

//! GitHub API release checking module

use crate::error::{Result, UpdateError};
use crate::version::version_from_tag;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const USER_AGENT: &str = concat!("ku-launcher-updater/", env!("CARGO_PKG_VERSION"));

/// A downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Original filename, matched case-insensitively
    pub name: String,
    pub download_url: String,
}

impl Asset {
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
        }
    }
}

/// Latest published release, as read from the feed
#[derive(Debug, Clone)]
pub struct ReleaseInfo {
    /// Tag as published (e.g., "v2.3.0")
    pub tag: String,
    /// Tag without its prefix
    pub version: String,
    pub release_notes: String,
    /// Human-facing release page, used for browser fallbacks
    pub download_page_url: String,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Deserialize, Serialize)]
struct GithubRelease {
    #[serde(default)]
    tag_name: Option<serde_json::Value>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize, Serialize)]
struct GithubAsset {
    #[serde(default)]
    name: String,
    #[serde(default)]
    browser_download_url: String,
}

/// Reads the latest release of one repository
#[derive(Debug, Clone)]
pub struct ReleaseFetcher {
    client: Client,
    owner: String,
    repo: String,
    api_base_url: String,
}

impl ReleaseFetcher {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| UpdateError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
            api_base_url: DEFAULT_API_BASE.to_owned(),
        })
    }

    /// Point the fetcher at another API host (used by tests)
    pub fn with_api_base(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base_url.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }

    /// Public release page, the fallback when the feed has no `html_url`
    pub fn release_page_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/releases/latest",
            self.owner, self.repo
        )
    }

    pub async fn fetch_latest(&self) -> Result<ReleaseInfo> {
        let url = self.latest_release_url();
        tracing::debug!(%url, "Fetching latest release");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .send()
            .await
            .map_err(|e| UpdateError::Network(format!("Request failed: {e}")))?;

        if let Some(remaining) = response.headers().get("x-ratelimit-remaining")
            && let Ok(remaining_str) = remaining.to_str()
            && let Ok(remaining_int) = remaining_str.parse::<u32>()
            && remaining_int < 10
        {
            tracing::warn!("GitHub rate limit low: {remaining_int} remaining");
        }

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %body, "Release feed returned an error");
            return Err(UpdateError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpdateError::Network(format!("Failed to read response: {e}")))?;

        self.parse_release(&body)
    }

    fn parse_release(&self, body: &str) -> Result<ReleaseInfo> {
        let release: GithubRelease =
            serde_json::from_str(body).map_err(|e| UpdateError::Parse(e.to_string()))?;

        let tag = match release.tag_name {
            Some(serde_json::Value::String(tag)) if !tag.trim().is_empty() => tag,
            _ => return Err(UpdateError::MissingTag),
        };

        let assets = release
            .assets
            .into_iter()
            .filter(|a| !a.name.is_empty())
            .map(|a| Asset::new(a.name, a.browser_download_url))
            .collect::<Vec<_>>();

        tracing::info!(
            %tag,
            assets = %assets.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", "),
            "Latest release fetched"
        );

        Ok(ReleaseInfo {
            version: version_from_tag(&tag).to_owned(),
            tag,
            release_notes: release.body.unwrap_or_default(),
            download_page_url: release
                .html_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| self.release_page_url()),
            assets,
        })
    }
}
