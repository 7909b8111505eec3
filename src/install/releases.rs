//! GitHub release index for vyper binaries

use std::str::FromStr;

#[cfg(test)]
use mockall::automock;

use pep508_rs::pep440_rs::Version;
use serde::Deserialize;
use tracing::warn;

use crate::config::platform_asset_id;
use crate::error::InstallError;

/// Default base URL for the GitHub API.
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Release listing endpoint for the vyper repository.
const RELEASES_PATH: &str = "/repos/vyperlang/vyper/releases?per_page=100";

#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    name: String,
    browser_download_url: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    assets: Vec<ReleaseAsset>,
}

/// Remote source of installable vyper versions.
///
/// The resolution core only consumes the version list this produces; fetch
/// policy (auth, rate limits) lives entirely here.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseIndex: Send + Sync {
    /// All versions with a binary published for this platform, newest first.
    async fn installable_versions(&self) -> Result<Vec<Version>, InstallError>;

    /// Downloads the binary for `version`.
    async fn download_binary(&self, version: &Version) -> Result<Vec<u8>, InstallError>;
}

/// [`ReleaseIndex`] backed by the vyperlang/vyper GitHub releases.
pub struct GithubReleases {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GithubReleases {
    /// Creates a client against a custom base URL, reading `GITHUB_TOKEN`
    /// from the environment for authenticated requests.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("vvm")
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
            token: std::env::var("GITHUB_TOKEN").ok(),
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, InstallError> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        Ok(request.send().await?)
    }

    async fn releases(&self) -> Result<Vec<Release>, InstallError> {
        let url = format!("{}{}", self.base_url, RELEASES_PATH);
        let response = self.get(&url).await?;
        let status = response.status();

        if status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            return Err(InstallError::RateLimited);
        }

        if !status.is_success() {
            warn!("GitHub API returned status {} for {}", status, url);
            return Err(InstallError::InvalidResponse(format!(
                "status {status} when listing vyper releases"
            )));
        }

        response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub releases response: {}", e);
            InstallError::InvalidResponse(e.to_string())
        })
    }
}

impl Default for GithubReleases {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl ReleaseIndex for GithubReleases {
    async fn installable_versions(&self) -> Result<Vec<Version>, InstallError> {
        let platform = platform_asset_id()?;
        let mut versions = Vec::new();

        for release in self.releases().await? {
            let Ok(version) = Version::from_str(&release.tag_name) else {
                warn!("Skipping release with unversioned tag `{}`", release.tag_name);
                continue;
            };
            if release.assets.iter().any(|a| a.name.contains(platform)) {
                versions.push(version);
            }
        }

        versions.sort_by(|a, b| b.cmp(a));
        Ok(versions)
    }

    async fn download_binary(&self, version: &Version) -> Result<Vec<u8>, InstallError> {
        let platform = platform_asset_id()?;

        let releases = self.releases().await?;
        let release = releases
            .iter()
            .find(|r| Version::from_str(&r.tag_name).is_ok_and(|v| v == *version))
            .ok_or_else(|| InstallError::NoBinaryAsset {
                version: version.clone(),
                platform,
            })?;
        let asset = release
            .assets
            .iter()
            .find(|a| a.name.contains(platform))
            .ok_or_else(|| InstallError::NoBinaryAsset {
                version: version.clone(),
                platform,
            })?;

        let response = self.get(&asset.browser_download_url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::DownloadFailed {
                url: asset.browser_download_url.clone(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
