//! Thin wrapper over the GitHub releases REST API.

use std::path::Path;

use anyhow::Context;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const USER_AGENT: &str = "updaemon-dist-github";

#[derive(Debug, Deserialize)]
pub(crate) struct GithubRelease {
    pub tag_name: String,
    pub assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
}

pub(crate) struct GithubApi {
    client: reqwest::Client,
    token: Option<String>,
}

impl GithubApi {
    pub(crate) fn new(token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self { client, token })
    }

    /// Fetches the latest release, or `None` when the repository has no
    /// releases yet (GitHub answers 404 for that).
    pub(crate) async fn latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> anyhow::Result<Option<GithubRelease>> {
        let url = format!("https://api.github.com/repos/{owner}/{repo}/releases/latest");
        debug!(%url, "fetching latest release");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("failed to reach GitHub")?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .context("GitHub API request failed")?;

        let release = response
            .json()
            .await
            .context("failed to parse release JSON")?;
        Ok(Some(release))
    }

    pub(crate) async fn download_asset(&self, url: &str, target: &Path) -> anyhow::Result<()> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/octet-stream");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("failed to start asset download")?
            .error_for_status()
            .context("asset download failed")?;

        let mut file = File::create(target)
            .await
            .with_context(|| format!("failed to create {}", target.display()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk.context("download stream broke")?)
                .await?;
        }
        file.flush().await?;
        Ok(())
    }
}
