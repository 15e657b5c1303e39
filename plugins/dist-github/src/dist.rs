//! GitHub-backed distribution: resolves a service's latest version from
//! release tags and downloads the matching asset.
//!
//! The remote name format is `owner/repo` or `owner/repo/pattern` where
//! `pattern` is a case-insensitive glob (`*`, `?`) selecting one asset
//! out of the release. Without a pattern the release must carry exactly
//! one asset.

use std::path::Path;

use anyhow::{anyhow, bail, Context};
use tracing::{info, warn};
use updaemon_common::{Distribution, SecretCollection, Version};

use crate::api::{GithubApi, GithubAsset, GithubRelease};
use crate::extract;

const TOKEN_SECRET: &str = "githubToken";

#[derive(Debug, Clone)]
pub(crate) struct RemoteName {
    pub owner: String,
    pub repo: String,
    pub asset_pattern: Option<String>,
}

impl RemoteName {
    pub(crate) fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut parts = raw.splitn(3, '/');
        let owner = parts.next().unwrap_or_default();
        let repo = parts.next().unwrap_or_default();
        if owner.is_empty() || repo.is_empty() {
            bail!("remote name '{raw}' is not of the form owner/repo[/asset-pattern]");
        }
        let asset_pattern = parts.next().filter(|p| !p.is_empty()).map(str::to_string);
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            asset_pattern,
        })
    }
}

#[derive(Default)]
pub(crate) struct GithubDistribution {
    api: Option<GithubApi>,
}

impl GithubDistribution {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn api(&self) -> anyhow::Result<&GithubApi> {
        self.api
            .as_ref()
            .ok_or_else(|| anyhow!("InitializeAsync was not called"))
    }
}

impl Distribution for GithubDistribution {
    async fn initialize(&mut self, secrets: SecretCollection) -> anyhow::Result<()> {
        let token = secrets.get(TOKEN_SECRET).map(str::to_string);
        if token.is_some() {
            info!("using authenticated GitHub API access");
        }
        self.api = Some(GithubApi::new(token)?);
        Ok(())
    }

    async fn latest_version(&self, service_name: &str) -> anyhow::Result<Option<Version>> {
        let remote = RemoteName::parse(service_name)?;
        let Some(release) = self.api()?.latest_release(&remote.owner, &remote.repo).await? else {
            return Ok(None);
        };

        match Version::parse_loose(&release.tag_name) {
            Some(version) => Ok(Some(version)),
            None => {
                warn!(tag = %release.tag_name, "release tag carries no parseable version");
                Ok(None)
            }
        }
    }

    async fn download_version(
        &self,
        service_name: &str,
        version: &Version,
        target_dir: &Path,
    ) -> anyhow::Result<()> {
        let remote = RemoteName::parse(service_name)?;
        let api = self.api()?;

        let release = api
            .latest_release(&remote.owner, &remote.repo)
            .await?
            .ok_or_else(|| anyhow!("{}/{} has no releases", remote.owner, remote.repo))?;

        let released = Version::parse_loose(&release.tag_name);
        if released.as_ref() != Some(version) {
            bail!(
                "latest release is tagged '{}', not version {version}; it may have moved mid-run",
                release.tag_name
            );
        }

        let asset = select_asset(&release, remote.asset_pattern.as_deref())?;
        let target = target_dir.join(&asset.name);
        info!(asset = %asset.name, target = %target.display(), "downloading release asset");
        api.download_asset(&asset.browser_download_url, &target)
            .await
            .with_context(|| format!("failed to download asset '{}'", asset.name))?;

        extract::post_process(target_dir).await;
        Ok(())
    }
}

fn select_asset<'a>(
    release: &'a GithubRelease,
    pattern: Option<&str>,
) -> anyhow::Result<&'a GithubAsset> {
    let names = || {
        release
            .assets
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    match pattern {
        None => match release.assets.as_slice() {
            [asset] => Ok(asset),
            [] => bail!("release '{}' has no assets", release.tag_name),
            _ => bail!(
                "release '{}' has several assets ({}); add an asset pattern to the remote name",
                release.tag_name,
                names()
            ),
        },
        Some(pattern) => release
            .assets
            .iter()
            .find(|asset| wildcard_match(pattern, &asset.name))
            .ok_or_else(|| {
                anyhow!(
                    "no asset of release '{}' matches '{pattern}' (assets: {})",
                    release.tag_name,
                    names()
                )
            }),
    }
}

/// Case-insensitive glob with `*` (any run) and `?` (one character).
pub(crate) fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let name: Vec<char> = name.to_lowercase().chars().collect();

    // Classic two-pointer matcher with single backtrack point for `*`.
    let (mut p, mut n) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
