//! The contract a distribution backend implements.

use std::path::Path;

use crate::{SecretCollection, Version};

/// A distribution backend knows how to query and fetch builds from one
/// external source. Implementations run inside their own plugin process;
/// errors returned here are converted into structured RPC error responses
/// by the host, never allowed to crash the process.
pub trait Distribution {
    /// Called once per run, before any other operation, with the secret
    /// material the orchestrator holds for this host.
    fn initialize(
        &mut self,
        secrets: SecretCollection,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;

    /// Latest version available for a remote service name, or `None` when
    /// the backend has nothing published under that name.
    fn latest_version(
        &self,
        service_name: &str,
    ) -> impl std::future::Future<Output = anyhow::Result<Option<Version>>> + Send;

    /// Places the build for `version` into `target_dir`. The directory
    /// exists when this is called.
    fn download_version(
        &self,
        service_name: &str,
        version: &Version,
        target_dir: &Path,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
