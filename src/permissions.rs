//! Post-install permission adjustment. Failures here are warnings: an
//! update must never be aborted because chmod was refused.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

#[async_trait]
pub trait PermissionManager: Send + Sync {
    /// Marks the entry point executable.
    async fn set_executable(&self, path: &Path);

    /// Grants broad read/traverse permission over a service directory so
    /// the service account can run what root installed.
    async fn set_directory_permissions(&self, directory: &Path);
}

pub struct FilePermissionManager;

#[async_trait]
impl PermissionManager for FilePermissionManager {
    async fn set_executable(&self, path: &Path) {
        match chmod(&["+x"], path).await {
            Ok(()) => debug!(path = %path.display(), "set executable permissions"),
            Err(err) => warn!(
                path = %path.display(),
                %err,
                "could not set executable permissions; run 'chmod +x' manually"
            ),
        }
    }

    async fn set_directory_permissions(&self, directory: &Path) {
        match chmod(&["-R", "a+rX"], directory).await {
            Ok(()) => debug!(directory = %directory.display(), "set directory permissions"),
            Err(err) => warn!(
                directory = %directory.display(),
                %err,
                "could not set directory permissions; run 'chmod -R a+rX' manually"
            ),
        }
    }
}

async fn chmod(mode_args: &[&str], path: &Path) -> anyhow::Result<()> {
    let output = Command::new("chmod").args(mode_args).arg(path).output().await?;
    if !output.status.success() {
        anyhow::bail!("chmod exited with {}", output.status);
    }
    Ok(())
}
