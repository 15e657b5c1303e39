//! systemd service supervision by shelling out to `systemctl`.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, UpdaemonError};
use crate::paths;

#[async_trait]
pub trait Supervisor: Send + Sync {
    async fn start(&self, unit: &str) -> Result<()>;
    async fn stop(&self, unit: &str) -> Result<()>;
    async fn restart(&self, unit: &str) -> Result<()>;
    async fn enable(&self, unit: &str) -> Result<()>;
    async fn disable(&self, unit: &str) -> Result<()>;
    /// Whether a unit file for this service exists at all.
    async fn exists(&self, unit: &str) -> bool;
    /// Whether the unit is currently active. Errors read as "not running".
    async fn is_running(&self, unit: &str) -> bool;
}

pub struct SystemdManager {
    unit_dir: PathBuf,
}

impl SystemdManager {
    pub fn new() -> Self {
        Self::with_unit_dir(paths::unit_dir())
    }

    pub fn with_unit_dir(unit_dir: PathBuf) -> Self {
        Self { unit_dir }
    }

    async fn systemctl(&self, command: &str, unit: &str) -> Result<()> {
        debug!(command, unit, "systemctl");
        let output = Command::new("systemctl")
            .arg(command)
            .arg(unit)
            .output()
            .await?;
        if !output.status.success() {
            return Err(UpdaemonError::Systemctl {
                command: command.to_string(),
                unit: unit.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SystemdManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Supervisor for SystemdManager {
    async fn start(&self, unit: &str) -> Result<()> {
        self.systemctl("start", unit).await
    }

    async fn stop(&self, unit: &str) -> Result<()> {
        self.systemctl("stop", unit).await
    }

    async fn restart(&self, unit: &str) -> Result<()> {
        self.systemctl("restart", unit).await
    }

    async fn enable(&self, unit: &str) -> Result<()> {
        self.systemctl("enable", unit).await
    }

    async fn disable(&self, unit: &str) -> Result<()> {
        self.systemctl("disable", unit).await
    }

    async fn exists(&self, unit: &str) -> bool {
        self.unit_dir.join(format!("{unit}.service")).exists()
    }

    async fn is_running(&self, unit: &str) -> bool {
        let result = Command::new("systemctl")
            .arg("is-active")
            .arg(unit)
            .output()
            .await;
        match result {
            Ok(output) => String::from_utf8_lossy(&output.stdout).trim() == "active",
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exists_checks_unit_file_presence() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SystemdManager::with_unit_dir(dir.path().to_path_buf());

        assert!(!manager.exists("my-api").await);
        std::fs::write(dir.path().join("my-api.service"), "[Unit]\n").unwrap();
        assert!(manager.exists("my-api").await);
    }
}
