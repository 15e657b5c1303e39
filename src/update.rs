//! The per-service update state machine.
//!
//! Each run connects to one distribution plugin and walks every target
//! service through: resolve installed version, compare against the
//! remote, download into a fresh version directory, detect the entry
//! point, repoint the `current` symlink, and reconcile the systemd
//! unit. A failure in one service never aborts the run for the rest.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};
use updaemon_common::Version;

use crate::client::DistributionHandle;
use crate::config::RegisteredService;
use crate::detect::ExecFinder;
use crate::error::Result;
use crate::permissions::PermissionManager;
use crate::symlink::SymlinkStore;
use crate::systemd::Supervisor;

pub const CURRENT_LINK: &str = "current";

/// What the supervisor did after a successful cutover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorAction {
    Started,
    Restarted,
    NoUnit,
}

/// Terminal state of one service within a run.
#[derive(Debug)]
pub enum ServiceOutcome {
    UpToDate {
        version: Version,
    },
    Updated {
        from: Option<Version>,
        to: Version,
        action: SupervisorAction,
    },
    NoVersionAvailable,
    NoExecutable {
        dir: PathBuf,
    },
    Failed {
        message: String,
    },
}

impl fmt::Display for ServiceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate { version } => write!(f, "up to date at {version}"),
            Self::Updated { from, to, action } => {
                match from {
                    Some(from) => write!(f, "updated {from} -> {to}")?,
                    None => write!(f, "installed {to}")?,
                }
                match action {
                    SupervisorAction::Started => write!(f, " (service started)"),
                    SupervisorAction::Restarted => write!(f, " (service restarted)"),
                    SupervisorAction::NoUnit => write!(f, " (no systemd unit found)"),
                }
            }
            Self::NoVersionAvailable => write!(f, "no version available from the remote"),
            Self::NoExecutable { dir } => {
                write!(f, "no executable found in {}", dir.display())
            }
            Self::Failed { message } => write!(f, "failed: {message}"),
        }
    }
}

pub struct Updater {
    base_dir: PathBuf,
    supervisor: Box<dyn Supervisor>,
    symlinks: Box<dyn SymlinkStore>,
    detector: Box<dyn ExecFinder>,
    permissions: Box<dyn PermissionManager>,
}

impl Updater {
    pub fn new(
        base_dir: PathBuf,
        supervisor: Box<dyn Supervisor>,
        symlinks: Box<dyn SymlinkStore>,
        detector: Box<dyn ExecFinder>,
        permissions: Box<dyn PermissionManager>,
    ) -> Self {
        Self {
            base_dir,
            supervisor,
            symlinks,
            detector,
            permissions,
        }
    }

    /// Runs the state machine over `services` in order. A failed
    /// `initialize` is run-fatal; everything after that is contained to
    /// the service it happened in.
    pub async fn run(
        &self,
        dist: &mut dyn DistributionHandle,
        services: &[RegisteredService],
        secrets: Option<&str>,
    ) -> Result<Vec<(String, ServiceOutcome)>> {
        dist.initialize(secrets).await?;

        let mut outcomes = Vec::with_capacity(services.len());
        for service in services {
            let outcome = match self.update_service(dist, service).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(service = %service.local_name, %err, "service update failed");
                    ServiceOutcome::Failed {
                        message: err.to_string(),
                    }
                }
            };
            outcomes.push((service.local_name.clone(), outcome));
        }
        Ok(outcomes)
    }

    async fn update_service(
        &self,
        dist: &mut dyn DistributionHandle,
        service: &RegisteredService,
    ) -> Result<ServiceOutcome> {
        let service_dir = self.base_dir.join(&service.local_name);
        let link = service_dir.join(CURRENT_LINK);

        let current = self
            .symlinks
            .read_target(&link)
            .and_then(|target| Version::from_path(&target.to_string_lossy()));

        let Some(latest) = dist.latest_version(&service.remote_name).await? else {
            info!(service = %service.local_name, "remote reports no version");
            return Ok(ServiceOutcome::NoVersionAvailable);
        };

        if let Some(current) = &current {
            if latest <= *current {
                return Ok(ServiceOutcome::UpToDate {
                    version: current.clone(),
                });
            }
        }

        let version_dir = service_dir.join(latest.to_string());
        fs::create_dir_all(&version_dir).await?;
        info!(
            service = %service.local_name,
            version = %latest,
            dir = %version_dir.display(),
            "downloading"
        );
        dist.download_version(&service.remote_name, &latest, &version_dir)
            .await?;

        let exec_name = service
            .executable_name
            .as_deref()
            .unwrap_or(&service.local_name);
        let Some(executable) = self.detector.find(&version_dir, exec_name) else {
            // Leave the downloaded tree in place for inspection; the
            // running version is untouched.
            return Ok(ServiceOutcome::NoExecutable { dir: version_dir });
        };

        // The link names the executable itself, so the unit's
        // `ExecStart=.../current` works no matter how deep the entry
        // point sits in the build tree.
        self.symlinks.create_or_update(&link, &executable)?;

        self.permissions.set_executable(&executable).await;
        self.permissions
            .set_directory_permissions(&service_dir)
            .await;

        let action = self.reconcile(&service.local_name).await?;
        Ok(ServiceOutcome::Updated {
            from: current,
            to: latest,
            action,
        })
    }

    async fn reconcile(&self, unit: &str) -> Result<SupervisorAction> {
        if !self.supervisor.exists(unit).await {
            warn!(%unit, "no unit file; skipping service reconcile");
            return Ok(SupervisorAction::NoUnit);
        }
        if self.supervisor.is_running(unit).await {
            self.supervisor.restart(unit).await?;
            Ok(SupervisorAction::Restarted)
        } else {
            self.supervisor.start(unit).await?;
            Ok(SupervisorAction::Started)
        }
    }
}
