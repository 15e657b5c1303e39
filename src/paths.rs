//! Well-known directories, each overridable through an environment
//! variable so tests and non-root setups can relocate them.

use std::path::PathBuf;

pub const STATE_DIR_ENV: &str = "UPDAEMON_STATE_DIR";
pub const SERVICES_DIR_ENV: &str = "UPDAEMON_SERVICES_DIR";
pub const UNIT_DIR_ENV: &str = "UPDAEMON_UNIT_DIR";

const DEFAULT_STATE_DIR: &str = "/var/lib/updaemon";
const DEFAULT_SERVICES_DIR: &str = "/opt";
const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";

fn env_path(var: &str, default: &str) -> PathBuf {
    let dir = std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default));
    tracing::trace!(var, dir = %dir.display(), "resolved directory");
    dir
}

/// Where config.json, secrets.txt, templates, and installed plugins live
/// ($UPDAEMON_STATE_DIR or /var/lib/updaemon).
pub fn state_dir() -> PathBuf {
    env_path(STATE_DIR_ENV, DEFAULT_STATE_DIR)
}

/// Base directory holding one subdirectory per managed service
/// ($UPDAEMON_SERVICES_DIR or /opt).
pub fn services_dir() -> PathBuf {
    env_path(SERVICES_DIR_ENV, DEFAULT_SERVICES_DIR)
}

/// systemd unit directory ($UPDAEMON_UNIT_DIR or /etc/systemd/system).
pub fn unit_dir() -> PathBuf {
    env_path(UNIT_DIR_ENV, DEFAULT_UNIT_DIR)
}

/// Where dist-install places downloaded plugin executables.
pub fn plugins_dir() -> PathBuf {
    state_dir().join("plugins")
}
