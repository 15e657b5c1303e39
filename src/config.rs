//! Registered-service store, persisted as `config.json` in the state
//! directory.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdaemonError};
use crate::paths;

const CONFIG_FILE_NAME: &str = "config.json";

/// A service managed by updaemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredService {
    /// Unique key; names the directory under the services base dir and
    /// the systemd unit.
    pub local_name: String,
    /// Opaque identifier passed to the distribution backend. May encode a
    /// backend-specific sub-path or filename pattern.
    pub remote_name: String,
    /// Optional executable-name override used during detection. When
    /// absent, the local name is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdaemonConfig {
    /// Path to the active distribution plugin executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_plugin_path: Option<String>,
    #[serde(default)]
    pub services: Vec<RegisteredService>,
}

pub struct ConfigManager {
    dir: PathBuf,
    file: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_dir(paths::state_dir())
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        let file = dir.join(CONFIG_FILE_NAME);
        Self { dir, file }
    }

    pub fn load(&self) -> Result<UpdaemonConfig> {
        if !self.file.exists() {
            return Ok(UpdaemonConfig::default());
        }
        let json = fs::read_to_string(&self.file)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, config: &UpdaemonConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.file, json)?;
        Ok(())
    }

    /// Registers a service; the remote name starts equal to whatever the
    /// caller supplies. Duplicate local names are an error.
    pub fn register(&self, local_name: &str, remote_name: &str) -> Result<()> {
        let mut config = self.load()?;
        if config.services.iter().any(|s| s.local_name == local_name) {
            return Err(UpdaemonError::AlreadyRegistered(local_name.to_string()));
        }
        config.services.push(RegisteredService {
            local_name: local_name.to_string(),
            remote_name: remote_name.to_string(),
            executable_name: None,
        });
        self.save(&config)
    }

    pub fn set_remote_name(&self, local_name: &str, remote_name: &str) -> Result<()> {
        self.update_service(local_name, |service| {
            service.remote_name = remote_name.to_string();
        })
    }

    /// `None` clears the override so detection falls back to the local name.
    pub fn set_executable_name(&self, local_name: &str, executable_name: Option<&str>) -> Result<()> {
        self.update_service(local_name, |service| {
            service.executable_name = executable_name.map(str::to_string);
        })
    }

    pub fn get(&self, local_name: &str) -> Result<Option<RegisteredService>> {
        let config = self.load()?;
        Ok(config
            .services
            .into_iter()
            .find(|s| s.local_name == local_name))
    }

    /// All registered services in stored order.
    pub fn all(&self) -> Result<Vec<RegisteredService>> {
        Ok(self.load()?.services)
    }

    pub fn set_plugin_path(&self, plugin_path: &str) -> Result<()> {
        let mut config = self.load()?;
        config.distribution_plugin_path = Some(plugin_path.to_string());
        self.save(&config)
    }

    pub fn plugin_path(&self) -> Result<Option<String>> {
        Ok(self.load()?.distribution_plugin_path)
    }

    fn update_service(&self, local_name: &str, apply: impl FnOnce(&mut RegisteredService)) -> Result<()> {
        let mut config = self.load()?;
        let service = config
            .services
            .iter_mut()
            .find(|s| s.local_name == local_name)
            .ok_or_else(|| UpdaemonError::NotRegistered(local_name.to_string()))?;
        apply(service);
        self.save(&config)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, ConfigManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        (dir, manager)
    }

    #[test]
    fn missing_file_loads_default() {
        let (_dir, manager) = manager();
        let config = manager.load().unwrap();
        assert!(config.services.is_empty());
        assert!(config.distribution_plugin_path.is_none());
    }

    #[test]
    fn register_and_reload() {
        let (_dir, manager) = manager();
        manager.register("my-api", "owner/my-api").unwrap();

        let service = manager.get("my-api").unwrap().unwrap();
        assert_eq!(service.remote_name, "owner/my-api");
        assert!(service.executable_name.is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (_dir, manager) = manager();
        manager.register("my-api", "my-api").unwrap();
        let err = manager.register("my-api", "other").unwrap_err();
        assert!(matches!(err, UpdaemonError::AlreadyRegistered(name) if name == "my-api"));
    }

    #[test]
    fn set_remote_name_requires_registration() {
        let (_dir, manager) = manager();
        let err = manager.set_remote_name("ghost", "owner/ghost").unwrap_err();
        assert!(matches!(err, UpdaemonError::NotRegistered(_)));
    }

    #[test]
    fn executable_name_can_be_set_and_cleared() {
        let (_dir, manager) = manager();
        manager.register("my-api", "my-api").unwrap();

        manager.set_executable_name("my-api", Some("api-server")).unwrap();
        assert_eq!(
            manager.get("my-api").unwrap().unwrap().executable_name.as_deref(),
            Some("api-server")
        );

        manager.set_executable_name("my-api", None).unwrap();
        assert!(manager.get("my-api").unwrap().unwrap().executable_name.is_none());
    }

    #[test]
    fn services_keep_stored_order() {
        let (_dir, manager) = manager();
        manager.register("b-svc", "b").unwrap();
        manager.register("a-svc", "a").unwrap();

        let names: Vec<String> = manager
            .all()
            .unwrap()
            .into_iter()
            .map(|s| s.local_name)
            .collect();
        assert_eq!(names, vec!["b-svc", "a-svc"]);
    }

    #[test]
    fn plugin_path_round_trips() {
        let (_dir, manager) = manager();
        assert!(manager.plugin_path().unwrap().is_none());
        manager.set_plugin_path("/var/lib/updaemon/plugins/dist-github").unwrap();
        assert_eq!(
            manager.plugin_path().unwrap().as_deref(),
            Some("/var/lib/updaemon/plugins/dist-github")
        );
    }

    #[test]
    fn config_json_uses_camel_case() {
        let (dir, manager) = manager();
        manager.register("my-api", "owner/my-api").unwrap();
        manager.set_plugin_path("/p").unwrap();

        let raw = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
        assert!(raw.contains("\"distributionPluginPath\""));
        assert!(raw.contains("\"localName\""));
        assert!(raw.contains("\"remoteName\""));
    }
}
