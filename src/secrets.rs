//! Flat `key=value` secret store, persisted as `secrets.txt` in the
//! state directory. The formatted dump of the whole store is what gets
//! handed to the distribution plugin at initialization.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::paths;

const SECRETS_FILE_NAME: &str = "secrets.txt";

pub struct SecretsManager {
    dir: PathBuf,
    file: PathBuf,
}

impl SecretsManager {
    pub fn new() -> Self {
        Self::with_dir(paths::state_dir())
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        let file = dir.join(SECRETS_FILE_NAME);
        Self { dir, file }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut secrets = self.load()?;
        secrets.insert(key.to_string(), value.to_string());
        self.save(&secrets)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut secrets = self.load()?;
        secrets.remove(key);
        self.save(&secrets)
    }

    /// Newline-joined `key=value` lines in stable key order, or `None`
    /// when the store is empty.
    pub fn all_formatted(&self) -> Result<Option<String>> {
        let secrets = self.load()?;
        if secrets.is_empty() {
            return Ok(None);
        }
        let formatted: Vec<String> = secrets
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        Ok(Some(formatted.join("\n")))
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.file.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.file)?;
        let mut secrets = BTreeMap::new();
        for line in content.lines() {
            if let Some(idx) = line.find('=') {
                if idx > 0 {
                    secrets.insert(line[..idx].to_string(), line[idx + 1..].to_string());
                }
            }
        }
        Ok(secrets)
    }

    fn save(&self, secrets: &BTreeMap<String, String>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let content: Vec<String> = secrets
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        fs::write(&self.file, content.join("\n"))?;
        Ok(())
    }
}

impl Default for SecretsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, SecretsManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = SecretsManager::with_dir(dir.path().to_path_buf());
        (dir, manager)
    }

    #[test]
    fn set_get_remove() {
        let (_dir, manager) = manager();
        manager.set("githubToken", "abc123").unwrap();
        assert_eq!(manager.get("githubToken").unwrap().as_deref(), Some("abc123"));

        manager.remove("githubToken").unwrap();
        assert!(manager.get("githubToken").unwrap().is_none());
    }

    #[test]
    fn set_overwrites_existing_value() {
        let (_dir, manager) = manager();
        manager.set("key", "old").unwrap();
        manager.set("key", "new").unwrap();
        assert_eq!(manager.get("key").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn empty_store_formats_as_none() {
        let (_dir, manager) = manager();
        assert!(manager.all_formatted().unwrap().is_none());
    }

    #[test]
    fn formatted_output_is_sorted_key_value_lines() {
        let (_dir, manager) = manager();
        manager.set("zebra", "z").unwrap();
        manager.set("apple", "a").unwrap();
        assert_eq!(
            manager.all_formatted().unwrap().as_deref(),
            Some("apple=a\nzebra=z")
        );
    }

    #[test]
    fn values_may_contain_equals() {
        let (_dir, manager) = manager();
        manager.set("conn", "host=db;port=5432").unwrap();
        assert_eq!(
            manager.get("conn").unwrap().as_deref(),
            Some("host=db;port=5432")
        );
    }
}
