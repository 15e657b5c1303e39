//! systemd unit file templating.
//!
//! The template lives at `<state>/default-unit.template` so operators can
//! customize it; the embedded default is seeded there on first use.

use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::paths;

const TEMPLATE_FILE_NAME: &str = "default-unit.template";

const DEFAULT_TEMPLATE: &str = "\
[Unit]
Description={DESCRIPTION}
After=network.target

[Service]
Type=simple
ExecStart={EXECUTABLE_PATH}
Restart=always
RestartSec=10
StandardOutput=journal
StandardError=journal
SyslogIdentifier={SERVICE_NAME}

[Install]
WantedBy=multi-user.target
";

pub struct UnitFileManager {
    dir: PathBuf,
    template_path: PathBuf,
}

impl UnitFileManager {
    pub fn new() -> Self {
        Self::with_dir(paths::state_dir())
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        let template_path = dir.join(TEMPLATE_FILE_NAME);
        Self { dir, template_path }
    }

    pub fn read_template(&self) -> Result<String> {
        self.ensure_template_exists()?;
        Ok(fs::read_to_string(&self.template_path)?)
    }

    /// Renders the template for one service, with `{SERVICE_NAME}`,
    /// `{DESCRIPTION}`, and `{EXECUTABLE_PATH}` substituted.
    pub fn render(&self, service_name: &str, executable_path: &str) -> Result<String> {
        let template = self.read_template()?;
        Ok(template
            .replace("{SERVICE_NAME}", service_name)
            .replace(
                "{DESCRIPTION}",
                &format!("{service_name} service managed by updaemon"),
            )
            .replace("{EXECUTABLE_PATH}", executable_path))
    }

    fn ensure_template_exists(&self) -> Result<()> {
        if self.template_path.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;
        fs::write(&self.template_path, DEFAULT_TEMPLATE)?;
        Ok(())
    }
}

impl Default for UnitFileManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_default_template_on_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let manager = UnitFileManager::with_dir(dir.path().to_path_buf());

        let template = manager.read_template().unwrap();
        assert!(template.contains("{SERVICE_NAME}"));
        assert!(dir.path().join(TEMPLATE_FILE_NAME).exists());
    }

    #[test]
    fn render_substitutes_all_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let manager = UnitFileManager::with_dir(dir.path().to_path_buf());

        let unit = manager.render("my-api", "/opt/my-api/current").unwrap();
        assert!(unit.contains("ExecStart=/opt/my-api/current"));
        assert!(unit.contains("SyslogIdentifier=my-api"));
        assert!(unit.contains("Description=my-api service managed by updaemon"));
        assert!(!unit.contains('{'));
    }

    #[test]
    fn existing_template_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(TEMPLATE_FILE_NAME),
            "ExecStart={EXECUTABLE_PATH}\n",
        )
        .unwrap();

        let manager = UnitFileManager::with_dir(dir.path().to_path_buf());
        let unit = manager.render("svc", "/opt/svc/current").unwrap();
        assert_eq!(unit, "ExecStart=/opt/svc/current\n");
    }
}
