use std::fs;

use updaemon::config::ConfigManager;
use updaemon::paths;
use updaemon::systemd::{Supervisor, SystemdManager};
use updaemon::unitfile::UnitFileManager;
use updaemon::update::CURRENT_LINK;

/// Registers a service, lays out its directory under the service root,
/// and installs + enables a systemd unit that runs `current/<name>`.
pub(crate) async fn cmd_new(app_name: &str) -> anyhow::Result<()> {
    let config = ConfigManager::new();
    config.register(app_name, app_name)?;

    let service_dir = paths::services_dir().join(app_name);
    fs::create_dir_all(&service_dir)?;

    // The `current` link resolves to the entry point itself once the
    // first update lands, so the unit execs the link directly.
    let executable_path = service_dir.join(CURRENT_LINK);
    let unit = UnitFileManager::new().render(app_name, &executable_path.to_string_lossy())?;
    let unit_path = paths::unit_dir().join(format!("{app_name}.service"));
    fs::write(&unit_path, unit)?;

    let systemd = SystemdManager::new();
    systemd.enable(app_name).await?;

    println!("Registered '{app_name}'. Run `updaemon update {app_name}` to install the first version.");
    println!("Unit installed at {}", unit_path.display());
    Ok(())
}
