use std::path::Path;

use anyhow::bail;
use tracing::info;
use updaemon::client::DistClient;
use updaemon::config::ConfigManager;
use updaemon::detect::ExecutableDetector;
use updaemon::paths;
use updaemon::permissions::FilePermissionManager;
use updaemon::secrets::SecretsManager;
use updaemon::symlink::SymlinkManager;
use updaemon::systemd::SystemdManager;
use updaemon::update::Updater;

/// Runs the update state machine for one named service or for every
/// registered service.
pub(crate) async fn cmd_update(app_name: Option<&str>) -> anyhow::Result<()> {
    let config = ConfigManager::new();

    let Some(plugin_path) = config.plugin_path()? else {
        println!("No distribution plugin configured. Run `updaemon dist-install <url>` first.");
        return Ok(());
    };

    let services = match app_name {
        Some(name) => match config.get(name)? {
            Some(service) => vec![service],
            None => bail!("service '{name}' is not registered"),
        },
        None => config.all()?,
    };
    if services.is_empty() {
        println!("No services registered. Run `updaemon new <name>` first.");
        return Ok(());
    }

    let secrets = SecretsManager::new().all_formatted()?;

    info!(plugin = %plugin_path, "connecting to distribution plugin");
    let mut client = DistClient::connect(Path::new(&plugin_path)).await?;

    let updater = Updater::new(
        paths::services_dir(),
        Box::new(SystemdManager::new()),
        Box::new(SymlinkManager),
        Box::new(ExecutableDetector),
        Box::new(FilePermissionManager),
    );

    let run = updater
        .run(&mut client, &services, secrets.as_deref())
        .await;
    client.shutdown().await?;

    for (service, outcome) in run? {
        println!("{service}: {outcome}");
    }
    Ok(())
}
