use futures_util::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;
use updaemon::config::ConfigManager;
use updaemon::paths;
use updaemon::permissions::{FilePermissionManager, PermissionManager};

/// Downloads a distribution plugin executable and records it as the
/// active plugin for future update runs.
pub(crate) async fn cmd_dist_install(url: &str) -> anyhow::Result<()> {
    let file_name = url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("distribution-plugin");

    let plugins_dir = paths::plugins_dir();
    fs::create_dir_all(&plugins_dir).await?;
    let target = plugins_dir.join(file_name);

    info!(%url, target = %target.display(), "downloading distribution plugin");
    let response = reqwest::get(url).await?.error_for_status()?;
    let mut file = fs::File::create(&target).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;

    FilePermissionManager.set_executable(&target).await;
    ConfigManager::new().set_plugin_path(&target.to_string_lossy())?;

    println!("Installed distribution plugin at {}", target.display());
    Ok(())
}
