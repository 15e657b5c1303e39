use updaemon::config::ConfigManager;

pub(crate) fn cmd_set_remote(app_name: &str, remote_name: &str) -> anyhow::Result<()> {
    ConfigManager::new().set_remote_name(app_name, remote_name)?;
    println!("'{app_name}' now resolves under '{remote_name}'.");
    Ok(())
}
