use updaemon::config::ConfigManager;

/// Sets the executable name override; "-" clears it so detection falls
/// back to the local service name.
pub(crate) fn cmd_set_exec_name(app_name: &str, executable_name: &str) -> anyhow::Result<()> {
    let config = ConfigManager::new();
    if executable_name == "-" {
        config.set_executable_name(app_name, None)?;
        println!("Cleared the executable override for '{app_name}'.");
    } else {
        config.set_executable_name(app_name, Some(executable_name))?;
        println!("'{app_name}' will look for executable '{executable_name}'.");
    }
    Ok(())
}
