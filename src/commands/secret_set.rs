use updaemon::secrets::SecretsManager;

pub(crate) fn cmd_secret_set(key: &str, value: &str) -> anyhow::Result<()> {
    SecretsManager::new().set(key, value)?;
    println!("Stored secret '{key}'.");
    Ok(())
}
