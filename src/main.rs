mod args;
mod commands;

use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("UPDAEMON_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::New { app_name } => commands::new::cmd_new(&app_name).await?,
        Commands::Update { app_name } => commands::update::cmd_update(app_name.as_deref()).await?,
        Commands::SetRemote {
            app_name,
            remote_name,
        } => commands::set_remote::cmd_set_remote(&app_name, &remote_name)?,
        Commands::SetExecName {
            app_name,
            executable_name,
        } => commands::set_exec_name::cmd_set_exec_name(&app_name, &executable_name)?,
        Commands::SecretSet { key, value } => commands::secret_set::cmd_secret_set(&key, &value)?,
        Commands::DistInstall { url } => commands::dist_install::cmd_dist_install(&url).await?,
        Commands::Timer { interval } => commands::timer::cmd_timer(interval.as_deref()).await?,
    }

    Ok(())
}
