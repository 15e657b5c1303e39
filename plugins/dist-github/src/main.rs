//! Distribution plugin resolving service versions from GitHub releases.
//!
//! Spawned by updaemon with `--pipe-name <name>`; serves the
//! line-delimited JSON protocol on the matching socket until the host
//! closes the connection.

mod api;
mod dist;
mod extract;

use tracing_subscriber::EnvFilter;

use crate::dist::GithubDistribution;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout stays clean; the host may capture it.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("UPDAEMON_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    updaemon_common::host::run(GithubDistribution::new()).await
}
