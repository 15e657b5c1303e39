use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "updaemon", version, about = "Service update daemon for systemd hosts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new service and install its systemd unit
    New {
        /// Local service name (also the directory name under the service root)
        app_name: String,
    },
    /// Check for updates and install them
    Update {
        /// Update only this service; all registered services when omitted
        app_name: Option<String>,
    },
    /// Change the remote name a service is resolved under
    SetRemote {
        app_name: String,
        remote_name: String,
    },
    /// Override the executable name to look for, or "-" to clear it
    SetExecName {
        app_name: String,
        executable_name: String,
    },
    /// Store a secret passed to the distribution plugin
    #[command(alias = "dist-set")]
    SecretSet {
        key: String,
        value: String,
    },
    /// Download a distribution plugin and make it the active one
    DistInstall {
        /// URL of the plugin executable
        url: String,
    },
    /// Show, set, or disable the periodic update timer
    Timer {
        /// Interval like "30s", "5m" or "2h"; "-" removes the timer;
        /// omitted shows the current state
        interval: Option<String>,
    },
}
