use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpdaemonError {
    #[error("plugin executable not found: {0}")]
    PluginNotFound(PathBuf),

    #[error("timed out connecting to plugin after {0:?}")]
    ConnectTimeout(Duration),

    #[error("rpc call '{method}' failed: {message}")]
    Rpc { method: String, message: String },

    #[error("plugin closed the connection before responding")]
    Disconnected,

    #[error("malformed plugin response: {0}")]
    MalformedResponse(String),

    #[error("service '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("service '{0}' is not registered")]
    NotRegistered(String),

    #[error("systemctl {command} {unit} failed: {stderr}")]
    Systemctl {
        command: String,
        unit: String,
        stderr: String,
    },

    #[error("path '{0}' exists but is not a symbolic link")]
    NotASymlink(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, UpdaemonError>;
