//! RPC message types for the plugin wire protocol.
//!
//! Each message is one UTF-8 JSON document terminated by `\n`. The
//! `parameters` and `result` fields are themselves JSON-encoded strings,
//! so every method can carry a differently shaped payload without the
//! envelope knowing about it.

use serde::{Deserialize, Serialize};

pub const METHOD_INITIALIZE: &str = "InitializeAsync";
pub const METHOD_LATEST_VERSION: &str = "GetLatestVersionAsync";
pub const METHOD_DOWNLOAD_VERSION: &str = "DownloadVersionAsync";

/// Request sent from updaemon to a distribution plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Caller-generated correlation token.
    pub id: String,
    /// Method name to invoke, e.g. `GetLatestVersionAsync`.
    pub method: String,
    /// JSON-encoded parameters for the method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
}

/// Response sent from a distribution plugin back to updaemon.
///
/// `result` is meaningful only when `success` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Echoes the request id.
    pub id: String,
    /// JSON-encoded result of the invocation.
    #[serde(default)]
    pub result: Option<String>,
    /// Error message when the invocation failed.
    #[serde(default)]
    pub error: Option<String>,
    pub success: bool,
}

impl RpcResponse {
    pub fn ok(id: impl Into<String>, result: Option<String>) -> Self {
        Self {
            id: id.into(),
            result,
            error: None,
            success: true,
        }
    }

    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error.into()),
            success: false,
        }
    }
}

/// Payload of `DownloadVersionAsync`. All fields are strings; the version
/// is in dot-decimal form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadParams {
    pub service_name: String,
    pub version: String,
    pub target_path: String,
}
