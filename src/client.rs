//! Client side of the distribution plugin channel.
//!
//! `DistClient::connect` spawns the plugin executable with a freshly
//! generated `--pipe-name`, connects to the socket the plugin binds, and
//! owns the child for the rest of the run. The protocol is half-duplex:
//! one request in flight at a time, enforced by `&mut self` on every
//! call.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use updaemon_common::host::{socket_path, LineDecoder};
use updaemon_common::rpc::{
    DownloadParams, RpcRequest, RpcResponse, METHOD_DOWNLOAD_VERSION, METHOD_INITIALIZE,
    METHOD_LATEST_VERSION,
};
use updaemon_common::Version;
use uuid::Uuid;

use crate::error::{Result, UpdaemonError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_POLL: Duration = Duration::from_millis(50);

/// The distribution operations the orchestrator consumes. Abstracted so
/// the update state machine is testable without child processes.
#[async_trait]
pub trait DistributionHandle: Send {
    async fn initialize(&mut self, secrets: Option<&str>) -> Result<()>;
    async fn latest_version(&mut self, service_name: &str) -> Result<Option<Version>>;
    async fn download_version(
        &mut self,
        service_name: &str,
        version: &Version,
        target_dir: &Path,
    ) -> Result<()>;
}

/// One request/response exchange over any byte stream.
#[derive(Debug)]
pub(crate) struct RpcChannel<S> {
    stream: S,
    decoder: LineDecoder,
    lines: VecDeque<String>,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> RpcChannel<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: LineDecoder::new(),
            lines: VecDeque::new(),
        }
    }

    /// Writes one request and synchronously awaits exactly one response.
    async fn invoke(&mut self, method: &str, parameters: Option<String>) -> Result<Option<String>> {
        let request = RpcRequest {
            id: Uuid::new_v4().simple().to_string(),
            method: method.to_string(),
            parameters,
        };

        let mut payload = serde_json::to_string(&request)?;
        payload.push('\n');
        self.stream.write_all(payload.as_bytes()).await?;
        self.stream.flush().await?;

        let line = self.read_line().await?;
        let response: RpcResponse = serde_json::from_str(&line)
            .map_err(|err| UpdaemonError::MalformedResponse(err.to_string()))?;

        if !response.success {
            return Err(UpdaemonError::Rpc {
                method: method.to_string(),
                message: response.error.unwrap_or_else(|| "unspecified error".to_string()),
            });
        }
        Ok(response.result)
    }

    async fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(line) = self.lines.pop_front() {
                return Ok(line);
            }
            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                return Err(UpdaemonError::Disconnected);
            }
            self.lines.extend(self.decoder.push(&buf[..n]));
        }
    }
}

/// Owns the plugin child process and the socket to it. Exactly one per
/// run; torn down through [`DistClient::shutdown`] at run end, with
/// `kill_on_drop` as the backstop on abnormal unwinds.
#[derive(Debug)]
pub struct DistClient {
    channel: RpcChannel<UnixStream>,
    child: Child,
}

impl DistClient {
    pub async fn connect(plugin_path: &Path) -> Result<Self> {
        if !plugin_path.exists() {
            return Err(UpdaemonError::PluginNotFound(plugin_path.to_path_buf()));
        }

        let pipe_name = format!("updaemon_dist_{}", Uuid::new_v4().simple());
        let socket = socket_path(&pipe_name);
        debug!(plugin = %plugin_path.display(), %pipe_name, "starting distribution plugin");

        let child = Command::new(plugin_path)
            .arg("--pipe-name")
            .arg(&pipe_name)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // The plugin binds the socket at its own pace; poll until it
        // accepts or the deadline passes.
        let deadline = Instant::now() + CONNECT_TIMEOUT;
        let stream = loop {
            match UnixStream::connect(&socket).await {
                Ok(stream) => break stream,
                Err(err) => {
                    if Instant::now() >= deadline {
                        warn!(%err, "plugin never accepted a connection");
                        return Err(UpdaemonError::ConnectTimeout(CONNECT_TIMEOUT));
                    }
                    sleep(CONNECT_POLL).await;
                }
            }
        };
        debug!("connected to plugin");

        Ok(Self {
            channel: RpcChannel::new(stream),
            child,
        })
    }

    /// Closes the channel and reaps the child, killing it if it has not
    /// already exited. Safe to call after any failure.
    pub async fn shutdown(mut self) -> Result<()> {
        drop(self.channel); // EOF lets a healthy plugin exit on its own

        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(%status, "plugin exited");
                return Ok(());
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "could not query plugin state"),
        }

        // kill() waits for the exit as well, so no orphan survives us.
        if let Err(err) = self.child.kill().await {
            warn!(%err, "failed to kill plugin process");
        }
        Ok(())
    }
}

#[async_trait]
impl DistributionHandle for DistClient {
    async fn initialize(&mut self, secrets: Option<&str>) -> Result<()> {
        initialize(&mut self.channel, secrets).await
    }

    async fn latest_version(&mut self, service_name: &str) -> Result<Option<Version>> {
        latest_version(&mut self.channel, service_name).await
    }

    async fn download_version(
        &mut self,
        service_name: &str,
        version: &Version,
        target_dir: &Path,
    ) -> Result<()> {
        download_version(&mut self.channel, service_name, version, target_dir).await
    }
}

// The typed wrappers live on RpcChannel so in-memory streams get the
// exact same encoding the real socket does.

async fn initialize<S: AsyncRead + AsyncWrite + Unpin + Send>(
    channel: &mut RpcChannel<S>,
    secrets: Option<&str>,
) -> Result<()> {
    let parameters = match secrets {
        Some(secrets) => Some(serde_json::to_string(secrets)?),
        None => None,
    };
    channel.invoke(METHOD_INITIALIZE, parameters).await?;
    Ok(())
}

async fn latest_version<S: AsyncRead + AsyncWrite + Unpin + Send>(
    channel: &mut RpcChannel<S>,
    service_name: &str,
) -> Result<Option<Version>> {
    let parameters = serde_json::to_string(service_name)?;
    let result = channel.invoke(METHOD_LATEST_VERSION, Some(parameters)).await?;

    let Some(result) = result else {
        return Ok(None);
    };
    let version_string: Option<String> = serde_json::from_str(&result)
        .map_err(|err| UpdaemonError::MalformedResponse(err.to_string()))?;

    match version_string.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|err| UpdaemonError::MalformedResponse(format!("bad version '{raw}': {err}"))),
    }
}

async fn download_version<S: AsyncRead + AsyncWrite + Unpin + Send>(
    channel: &mut RpcChannel<S>,
    service_name: &str,
    version: &Version,
    target_dir: &Path,
) -> Result<()> {
    let params = DownloadParams {
        service_name: service_name.to_string(),
        version: version.to_string(),
        target_path: target_dir.display().to_string(),
    };
    let parameters = serde_json::to_string(&params)?;
    channel.invoke(METHOD_DOWNLOAD_VERSION, Some(parameters)).await?;
    Ok(())
}
