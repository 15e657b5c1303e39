//! Plugin-side hosting: socket setup, framing, and request dispatch.
//!
//! A plugin executable is started with `--pipe-name <name>`. The host
//! binds a Unix socket derived from that name, accepts exactly one
//! client, then runs a strictly half-duplex loop: read one request, emit
//! one response, until the peer closes the stream.

use std::backtrace::Backtrace;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tracing::{debug, warn};

use crate::rpc::{
    DownloadParams, RpcRequest, RpcResponse, METHOD_DOWNLOAD_VERSION, METHOD_INITIALIZE,
    METHOD_LATEST_VERSION,
};
use crate::{Distribution, SecretCollection, Version};

/// Where a channel name materializes on the filesystem.
pub fn socket_path(pipe_name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{pipe_name}.sock"))
}

/// Extracts the value following `--pipe-name`. Missing or blank values
/// are fatal: no channel exists yet to report the failure on.
pub fn parse_pipe_name(args: &[String]) -> anyhow::Result<String> {
    for window in args.windows(2) {
        if window[0] == "--pipe-name" {
            let name = window[1].trim();
            if name.is_empty() {
                bail!("pipe name cannot be empty");
            }
            return Ok(name.to_string());
        }
    }
    bail!("missing required argument: --pipe-name <name>");
}

/// Runs a distribution plugin to completion: parse the channel name from
/// the process arguments, serve the one client, exit cleanly when it
/// disconnects.
pub async fn run<D: Distribution>(implementation: D) -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    run_with_args(&args, implementation).await
}

pub async fn run_with_args<D: Distribution>(
    args: &[String],
    implementation: D,
) -> anyhow::Result<()> {
    let pipe_name = parse_pipe_name(args)?;
    let path = socket_path(&pipe_name);

    // A stale socket from a crashed previous run would make bind fail.
    if path.exists() {
        std::fs::remove_file(&path)?;
    }

    let listener = UnixListener::bind(&path)
        .with_context(|| format!("failed to bind socket at {}", path.display()))?;
    debug!(path = %path.display(), "plugin listening");

    // Exactly one client per process lifetime.
    let (stream, _) = listener.accept().await?;
    debug!("client connected");

    let result = serve(stream, implementation).await;

    if path.exists() {
        let _ = std::fs::remove_file(&path);
    }

    result
}

/// The dispatch loop over an established stream. Generic over the stream
/// type so tests can drive it through an in-memory duplex.
pub async fn serve<S, D>(mut stream: S, mut implementation: D) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    D: Distribution,
{
    let mut decoder = LineDecoder::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            debug!("client disconnected, host loop ending");
            return Ok(());
        }

        for line in decoder.push(&buf[..n]) {
            if line.trim().is_empty() {
                continue;
            }
            let request: RpcRequest = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(err) => {
                    warn!(%err, "discarding unparseable request line");
                    continue;
                }
            };

            let response = dispatch(request, &mut implementation).await;
            let mut payload = serde_json::to_string(&response)?;
            payload.push('\n');
            stream.write_all(payload.as_bytes()).await?;
            stream.flush().await?;
        }
    }
}

/// Splits a byte stream into `\n`-terminated lines, buffering partial
/// reads. One physical read may carry zero, one, or several complete
/// messages; every complete line found is returned in order.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(idx) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=idx).collect();
            line.pop(); // the newline itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

async fn dispatch<D: Distribution>(request: RpcRequest, implementation: &mut D) -> RpcResponse {
    let id = request.id.clone();
    let result = match request.method.as_str() {
        METHOD_INITIALIZE => handle_initialize(&request, implementation).await,
        METHOD_LATEST_VERSION => handle_latest_version(&request, implementation).await,
        METHOD_DOWNLOAD_VERSION => handle_download_version(&request, implementation).await,
        other => return RpcResponse::failure(id, format!("Unknown method: {other}")),
    };

    match result {
        Ok(result) => RpcResponse::ok(id, result),
        // The failure happened in a separate process with no shared
        // console; the error chain plus a trace is the only diagnostic
        // channel the caller gets.
        Err(err) => RpcResponse::failure(
            id,
            format!("{err:#}\n{}", Backtrace::force_capture()),
        ),
    }
}

async fn handle_initialize<D: Distribution>(
    request: &RpcRequest,
    implementation: &mut D,
) -> anyhow::Result<Option<String>> {
    let secrets_text: Option<String> = match &request.parameters {
        Some(parameters) => serde_json::from_str(parameters).context("invalid secrets payload")?,
        None => None,
    };
    implementation
        .initialize(SecretCollection::parse(secrets_text.as_deref()))
        .await?;
    Ok(None)
}

async fn handle_latest_version<D: Distribution>(
    request: &RpcRequest,
    implementation: &mut D,
) -> anyhow::Result<Option<String>> {
    let parameters = request
        .parameters
        .as_deref()
        .context("GetLatestVersionAsync requires a serviceName parameter")?;
    let service_name: String =
        serde_json::from_str(parameters).context("invalid serviceName payload")?;

    let version = implementation.latest_version(&service_name).await?;

    // The result slot always carries a JSON document: a string or null.
    let result = serde_json::to_string(&version.map(|v| v.to_string()))?;
    Ok(Some(result))
}

async fn handle_download_version<D: Distribution>(
    request: &RpcRequest,
    implementation: &mut D,
) -> anyhow::Result<Option<String>> {
    let parameters = request
        .parameters
        .as_deref()
        .context("DownloadVersionAsync requires parameters")?;
    let params: DownloadParams =
        serde_json::from_str(parameters).context("invalid DownloadVersionAsync payload")?;

    let version: Version = params
        .version
        .parse()
        .with_context(|| format!("invalid version '{}'", params.version))?;

    implementation
        .download_version(
            &params.service_name,
            &version,
            PathBuf::from(&params.target_path).as_path(),
        )
        .await?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubDistribution {
        latest: Option<Version>,
        downloads: Arc<AtomicUsize>,
        fail_with: Option<String>,
    }

    impl StubDistribution {
        fn new(latest: Option<&str>) -> Self {
            Self {
                latest: latest.map(|v| v.parse().unwrap()),
                downloads: Arc::new(AtomicUsize::new(0)),
                fail_with: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                latest: None,
                downloads: Arc::new(AtomicUsize::new(0)),
                fail_with: Some(message.to_string()),
            }
        }
    }

    impl Distribution for StubDistribution {
        async fn initialize(&mut self, _secrets: SecretCollection) -> anyhow::Result<()> {
            if let Some(message) = &self.fail_with {
                bail!("{message}");
            }
            Ok(())
        }

        async fn latest_version(&self, _service_name: &str) -> anyhow::Result<Option<Version>> {
            if let Some(message) = &self.fail_with {
                bail!("{message}");
            }
            Ok(self.latest.clone())
        }

        async fn download_version(
            &self,
            _service_name: &str,
            _version: &Version,
            _target_dir: &Path,
        ) -> anyhow::Result<()> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn request(id: &str, method: &str, parameters: Option<String>) -> RpcRequest {
        RpcRequest {
            id: id.into(),
            method: method.into(),
            parameters,
        }
    }

    #[test]
    fn decoder_assembles_line_from_single_bytes() {
        let mut decoder = LineDecoder::new();
        let message = b"{\"id\":\"1\"}\n";
        for &b in &message[..message.len() - 1] {
            assert!(decoder.push(&[b]).is_empty());
        }
        let lines = decoder.push(b"\n");
        assert_eq!(lines, vec!["{\"id\":\"1\"}".to_string()]);
    }

    #[test]
    fn decoder_splits_multiple_lines_in_one_read() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"first\nsecond\nthird");
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(decoder.push(b"\n"), vec!["third".to_string()]);
    }

    #[test]
    fn decoder_strips_carriage_returns() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"line\r\n"), vec!["line".to_string()]);
    }

    #[test]
    fn parse_pipe_name_requires_value() {
        let ok = vec!["plugin".to_string(), "--pipe-name".to_string(), "p1".to_string()];
        assert_eq!(parse_pipe_name(&ok).unwrap(), "p1");

        let missing = vec!["plugin".to_string()];
        assert!(parse_pipe_name(&missing).is_err());

        let blank = vec!["plugin".to_string(), "--pipe-name".to_string(), "  ".to_string()];
        assert!(parse_pipe_name(&blank).is_err());
    }

    #[tokio::test]
    async fn unknown_method_yields_structured_error() {
        let mut dist = StubDistribution::new(None);
        let response = dispatch(request("req-7", "Bogus", None), &mut dist).await;
        assert!(!response.success);
        assert_eq!(response.id, "req-7");
        assert!(response.error.unwrap().contains("Unknown method: Bogus"));
    }

    #[tokio::test]
    async fn implementation_failure_carries_message_and_trace() {
        let mut dist = StubDistribution::failing("token rejected");
        let response = dispatch(
            request("req-1", METHOD_INITIALIZE, None),
            &mut dist,
        )
        .await;
        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.contains("token rejected"));
        // More than the bare message: the captured trace follows it.
        assert!(error.lines().count() > 1);
    }

    #[tokio::test]
    async fn latest_version_result_is_json_encoded() {
        let mut dist = StubDistribution::new(Some("1.4.0"));
        let params = serde_json::to_string("my-api").unwrap();
        let response = dispatch(
            request("1", METHOD_LATEST_VERSION, Some(params)),
            &mut dist,
        )
        .await;
        assert!(response.success);
        assert_eq!(response.result.as_deref(), Some("\"1.4.0\""));
    }

    #[tokio::test]
    async fn latest_version_absent_encodes_null() {
        let mut dist = StubDistribution::new(None);
        let params = serde_json::to_string("my-api").unwrap();
        let response = dispatch(
            request("1", METHOD_LATEST_VERSION, Some(params)),
            &mut dist,
        )
        .await;
        assert!(response.success);
        assert_eq!(response.result.as_deref(), Some("null"));
    }

    #[tokio::test]
    async fn download_dispatches_decoded_params() {
        let dist = StubDistribution::new(None);
        let downloads = dist.downloads.clone();
        let mut dist = dist;

        let params = serde_json::to_string(&DownloadParams {
            service_name: "my-api".into(),
            version: "2.0.0".into(),
            target_path: "/tmp/does-not-matter".into(),
        })
        .unwrap();
        let response = dispatch(
            request("1", METHOD_DOWNLOAD_VERSION, Some(params)),
            &mut dist,
        )
        .await;
        assert!(response.success);
        assert_eq!(downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn serve_answers_each_request_in_order() {
        let (mut client, server) = tokio::io::duplex(256);
        let dist = StubDistribution::new(Some("3.1.0"));
        let server_task = tokio::spawn(serve(server, dist));

        let params = serde_json::to_string("svc").unwrap();
        let one = serde_json::to_string(&request("a", METHOD_LATEST_VERSION, Some(params.clone())))
            .unwrap();
        let two = serde_json::to_string(&request("b", METHOD_LATEST_VERSION, Some(params))).unwrap();

        // Two requests in one physical write still get two responses.
        client
            .write_all(format!("{one}\n{two}\n").as_bytes())
            .await
            .unwrap();

        let mut decoder = LineDecoder::new();
        let mut responses: Vec<RpcResponse> = Vec::new();
        let mut buf = [0u8; 256];
        while responses.len() < 2 {
            let n = client.read(&mut buf).await.unwrap();
            assert!(n > 0, "host closed before responding");
            for line in decoder.push(&buf[..n]) {
                responses.push(serde_json::from_str(&line).unwrap());
            }
        }

        assert_eq!(responses[0].id, "a");
        assert_eq!(responses[1].id, "b");
        assert!(responses.iter().all(|r| r.success));

        // Closing our end terminates the loop cleanly.
        drop(client);
        server_task.await.unwrap().unwrap();
    }
}
