//! Thin client for the management control socket (§6). Every `fib`,
//! `face`, `strategy` and `cs` subcommand goes through here rather than
//! touching the forwarder's tables directly — the CLI is a client of a
//! running `ndnfd`, never an alternate way to mutate them in-process.

use anyhow::{Context, Result};
use ndnfd_common::rpc::{ControlRequest, ControlResponse};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Send one request and read back the single-line JSON reply.
pub async fn send(socket_path: &str, request: ControlRequest) -> Result<ControlResponse> {
    let stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("failed to connect to {}", socket_path))?;
    let (reader, mut writer) = stream.into_split();

    let mut line = serde_json::to_string(&request)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;

    let mut lines = BufReader::new(reader).lines();
    let reply = lines
        .next_line()
        .await?
        .context("daemon closed the connection without replying")?;
    serde_json::from_str(&reply).context("malformed response from daemon")
}
