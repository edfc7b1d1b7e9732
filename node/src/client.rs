//! # Minimal RPC Client
//!
//! HTTP client for the `tx` and `block` CLI subcommands. A single POST to
//! `/rpc` with `Connection: close` is all the protocol needs, so this is
//! raw HTTP/1.1 over a `TcpStream` rather than a full client dependency.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Serialize)]
struct RequestBody<'a> {
    method: &'a str,
    params: &'a Value,
}

#[derive(Deserialize)]
struct ResponseBody {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Calls one RPC method on the node at `addr` and returns its `result`.
///
/// A populated `error` field in the response envelope — whatever the HTTP
/// status — becomes an `Err`, so callers only ever see usable results.
pub async fn call(addr: &str, method: &str, params: Value) -> Result<Value> {
    let body = serde_json::to_vec(&RequestBody {
        method,
        params: &params,
    })
    .context("failed to encode RPC request")?;

    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;

    let head = format!(
        "POST /rpc HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        body.len(),
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;

    // Connection: close — the server ends the stream after its response.
    let mut raw = Vec::new();
    stream
        .read_to_end(&mut raw)
        .await
        .context("failed to read RPC response")?;
    let response = String::from_utf8_lossy(&raw);

    // Everything after the first blank line is the body.
    let payload = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or(&response);

    let decoded: ResponseBody = serde_json::from_str(payload.trim())
        .context("failed to decode RPC response")?;

    if let Some(error) = decoded.error {
        if !error.is_empty() {
            bail!("{error}");
        }
    }

    Ok(decoded.result)
}
