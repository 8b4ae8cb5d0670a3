//! `workspace/reindex` over a short session of our own.
//!
//! The server is asked on a separate connection, so it must accept more
//! than one client. That connection is initialized like any other before
//! the notification goes out.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::{FrameReader, FrameWriter};
use crate::protocol::{
    INITIALIZE_METHOD, INITIALIZED_METHOD, Notification, REINDEX_METHOD, Request,
};
use crate::transport::{Endpoint, connect};

/// How long the server gets to answer `initialize`.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

const INITIALIZE_ID: u64 = 1;

/// Write a single framed `workspace/reindex` notification.
pub async fn send_reindex<W: AsyncWrite + Unpin>(writer: &mut FrameWriter<W>) -> Result<()> {
    let frame = serde_json::to_value(Notification::new(REINDEX_METHOD, None))
        .context("serializing reindex notification")?;
    writer.write_frame(&frame).await
}

/// `initialize`, wait for its response, then `initialized`.
///
/// Frames the server sends before answering (log messages, progress) are
/// skipped.
pub async fn handshake<R, W>(reader: &mut FrameReader<R>, writer: &mut FrameWriter<W>) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let initialize = Request::new(
        INITIALIZE_ID,
        INITIALIZE_METHOD,
        json!({
            "processId": std::process::id(),
            "rootUri": null,
            "capabilities": {},
        }),
    );
    writer
        .write_frame(&serde_json::to_value(initialize).context("serializing initialize")?)
        .await?;

    loop {
        let Some(frame) = reader.read_frame().await? else {
            bail!("server closed the connection before answering initialize");
        };
        let answers_us = frame.get("method").is_none()
            && frame.get("id").and_then(serde_json::Value::as_u64) == Some(INITIALIZE_ID);
        if !answers_us {
            tracing::debug!(frame = %frame, "Skipping frame before initialize response");
            continue;
        }
        if let Some(error) = frame.get("error") {
            bail!("server rejected initialize: {error}");
        }
        break;
    }

    let initialized = Notification::new(INITIALIZED_METHOD, Some(json!({})));
    writer
        .write_frame(&serde_json::to_value(initialized).context("serializing initialized")?)
        .await
}

/// Open a fresh session with the running server and ask it to reindex.
pub async fn reindex(host: &str, port: u16) -> Result<()> {
    let endpoint = Endpoint::Tcp {
        host: host.to_string(),
        port,
    };
    let transport = connect(&endpoint).await?;
    let (reader, writer, _child) = transport.into_parts();
    let mut reader = FrameReader::new(reader);
    let mut writer = FrameWriter::new(writer);

    tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&mut reader, &mut writer))
        .await
        .with_context(|| format!("{endpoint} did not answer initialize"))??;
    send_reindex(&mut writer).await?;
    writer.shutdown().await?;
    tracing::info!(server = %endpoint, "Requested workspace reindex");
    Ok(())
}
