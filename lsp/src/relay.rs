//! Frame pump between the editor and the server.
//!
//! Bytes are forwarded frame by frame without reserializing. The relay ends
//! as soon as either direction reaches EOF or fails, or when cancelled.

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::codec::{FrameReader, FrameWriter};
use crate::protocol::FrameKind;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// The editor closed its side (normally after `exit`).
    EditorClosed,
    ServerClosed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub end: RelayEnd,
    pub to_server: u64,
    pub to_editor: u64,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    ToServer,
    ToEditor,
}

impl Direction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::ToServer => "editor -> server",
            Self::ToEditor => "server -> editor",
        }
    }
}

async fn pump<R, W>(from: R, to: W, direction: Direction, count: &mut u64) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = FrameReader::new(from);
    let mut writer = FrameWriter::new(to);
    while let Some(body) = reader
        .read_raw()
        .await
        .with_context(|| format!("reading {}", direction.as_str()))?
    {
        tracing::debug!(direction = direction.as_str(), frame = %FrameKind::of(&body), bytes = body.len(), "Relayed frame");
        writer
            .write_raw(&body)
            .await
            .with_context(|| format!("writing {}", direction.as_str()))?;
        *count += 1;
    }
    Ok(())
}

/// Pump frames until one side closes. Consumes the transport; a child
/// process behind it is killed once the relay is over.
pub async fn relay<I, O>(
    editor_in: I,
    editor_out: O,
    transport: Transport,
    cancel: &CancellationToken,
) -> Result<RelayReport>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let label = transport.label().to_string();
    let (server_out, server_in, child) = transport.into_parts();
    let mut to_server = 0;
    let mut to_editor = 0;

    let end = tokio::select! {
        result = pump(editor_in, server_in, Direction::ToServer, &mut to_server) => {
            result?;
            RelayEnd::EditorClosed
        }
        result = pump(server_out, editor_out, Direction::ToEditor, &mut to_editor) => {
            result?;
            RelayEnd::ServerClosed
        }
        () = cancel.cancelled() => RelayEnd::Cancelled,
    };

    if let Some(mut child) = child {
        if let Err(e) = child.start_kill() {
            tracing::debug!(error = %e, "Attached process already gone");
        }
        if let Err(e) = child.wait().await {
            tracing::debug!(error = %e, "Failed to reap attached process");
        }
    }

    tracing::info!(server = %label, ?end, to_server, to_editor, "Relay finished");
    Ok(RelayReport {
        end,
        to_server,
        to_editor,
    })
}
