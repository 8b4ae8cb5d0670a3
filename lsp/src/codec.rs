//! `Content-Length` framing.
//!
//! A frame is `Content-Length: N\r\n[other headers]\r\n` followed by exactly
//! `N` bytes of JSON. The relay moves frames without reparsing them, so the
//! byte-level API ([`FrameReader::read_raw`], [`FrameWriter::write_raw`]) is
//! the primary one and the JSON helpers sit on top.

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Largest body accepted from either side (16 MiB). Workspace symbol
/// responses from a large index get big.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

pub struct FrameReader<R> {
    reader: BufReader<R>,
    header: String,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            header: String::new(),
        }
    }

    /// Next frame body, or `None` on a clean EOF between frames.
    pub async fn read_raw(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(len) = self.read_content_length().await? else {
            return Ok(None);
        };
        if len > MAX_FRAME_BYTES {
            bail!("Content-Length {len} exceeds maximum {MAX_FRAME_BYTES}");
        }

        let mut body = vec![0u8; len];
        self.reader
            .read_exact(&mut body)
            .await
            .context("reading frame body")?;
        Ok(Some(body))
    }

    /// Next frame decoded as JSON.
    pub async fn read_frame(&mut self) -> Result<Option<serde_json::Value>> {
        match self.read_raw().await? {
            Some(body) => Ok(Some(
                serde_json::from_slice(&body).context("parsing JSON-RPC frame")?,
            )),
            None => Ok(None),
        }
    }

    async fn read_content_length(&mut self) -> Result<Option<usize>> {
        let mut content_length = None;
        let mut first_line = true;

        loop {
            self.header.clear();
            let n = self
                .reader
                .read_line(&mut self.header)
                .await
                .context("reading header line")?;

            if n == 0 {
                if first_line {
                    return Ok(None);
                }
                bail!("unexpected EOF while reading headers");
            }
            first_line = false;

            let line = self.header.trim();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.trim().eq_ignore_ascii_case("content-length")
            {
                content_length = Some(
                    value
                        .trim()
                        .parse::<usize>()
                        .context("invalid Content-Length value")?,
                );
            }
        }

        content_length
            .map(Some)
            .context("missing Content-Length header")
    }
}

pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write `body` as one frame and flush.
    pub async fn write_raw(&mut self, body: &[u8]) -> Result<()> {
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.writer
            .write_all(header.as_bytes())
            .await
            .context("writing frame header")?;
        self.writer
            .write_all(body)
            .await
            .context("writing frame body")?;
        self.writer.flush().await.context("flushing frame")
    }

    pub async fn write_frame(&mut self, msg: &serde_json::Value) -> Result<()> {
        let body = serde_json::to_vec(msg).context("serializing JSON-RPC frame")?;
        self.write_raw(&body).await
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await.context("closing frame writer")
    }
}
