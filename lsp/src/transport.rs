//! Duplex byte stream to the language server.

use std::fmt;
use std::io;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Where the server's stream lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Published container port.
    Tcp { host: String, port: u16 },
    /// A process whose stdin/stdout are the stream, e.g.
    /// `docker container attach <name>`.
    Process { program: String, args: Vec<String> },
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(f, "{host}:{port}"),
            Self::Process { program, args } => {
                f.write_str(program)?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("cannot connect to language server at {addr}: {source}")]
    Tcp {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} executable not found")]
    ToolMissing { program: String },
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} started without a {stream} pipe")]
    MissingPipe {
        program: String,
        stream: &'static str,
    },
}

/// An open connection to the server. Consumed whole by the relay.
pub struct Transport {
    reader: BoxedReader,
    writer: BoxedWriter,
    child: Option<Child>,
    label: String,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("label", &self.label)
            .field("child", &self.child.as_ref().and_then(Child::id))
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn from_parts(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
        label: impl Into<String>,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            child: None,
            label: label.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the stream is backed by a child process we own.
    #[must_use]
    pub fn has_child(&self) -> bool {
        self.child.is_some()
    }

    #[must_use]
    pub fn into_parts(self) -> (BoxedReader, BoxedWriter, Option<Child>) {
        (self.reader, self.writer, self.child)
    }
}

/// Open the stream. One attempt, no retries: readiness was the prober's job.
pub async fn connect(endpoint: &Endpoint) -> Result<Transport, ConnectError> {
    match endpoint {
        Endpoint::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))
                .await
                .map_err(|source| ConnectError::Tcp {
                    addr: endpoint.to_string(),
                    source,
                })?;
            // Frames are flushed whole; no point in batching.
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(error = %e, "Could not set TCP_NODELAY");
            }
            let (reader, writer) = stream.into_split();
            tracing::info!(addr = %endpoint, "Connected to language server");
            Ok(Transport::from_parts(reader, writer, endpoint.to_string()))
        }
        Endpoint::Process { program, args } => spawn(program, args, endpoint).await,
    }
}

async fn spawn(
    program: &str,
    args: &[String],
    endpoint: &Endpoint,
) -> Result<Transport, ConnectError> {
    let resolved = which::which(program).map_err(|_| ConnectError::ToolMissing {
        program: program.to_string(),
    })?;

    let mut child = Command::new(&resolved)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        // Server logs end up wherever our own stderr goes.
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ConnectError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let stdout = child.stdout.take().ok_or_else(|| ConnectError::MissingPipe {
        program: program.to_string(),
        stream: "stdout",
    })?;
    let stdin = child.stdin.take().ok_or_else(|| ConnectError::MissingPipe {
        program: program.to_string(),
        stream: "stdin",
    })?;

    tracing::info!(command = %endpoint, pid = child.id(), "Attached to language server process");
    Ok(Transport {
        reader: Box::new(stdout),
        writer: Box::new(stdin),
        child: Some(child),
        label: endpoint.to_string(),
    })
}
