//! JSON-RPC envelope types.
//!
//! Only enough of the protocol to open our own short session and to name
//! relayed frames in the log. Payloads are opaque.

use serde::{Deserialize, Serialize};

/// Asks the server to rebuild its index for every mounted project.
pub const REINDEX_METHOD: &str = "workspace/reindex";
pub const INITIALIZE_METHOD: &str = "initialize";
pub const INITIALIZED_METHOD: &str = "initialized";

#[derive(Debug, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    #[must_use]
    pub fn new(method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: serde_json::Value,
}

impl Request {
    #[must_use]
    pub fn new(id: u64, method: &'static str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    id: Option<serde_json::Value>,
}

/// What a relayed frame is, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Request { method: String, id: String },
    Notification { method: String },
    Response { id: String },
    Unknown,
}

impl FrameKind {
    #[must_use]
    pub fn of(body: &[u8]) -> Self {
        let Ok(envelope) = serde_json::from_slice::<Envelope>(body) else {
            return Self::Unknown;
        };
        match (envelope.method, envelope.id) {
            (Some(method), Some(id)) => Self::Request {
                method,
                id: id.to_string(),
            },
            (Some(method), None) => Self::Notification { method },
            (None, Some(id)) => Self::Response { id: id.to_string() },
            (None, None) => Self::Unknown,
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request { method, id } => write!(f, "request {method} #{id}"),
            Self::Notification { method } => write!(f, "notification {method}"),
            Self::Response { id } => write!(f, "response #{id}"),
            Self::Unknown => f.write_str("unrecognized frame"),
        }
    }
}
