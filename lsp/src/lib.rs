//! Editor-side plumbing for the containerized language server.
//!
//! The editor talks LSP to us over stdio; we hold a [`Transport`] to the
//! server and pump `Content-Length` frames between the two. Nothing here
//! interprets the payloads.

pub mod codec;
pub mod protocol;

mod reindex;
mod relay;
mod transport;

pub use reindex::{HANDSHAKE_TIMEOUT, handshake, reindex, send_reindex};
pub use relay::{RelayEnd, RelayReport, relay};
pub use transport::{BoxedReader, BoxedWriter, ConnectError, Endpoint, Transport, connect};
