//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use ers_runtime::testing::{FakeResponse, FakeRuntime};
use ers_runtime::{Notifier, Remediation};
use ers_types::{ContainerName, ImageReference, ServerConfig, Timings, VolumeName};
use tokio::net::TcpListener;

pub const IMAGE: &str = "blinknlights/elastic_ruby_server";
pub const CONTAINER: &str = "elastic-ruby-server";
pub const VOLUME: &str = "erv-abc";

/// Notifier that keeps every notice for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub statuses: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<(String, Remediation)>>,
}

impl RecordingNotifier {
    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn status(&self, message: &str) {
        self.statuses.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn prompt(&self, message: &str, remediation: Remediation) {
        self.prompts
            .lock()
            .unwrap()
            .push((message.to_string(), remediation));
    }
}

/// Config for the default image and container with all waits zeroed.
pub fn server_config(roots: &[&str], port: u16) -> ServerConfig {
    ServerConfig::new(
        ImageReference::new(IMAGE).unwrap(),
        ContainerName::new(CONTAINER).unwrap(),
        VolumeName::new(VOLUME).unwrap(),
        roots.iter().map(PathBuf::from).collect(),
    )
    .unwrap()
    .with_host("127.0.0.1")
    .unwrap()
    .with_port(port)
    .unwrap()
    .with_timings(Timings::immediate())
}

/// A local listener standing in for the server's TCP port.
pub async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// First `container top` finds nothing; later ones see the launched container.
pub fn container_absent_then_running(fake: &FakeRuntime) {
    fake.queue("container top", FakeResponse::fail(1, "No such container"));
}

pub fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| (*p).to_string()).collect()
}

/// One LSP frame as it appears on the wire.
pub fn frame(body: &str) -> Vec<u8> {
    format!("Content-Length: {}\r\n\r\n{body}", body.len()).into_bytes()
}
