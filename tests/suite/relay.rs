//! LSP traffic through an activated connection.

use std::sync::Arc;

use ers_core::Orchestrator;
use ers_lsp::codec::FrameReader;
use ers_lsp::protocol::{FrameKind, REINDEX_METHOD};
use ers_lsp::{RelayEnd, relay};
use ers_runtime::testing::FakeRuntime;
use tokio::io::{AsyncWriteExt, duplex};
use tokio_util::sync::CancellationToken;

use crate::common::{RecordingNotifier, frame, listener, server_config};

const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
const INITIALIZED: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"capabilities":{}}}"#;

#[tokio::test]
async fn editor_and_server_exchange_frames_through_the_relay() {
    let (listener, port) = listener().await;
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut reader = FrameReader::new(read);
        let request = reader.read_raw().await.unwrap().unwrap();
        write.write_all(&frame(INITIALIZED)).await.unwrap();
        // Keep the socket open so the editor side decides when the relay ends.
        (request, reader, write)
    });

    let fake = Arc::new(FakeRuntime::new());
    let orch = Orchestrator::new(fake.clone(), Arc::new(RecordingNotifier::default()));
    let activation = orch
        .activate(&server_config(&["/home/u/app"], port))
        .await
        .unwrap();

    let (mut editor, relay_side) = duplex(64 * 1024);
    let (editor_in, editor_out) = tokio::io::split(relay_side);
    let transport = activation.transport;
    let handle = tokio::spawn(async move {
        relay(editor_in, editor_out, transport, &CancellationToken::new()).await
    });

    editor.write_all(&frame(INITIALIZE)).await.unwrap();
    let mut from_server = FrameReader::new(&mut editor);
    assert_eq!(
        from_server.read_raw().await.unwrap().unwrap(),
        INITIALIZED.as_bytes()
    );
    drop(from_server);
    editor.shutdown().await.unwrap();

    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.end, RelayEnd::EditorClosed);
    assert_eq!((report.to_server, report.to_editor), (1, 1));

    let (request, _reader, _write) = server.await.unwrap();
    assert_eq!(
        FrameKind::of(&request),
        FrameKind::Request {
            method: "initialize".to_string(),
            id: "1".to_string(),
        }
    );

    activation.teardown.stop().await;
    assert_eq!(fake.count("stop"), 1);
}

#[tokio::test]
async fn reindex_reaches_the_active_server() {
    let (listener, port) = listener().await;
    let fake = Arc::new(FakeRuntime::new());
    let orch = Orchestrator::new(fake, Arc::new(RecordingNotifier::default()));
    let _activation = orch
        .activate(&server_config(&["/home/u/app"], port))
        .await
        .unwrap();
    let (_editor_connection, _) = listener.accept().await.unwrap();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut reader = FrameReader::new(read);
        let mut kinds = vec![FrameKind::of(&reader.read_raw().await.unwrap().unwrap())];
        write.write_all(&frame(INITIALIZED)).await.unwrap();
        while let Some(body) = reader.read_raw().await.unwrap() {
            kinds.push(FrameKind::of(&body));
        }
        kinds
    });

    ers_lsp::reindex("127.0.0.1", port).await.unwrap();

    assert_eq!(
        server.await.unwrap(),
        [
            FrameKind::Request {
                method: "initialize".to_string(),
                id: "1".to_string()
            },
            FrameKind::Notification {
                method: "initialized".to_string()
            },
            FrameKind::Notification {
                method: REINDEX_METHOD.to_string()
            },
        ]
    );
}
