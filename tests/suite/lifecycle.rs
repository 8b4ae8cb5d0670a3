//! Activation against a scripted runtime, end to end.

use std::sync::Arc;

use ers_core::{ActivationError, LifecycleState, Orchestrator};
use ers_runtime::testing::{FakeResponse, FakeRuntime};
use ers_runtime::{LaunchOutcome, PullOutcome, Readiness, Remediation};
use ers_types::TransportMode;

use crate::common::{
    CONTAINER, IMAGE, RecordingNotifier, VOLUME, container_absent_then_running, listener,
    server_config, strings,
};

fn orchestrator(fake: &Arc<FakeRuntime>, notifier: &Arc<RecordingNotifier>) -> Orchestrator {
    Orchestrator::new(fake.clone(), notifier.clone())
}

#[tokio::test]
async fn first_activation_pulls_creates_launches_probes_connects() {
    let (listener, port) = listener().await;
    let fake = Arc::new(FakeRuntime::new());
    container_absent_then_running(&fake);
    let notifier = Arc::new(RecordingNotifier::default());
    let orch = orchestrator(&fake, &notifier);

    let activation = orch
        .activate(&server_config(&["/home/u/app"], port))
        .await
        .unwrap();
    let (_socket, _) = listener.accept().await.unwrap();

    let p = port.to_string();
    let published = format!("{p}:{p}");
    let server_port = format!("SERVER_PORT={p}");
    let volume = format!("{VOLUME}:/usr/share/elasticsearch/data");
    assert_eq!(
        fake.calls(),
        vec![
            strings(&["pull", IMAGE]),
            strings(&["volume", "create", VOLUME]),
            strings(&["container", "top", CONTAINER]),
            strings(&[
                "run",
                "-d",
                "--rm",
                "--name",
                CONTAINER,
                "--ulimit",
                "memlock=-1:-1",
                "-v",
                &volume,
                "-p",
                &published,
                "-e",
                &server_port,
                "-e",
                "LOG_LEVEL=INFO",
                "-e",
                "HOST_PROJECT_ROOTS=/home/u/app",
                "--mount",
                "type=bind,source=/home/u/app,target=/projects/app,readonly",
                IMAGE,
            ]),
            strings(&["container", "top", CONTAINER]),
        ]
    );

    assert_eq!(activation.pull, PullOutcome::Pulled { attempts: 1 });
    assert_eq!(activation.launch, LaunchOutcome::Launched);
    assert_eq!(activation.readiness, Some(Readiness::Ready));
    assert_eq!(
        orch.history(),
        [
            LifecycleState::Idle,
            LifecycleState::Pulling,
            LifecycleState::VolumeReady,
            LifecycleState::Launching,
            LifecycleState::Probing,
            LifecycleState::Connected,
            LifecycleState::Active,
        ]
    );
    assert_eq!(notifier.prompt_count(), 0);
}

#[tokio::test]
async fn running_container_is_reused() {
    let (_listener, port) = listener().await;
    let fake = Arc::new(FakeRuntime::new());
    fake.always("container top", FakeResponse::Ok("PID USER\n1 root".to_string()));
    let notifier = Arc::new(RecordingNotifier::default());
    let orch = orchestrator(&fake, &notifier);

    let activation = orch
        .activate(&server_config(&["/home/u/app"], port))
        .await
        .unwrap();

    assert_eq!(fake.keys(), ["pull", "volume create", "container top"]);
    assert_eq!(fake.count("run"), 0);
    assert_eq!(activation.launch, LaunchOutcome::AlreadyRunning);
    assert_eq!(orch.state(), LifecycleState::Active);
}

#[tokio::test]
async fn second_activation_finds_the_first_container() {
    let (_listener, port) = listener().await;
    let fake = Arc::new(FakeRuntime::new());
    container_absent_then_running(&fake);
    let notifier = Arc::new(RecordingNotifier::default());
    let config = server_config(&["/home/u/app"], port);

    let first = orchestrator(&fake, &notifier).activate(&config).await.unwrap();
    let second = orchestrator(&fake, &notifier).activate(&config).await.unwrap();

    assert_eq!(first.launch, LaunchOutcome::Launched);
    assert_eq!(second.launch, LaunchOutcome::AlreadyRunning);
    assert_eq!(fake.count("run"), 1);
    assert_eq!(fake.count("volume create"), 2);
}

#[tokio::test]
async fn missing_runtime_prompts_once_and_stops() {
    let fake = Arc::new(FakeRuntime::new());
    fake.always("pull", FakeResponse::Missing);
    let notifier = Arc::new(RecordingNotifier::default());
    let orch = orchestrator(&fake, &notifier);

    let err = orch
        .activate(&server_config(&["/home/u/app"], 1))
        .await
        .unwrap_err();

    assert!(matches!(err, ActivationError::ToolMissing { ref binary } if binary == "docker"));
    assert_eq!(fake.keys(), ["pull"]);
    let prompts = notifier.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].0.contains("docker"), "{prompts:?}");
    assert_eq!(prompts[0].1, Remediation::OpenSettings);
    assert_eq!(orch.state(), LifecycleState::Failed);
}

#[tokio::test]
async fn unreachable_registry_falls_back_to_local_image() {
    let (_listener, port) = listener().await;
    let fake = Arc::new(FakeRuntime::new());
    fake.always("pull", FakeResponse::fail(1, "pull access denied"));
    let notifier = Arc::new(RecordingNotifier::default());
    let orch = orchestrator(&fake, &notifier);

    let activation = orch
        .activate(&server_config(&["/home/u/app"], port))
        .await
        .unwrap();

    assert_eq!(activation.pull.attempts(), Some(10));
    assert_eq!(fake.count("pull"), 10);
    assert_eq!(notifier.warning_count(), 10);
    assert_eq!(orch.state(), LifecycleState::Active);
}

#[tokio::test]
async fn root_without_final_segment_spawns_nothing() {
    let fake = Arc::new(FakeRuntime::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let orch = orchestrator(&fake, &notifier);

    let err = orch
        .activate(&server_config(&["/home/u/app", "/"], 1))
        .await
        .unwrap_err();

    assert!(matches!(err, ActivationError::MountPathInvalid(_)));
    assert!(fake.calls().is_empty());
    assert_eq!(notifier.prompt_count(), 1);
}

#[tokio::test]
async fn teardown_stops_the_named_container() {
    let (_listener, port) = listener().await;
    let fake = Arc::new(FakeRuntime::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let orch = orchestrator(&fake, &notifier);
    let mut states = orch.subscribe();

    let activation = orch
        .activate(&server_config(&["/home/u/app"], port))
        .await
        .unwrap();
    assert_eq!(*states.borrow_and_update(), LifecycleState::Active);

    activation.teardown.stop().await;
    assert_eq!(fake.calls().last().unwrap(), &strings(&["stop", CONTAINER]));
    assert_eq!(orch.state(), LifecycleState::Stopped);
    assert!(states.has_changed().unwrap());
}

#[tokio::test]
async fn attach_mode_launches_in_the_foreground() {
    let fake = Arc::new(FakeRuntime::new().with_binary("ers-no-such-runtime"));
    container_absent_then_running(&fake);
    let notifier = Arc::new(RecordingNotifier::default());
    let orch = orchestrator(&fake, &notifier);
    let config =
        server_config(&["/home/u/app"], 8341).with_transport(TransportMode::Attach);

    let err = orch.activate(&config).await.unwrap_err();

    // Nothing detached is started; the runtime itself would be the server.
    assert_eq!(fake.keys(), ["pull", "volume create", "container top"]);
    assert!(matches!(err, ActivationError::ConnectFailed(_)));
    assert!(orch.history().contains(&LifecycleState::Probing));
}
