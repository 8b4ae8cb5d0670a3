//! The `ers` executable, for commands that never touch a real runtime.

use std::path::Path;
use std::process::{Command, Output};

fn ers(home: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ers"));
    command
        .args(args)
        .env_clear()
        .env("HOME", home)
        .current_dir(home);
    if let Some(path) = std::env::var_os("PATH") {
        command.env("PATH", path);
    }
    for (name, value) in env {
        command.env(name, value);
    }
    command.output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn args_prints_the_run_command() {
    let home = tempfile::tempdir().unwrap();
    let output = ers(home.path(), &["args", "--root", "/home/u/app"], &[]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "docker run -d --rm --name elastic-ruby-server --ulimit memlock=-1:-1 \
         -v elastic_ruby_server-0.2.0:/usr/share/elasticsearch/data -p 8341:8341 \
         -e SERVER_PORT=8341 -e LOG_LEVEL=INFO -e HOST_PROJECT_ROOTS=/home/u/app \
         --mount type=bind,source=/home/u/app,target=/projects/app,readonly \
         blinknlights/elastic_ruby_server\n"
    );
}

#[test]
fn args_honours_config_file_and_environment() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("ers.toml");
    std::fs::write(&config, "[server]\nport = 9001\n[runtime]\nbinary = \"podman\"\n").unwrap();

    let output = ers(
        home.path(),
        &["--config", config.to_str().unwrap(), "args", "--root", "/srv/shop"],
        &[("ERS_LOG_LEVEL", "debug")],
    );

    assert!(output.status.success(), "{}", stderr(&output));
    let line = stdout(&output);
    assert!(line.starts_with("podman run -d "), "{line}");
    assert!(line.contains(" -p 9001:9001 "), "{line}");
    assert!(line.contains(" -e LOG_LEVEL=DEBUG "), "{line}");
}

#[test]
fn interactive_args_drop_detach_and_publish() {
    let home = tempfile::tempdir().unwrap();
    let output = ers(home.path(), &["args", "--interactive", "--root", "/home/u/app"], &[]);

    assert!(output.status.success(), "{}", stderr(&output));
    let line = stdout(&output);
    assert!(line.starts_with("docker run -i --rm "), "{line}");
    assert!(!line.contains(" -p "), "{line}");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let home = tempfile::tempdir().unwrap();
    let output = ers(home.path(), &["--config", "nope.toml", "args"], &[]);

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("ers: error: Invalid configuration"), "{err}");
    assert!(err.contains("[Open settings: nope.toml]"), "{err}");
}

#[test]
fn bad_environment_value_names_the_variable() {
    let home = tempfile::tempdir().unwrap();
    let output = ers(home.path(), &["args"], &[("ERS_PORT", "eighty")]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("ERS_PORT='eighty'"), "{}", stderr(&output));
}

#[test]
fn root_without_a_name_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let output = ers(home.path(), &["args", "--root", "/"], &[]);

    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("no final path segment"),
        "{}",
        stderr(&output)
    );
}

#[test]
fn reindex_needs_the_tcp_transport() {
    let home = tempfile::tempdir().unwrap();
    let output = ers(home.path(), &["reindex"], &[("ERS_TRANSPORT", "attach")]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("tcp transport"), "{}", stderr(&output));
}

#[test]
fn logs_go_to_a_file_under_home() {
    let home = tempfile::tempdir().unwrap();
    let output = ers(home.path(), &["args"], &[]);

    assert!(output.status.success(), "{}", stderr(&output));
    let log = std::fs::read_to_string(home.path().join(".ers/logs/ers.log")).unwrap();
    assert!(log.contains("Logging to file"), "{log}");
    assert!(!stdout(&output).contains("Logging to file"));
}

#[test]
fn unparsable_log_filter_is_reported_in_the_log() {
    let home = tempfile::tempdir().unwrap();
    let output = ers(home.path(), &["args"], &[("ERS_LOG", "ers=notalevel")]);

    assert!(output.status.success(), "{}", stderr(&output));
    let log = std::fs::read_to_string(home.path().join(".ers/logs/ers.log")).unwrap();
    assert!(log.contains("Ignoring log filter"), "{log}");
}
