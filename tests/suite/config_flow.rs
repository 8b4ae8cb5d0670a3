//! Config file and environment through to the container command line.

use std::io::Write;
use std::path::{Path, PathBuf};

use ers_config::{
    CliOverrides, ConfigError, ENV_PORT, ENV_VOLUME, EnvOverrides, ErsConfig, resolve,
};
use ers_runtime::{LaunchStyle, compute_launch_args};
use ers_types::{MountPathError, ServerConfigError};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn no_env() -> EnvOverrides {
    EnvOverrides::from_lookup(|_| None).unwrap()
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|pair| pair[0] == flag)
        .map(|pair| pair[1].as_str())
        .collect()
}

#[test]
fn two_root_workspace_from_file() {
    let file = write_config(
        r#"
        [server]
        port = 9000
        log_level = "debug"
        project_roots = ["/home/u/app", "/home/u/lib"]
        extra_packages = ["rails", "rspec"]

        [server.volume]
        strategy = "path-hash"
        "#,
    );
    let file = ErsConfig::load_from(file.path()).unwrap().unwrap();
    let config = resolve(&file, &no_env(), &CliOverrides::default(), Path::new("/")).unwrap();
    let args = compute_launch_args(&config, LaunchStyle::Detached).unwrap();

    assert_eq!(config.volume().as_str(), "erv-73df6d2d66ac");
    assert_eq!(
        value_after(&args, "-v"),
        ["erv-73df6d2d66ac:/usr/share/elasticsearch/data"]
    );
    assert_eq!(value_after(&args, "-p"), ["9000:9000"]);
    assert_eq!(
        value_after(&args, "-e"),
        [
            "SERVER_PORT=9000",
            "LOG_LEVEL=DEBUG",
            "HOST_PROJECT_ROOTS=/home/u/app,/home/u/lib",
            "EXTRA_PACKAGES=rails rspec",
        ]
    );
    assert_eq!(
        value_after(&args, "--mount"),
        [
            "type=bind,source=/home/u/app,target=/projects/app,readonly",
            "type=bind,source=/home/u/lib,target=/projects/lib,readonly",
        ]
    );
    assert_eq!(args.last().unwrap(), "blinknlights/elastic_ruby_server");
}

#[test]
fn environment_overrides_the_file() {
    let file = write_config("[server]\nport = 9000\n[server.volume]\nname = \"from-file\"\n");
    let file = ErsConfig::load_from(file.path()).unwrap().unwrap();
    let env = EnvOverrides::from_lookup(|name| match name {
        ENV_PORT => Some("9100".to_string()),
        ENV_VOLUME => Some("from-env".to_string()),
        _ => None,
    })
    .unwrap();

    let config = resolve(&file, &env, &CliOverrides::default(), Path::new("/w")).unwrap();
    assert_eq!(config.port(), 9100);
    assert_eq!(config.volume().as_str(), "from-env");
}

#[test]
fn working_directory_is_the_default_root() {
    let config = resolve(
        &ErsConfig::default(),
        &no_env(),
        &CliOverrides::default(),
        Path::new("/home/u/app"),
    )
    .unwrap();
    let args = compute_launch_args(&config, LaunchStyle::Interactive).unwrap();

    assert_eq!(config.project_roots(), [PathBuf::from("/home/u/app")]);
    assert_eq!(&args[..2], ["run", "-i"]);
    assert!(value_after(&args, "-p").is_empty());
    assert_eq!(config.volume().as_str(), "elastic_ruby_server-0.2.0");
}

#[test]
fn colliding_root_names_surface_at_launch() {
    let cli = CliOverrides {
        project_roots: vec![PathBuf::from("/a/app"), PathBuf::from("/b/app")],
    };
    let config = resolve(&ErsConfig::default(), &no_env(), &cli, Path::new("/")).unwrap();

    assert!(matches!(
        compute_launch_args(&config, LaunchStyle::Detached),
        Err(MountPathError::DuplicateName { .. })
    ));
}

#[test]
fn invalid_file_values_are_reported() {
    let file = write_config("[server]\nport = 0\n");
    let file = ErsConfig::load_from(file.path()).unwrap().unwrap();
    let err = resolve(&file, &no_env(), &CliOverrides::default(), Path::new("/")).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ServerConfigError::ZeroPort)));

    let broken = write_config("[server\n");
    let err = ErsConfig::load_from(broken.path()).unwrap_err();
    assert_eq!(err.path(), Some(broken.path()));
}
