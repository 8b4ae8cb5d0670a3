//! ers - editor-facing launcher for the containerized Elastic Ruby Server.
//!
//! Point the editor's Ruby language server command at `ers`. On start it
//! pulls the image, prepares the index volume, launches the server
//! container if it is not already running, then relays LSP traffic between
//! the editor (stdin/stdout) and the server until either side hangs up.
//!
//! ```text
//! main() -> resolve config -> Orchestrator::activate() -> relay() -> Teardown::stop()
//! ```
//!
//! `args`, `reindex` and `stop` are one-shot helpers around the same
//! configuration.

mod logging;
mod notifier;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ers_config::{CliOverrides, EnvOverrides, ErsConfig};
use ers_core::{Activation, Orchestrator};
use ers_runtime::{
    ContainerRuntime, DockerCli, LaunchStyle, Notifier, Remediation, compute_launch_args,
    stop_container,
};
use ers_types::{ServerConfig, TransportMode};
use tokio_util::sync::CancellationToken;

use crate::notifier::StderrNotifier;

#[derive(Parser)]
#[command(name = "ers", version)]
#[command(about = "Run the Elastic Ruby Server in a container and relay LSP to it")]
struct Cli {
    /// Config file to read instead of ~/.ers/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Project root to index; repeat for several (default: working directory)
    #[arg(long = "root", global = true, value_name = "PATH")]
    roots: Vec<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Commands {
    /// Bring the server up and relay LSP over stdio
    #[default]
    Serve,
    /// Print the container run command without running anything
    Args {
        /// Print the foreground (`run -i`) form used by the attach transport
        #[arg(long)]
        interactive: bool,
    },
    /// Ask the running server to reindex the workspace
    ///
    /// Opens a second session on the server's port alongside the editor's,
    /// so the server must accept more than one client.
    Reindex,
    /// Stop the server container
    Stop,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();

    let cli = Cli::parse();
    let settings = cli.config.clone().or_else(ers_config::config_path);
    let notifier: Arc<dyn Notifier> = Arc::new(StderrNotifier::new(settings));

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            notifier.prompt(&format!("Invalid configuration: {e:#}"), Remediation::OpenSettings);
            return Err(e);
        }
    };

    match cli.command.unwrap_or_default() {
        Commands::Serve => serve(config, notifier).await,
        Commands::Args { interactive } => print_args(&config, interactive),
        Commands::Reindex => reindex(&config).await,
        Commands::Stop => {
            stop(&config, notifier.as_ref()).await;
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let file = match &cli.config {
        Some(path) => match ErsConfig::load_from(path)? {
            Some(file) => file,
            None => bail!("config file {} does not exist", path.display()),
        },
        None => ErsConfig::load()?.unwrap_or_default(),
    };
    let env = EnvOverrides::from_env()?;
    let cwd = std::env::current_dir().context("reading working directory")?;
    let overrides = CliOverrides {
        project_roots: cli.roots.clone(),
    };
    Ok(ers_config::resolve(&file, &env, &overrides, &cwd)?)
}

async fn serve(config: ServerConfig, notifier: Arc<dyn Notifier>) -> Result<()> {
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::new(config.runtime_binary()));
    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted");
                cancel.cancel();
            }
        }
    });

    let orchestrator = Orchestrator::new(runtime, notifier).with_cancellation(cancel.clone());
    let Activation {
        transport,
        teardown,
        pull,
        launch,
        readiness,
    } = orchestrator.activate(&config).await?;
    tracing::info!(
        ?pull,
        ?launch,
        ?readiness,
        transport = %transport.label(),
        "Server active"
    );

    let report = ers_lsp::relay(tokio::io::stdin(), tokio::io::stdout(), transport, &cancel).await;
    teardown.stop().await;

    let report = report?;
    tracing::info!(
        end = ?report.end,
        to_server = report.to_server,
        to_editor = report.to_editor,
        "Relay finished"
    );
    Ok(())
}

fn print_args(config: &ServerConfig, interactive: bool) -> Result<()> {
    let style = if interactive {
        LaunchStyle::Interactive
    } else {
        LaunchStyle::Detached
    };
    let args = compute_launch_args(config, style)?;
    println!("{} {}", config.runtime_binary(), args.join(" "));
    Ok(())
}

async fn reindex(config: &ServerConfig) -> Result<()> {
    if config.transport() == TransportMode::Attach {
        bail!("reindex needs the tcp transport; the attach transport has no port to reach");
    }
    ers_lsp::reindex(config.host(), config.port())
        .await
        .with_context(|| format!("reindexing via {}:{}", config.host(), config.port()))
}

async fn stop(config: &ServerConfig, notifier: &dyn Notifier) {
    let runtime = DockerCli::new(config.runtime_binary());
    match stop_container(&runtime, config.container()).await {
        Ok(()) => notifier.status(&format!("Stopped {}", config.container())),
        Err(e) => notifier.warn(&format!("Failed to stop {}: {e}", config.container())),
    }
}
