//! cinder-operator — replay event scripts through the Cinder controller.
//!
//! # Usage
//!
//! ```text
//! cinder-operator replay script.yaml
//! cinder-operator replay script.yaml --runtime local --root /tmp/cinder
//! cinder-operator preview script.yaml
//! ```

mod scenario;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinder_operator_core::infrastructure::local::LocalRuntime;
use cinder_operator_core::infrastructure::mock::MockRuntime;
use cinder_operator_core::service::cinder;
use cinder_operator_core::{ContainerRuntime, Controller};

use scenario::Script;

#[derive(Debug, Parser)]
#[command(name = "cinder-operator", version, about = "Cinder operator reconciliation core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deliver every event of a script and print one JSON pass report per line.
    Replay {
        script: PathBuf,
        #[arg(long, value_enum, default_value_t = RuntimeKind::Mock)]
        runtime: RuntimeKind,
        /// Root directory holding one subdirectory per container.
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Apply a script's events without touching any container and print
    /// the artifacts that would be rendered.
    Preview { script: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RuntimeKind {
    Mock,
    Local,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay { script, runtime, root } => replay(Script::load(&script)?, runtime, root),
        Commands::Preview { script } => preview(Script::load(&script)?),
    }
}

fn replay(script: Script, kind: RuntimeKind, root: Option<PathBuf>) -> Result<()> {
    let mut runtime: Box<dyn ContainerRuntime> = match (kind, root) {
        (RuntimeKind::Mock, None) => Box::new(MockRuntime::new()),
        (RuntimeKind::Mock, Some(_)) => bail!("--root only applies to --runtime local"),
        (RuntimeKind::Local, Some(root)) => Box::new(LocalRuntime::new(root)),
        (RuntimeKind::Local, None) => bail!("--runtime local requires --root"),
    };

    let mut controller = Controller::new(cinder::definition())?;
    for event in script.into_events() {
        let report = controller.handle(event, runtime.as_mut());
        println!("{}", serde_json::to_string(&report)?);
    }
    tracing::info!(status = %controller.status(), "replay finished");
    Ok(())
}

fn preview(script: Script) -> Result<()> {
    let mut controller = Controller::new(cinder::definition())?;
    for event in script.into_events() {
        controller.observe(&event);
    }
    for artifact in controller.preview()? {
        println!("==> {}:{} ({})", artifact.container, artifact.path, artifact.hash);
        print!("{}", artifact.content);
        if !artifact.content.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}
