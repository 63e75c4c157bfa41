use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reflex_runner::{init_logging, ReflexConfig, Runtime, Scene};
use tracing::info;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enables debug mode
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scene and print its watched values
    Run {
        scene: PathBuf,

        /// Maximum number of steps (defaults to runtime.max_steps)
        #[arg(long)]
        steps: Option<u32>,

        /// Pace steps at runtime.tick_interval_ms instead of running flat out
        #[arg(long)]
        realtime: bool,
    },
    /// Load a scene and initialise its handlers without running it
    Check { scene: PathBuf },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ReflexConfig::load_from(path)?,
        None => ReflexConfig::load()?,
    };

    let filter = match cli.debug {
        0 => config.logging.filter.clone(),
        1 => Some("debug".to_string()),
        _ => Some("trace".to_string()),
    };
    let component = match cli.command {
        Commands::Run { .. } => "run",
        Commands::Check { .. } => "check",
    };
    let _guard = init_logging(component, config.logging.file, filter.as_deref())?;

    match cli.command {
        Commands::Run {
            scene,
            steps,
            realtime,
        } => run(&scene, steps, realtime, &config).await,
        Commands::Check { scene } => check(&scene, &config),
    }
}

fn load(path: &Path, config: &ReflexConfig) -> Result<Runtime> {
    let scene =
        Scene::load(path).with_context(|| format!("Failed to load scene {}", path.display()))?;
    let runtime = Runtime::from_scene(&scene, config.runtime.clone())
        .with_context(|| format!("Invalid scene {}", path.display()))?;
    Ok(runtime)
}

async fn run(path: &Path, steps: Option<u32>, realtime: bool, config: &ReflexConfig) -> Result<()> {
    let mut runtime = load(path, config)?;
    let max_steps = steps.unwrap_or(config.runtime.max_steps);

    let ran = if realtime {
        let mut interval = tokio::time::interval(config.runtime.tick_interval());
        let mut ran = 0;
        while ran < max_steps && !runtime.is_idle() {
            interval.tick().await;
            runtime.step();
            ran += 1;
        }
        ran
    } else {
        runtime.run(max_steps)
    };
    info!("Ran {} step(s)", ran);

    for (label, value) in runtime.watches() {
        let value = value.map_or_else(|| "null".to_string(), |v| v.to_string());
        println!("{} = {}", label, value);
    }
    Ok(())
}

fn check(path: &Path, config: &ReflexConfig) -> Result<()> {
    let mut runtime = load(path, config)?;
    println!("{}", runtime.execute("handlers"));
    println!("{} handler(s) ok", runtime.handlers().len());
    Ok(())
}
