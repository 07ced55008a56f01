mod app;
mod cli;
mod demo_scene;

use std::path::PathBuf;

use afterglow_common::{AfterglowError, ConfigError};
use afterglow_config::ReloadManager;
use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoop;

const DEFAULT_DIRECTIVE: &str = "info";

fn config_path(args: &cli::Args) -> Result<PathBuf, ConfigError> {
    match args.config {
        Some(ref path) => Ok(PathBuf::from(path)),
        None => afterglow_config::toml_loader::default_config_path(),
    }
}

/// `--log-level` wins, then `logging.level` from the config file.
fn log_directive(args: &cli::Args, path: Option<&PathBuf>) -> String {
    if let Some(ref level) = args.log_level {
        return level.clone();
    }
    path.and_then(|p| afterglow_config::toml_loader::load_from_path(p).ok())
        .map(|c| c.logging.level.as_directive().to_string())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

fn init_logging(directive: &str) {
    let filter = match directive.parse() {
        Ok(d) => EnvFilter::from_default_env().add_directive(d),
        Err(_) => EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: cli::Args) -> afterglow_common::Result<()> {
    let path = config_path(&args);
    init_logging(&log_directive(&args, path.as_ref().ok()));

    tracing::info!("Afterglow v{} starting...", env!("CARGO_PKG_VERSION"));
    let path = path?;
    if !path.exists() && args.config.is_none() {
        afterglow_config::toml_loader::create_default_config(&path)?;
    }
    tracing::info!(path = %path.display(), "using config");

    // The reload manager's watch loop lives on this runtime.
    let runtime = tokio::runtime::Runtime::new()?;
    let (config, config_rx) = runtime.block_on(ReloadManager::start(path));
    tracing::info!(
        budget = config.temporal.budget,
        msaa = config.render.msaa_samples,
        "config loaded"
    );

    let event_loop = EventLoop::new().map_err(|e| AfterglowError::Window(e.to_string()))?;
    let mut app = app::ViewerApp::new(config, config_rx, runtime, args.width, args.height);

    tracing::info!("Entering event loop");
    event_loop
        .run_app(&mut app)
        .map_err(|e| AfterglowError::Window(e.to_string()))?;
    if let Some(e) = app.take_failure() {
        return Err(e);
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

fn main() {
    let args = cli::parse();
    if let Err(e) = run(args) {
        eprintln!("afterglow: {e}");
        std::process::exit(1);
    }
}
