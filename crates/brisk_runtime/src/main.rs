//! Brisk Engine Runtime
//!
//! Boots services from a settings file and runs the frame loop.
//!
//! Usage: `brisk [settings.json]` (defaults to `brisk.json`)

mod game;
mod renderer;

use anyhow::{Context, Result};
use brisk_services::{Services, Settings};
use game::Game;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_SETTINGS: &str = "brisk.json";
const DEFAULT_LOG_LEVEL: &str = "info";

/// `RUST_LOG` directives replace the default level entirely. Without usable
/// directives the level is `info`.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

fn main() -> Result<()> {
    // Initialize logging
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();

    tracing::info!("Brisk Engine v{}", brisk_core::VERSION);

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS));
    let settings = Settings::load(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;

    tracing::info!("Initializing services...");
    let services = Services::new(settings);

    let mut game = Game::new(services)?;
    game.run();

    tracing::info!(
        ticks = game.ticks(),
        frames = game.renderer().frames(),
        "Runtime shut down"
    );
    Ok(())
}
