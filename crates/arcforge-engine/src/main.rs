//! # Arcforge
//!
//! Walks an observer through the streamed world without a renderer.
//!
//! Usage: `arcforge [config.toml]`

use anyhow::Result;
use arcforge_engine::{App, EngineConfig, CONFIG_FILE, DEFAULT_LOG_FILTER};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

/// `RUST_LOG` plus one default directive.
fn env_filter(directive: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env().add_directive(directive.parse()?))
}

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing; the configured filter replaces the default once loaded
    let (filter, filter_handle) = reload::Layer::new(env_filter(DEFAULT_LOG_FILTER)?);
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| CONFIG_FILE.to_string());
    let mut config = EngineConfig::load_from(&config_path);
    config.validate();
    filter_handle.reload(env_filter(&config.log_filter)?)?;

    info!("Arcforge starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {config_path}");

    let mut app = App::new(config)?;
    app.run()?;

    info!("Arcforge shutdown complete");
    Ok(())
}
