//! # Arcforge Engine
//!
//! Headless driver for the Arcforge world.
//!
//! This crate ties together:
//! - Engine configuration loaded from TOML
//! - The observer's game state
//! - A fixed-step frame loop over the streamed world

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod app;
pub mod config;
pub mod context;

pub use app::{App, RunSummary};
pub use config::{EngineConfig, CONFIG_FILE, DEFAULT_LOG_FILTER};
pub use context::GameContext;
