//! Engine configuration.
//!
//! World, streaming and run settings. Loaded from and saved to TOML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::filter::Directive;

use arcforge_common::{ArcforgeError, ArcforgeResult};
use arcforge_world::{StreamingConfig, WorldSeed};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "arcforge.toml";

/// Tracing directive used when none is configured or the configured one is invalid.
pub const DEFAULT_LOG_FILTER: &str = "arcforge=info";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === World Settings ===
    /// World seed (None = random)
    pub world_seed: Option<u32>,
    /// Chunk size in tiles
    pub chunk_size: u32,
    /// Render distance in chunks
    pub render_distance: u32,
    /// Tile size in pixels
    pub tile_size: f32,
    /// Content tables file (None = built-in tables)
    pub content_path: Option<PathBuf>,

    // === Mob Settings ===
    /// Spawn attempts per chunk load
    pub max_mobs_per_chunk: u32,
    /// Chance each spawn attempt succeeds (0.0 - 1.0)
    pub mob_spawn_chance: f32,
    /// Seconds before a killed mob is replaced
    pub respawn_delay_secs: u64,

    // === Run Settings ===
    /// Default tracing directive, overridden by RUST_LOG
    pub log_filter: String,
    /// Frames to simulate
    pub frames: u32,
    /// Seconds per frame
    pub frame_dt: f32,
    /// Observer walking speed in pixels per second
    pub observer_speed: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // World
            world_seed: None,
            chunk_size: 12,
            render_distance: 2,
            tile_size: 32.0,
            content_path: None,

            // Mobs
            max_mobs_per_chunk: 3,
            mob_spawn_chance: 0.5,
            respawn_delay_secs: 15,

            // Run
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            frames: 3600,
            frame_dt: 1.0 / 60.0,
            observer_speed: 140.0,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration file's contents.
    pub fn from_toml_str(text: &str) -> ArcforgeResult<Self> {
        toml::from_str(text).map_err(|e| ArcforgeError::Config(e.to_string()))
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse {}: {e}", path.display());
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // World
        self.chunk_size = self.chunk_size.clamp(4, 64);
        self.render_distance = self.render_distance.clamp(1, 8);
        self.tile_size = self.tile_size.clamp(8.0, 128.0);

        // Mobs
        self.max_mobs_per_chunk = self.max_mobs_per_chunk.min(10);
        self.mob_spawn_chance = self.mob_spawn_chance.clamp(0.0, 1.0);
        self.respawn_delay_secs = self.respawn_delay_secs.clamp(1, 600);

        // Run
        if self.log_filter.trim().is_empty() {
            self.log_filter = DEFAULT_LOG_FILTER.to_string();
        } else if let Err(e) = self.log_filter.parse::<Directive>() {
            warn!("Invalid log filter '{}' ({e}), using {DEFAULT_LOG_FILTER}", self.log_filter);
            self.log_filter = DEFAULT_LOG_FILTER.to_string();
        }
        self.frames = self.frames.max(1);
        self.frame_dt = self.frame_dt.clamp(0.001, 0.25);
        self.observer_speed = self.observer_speed.clamp(0.0, 2000.0);
    }

    /// The configured seed, or a random one.
    #[must_use]
    pub fn resolve_seed(&self) -> WorldSeed {
        WorldSeed::new(self.world_seed.unwrap_or_else(|| fastrand::u32(..)))
    }

    /// Frame duration.
    #[must_use]
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f32(self.frame_dt)
    }

    /// Settings for the chunk manager.
    #[must_use]
    pub fn streaming(&self, seed: WorldSeed) -> StreamingConfig {
        StreamingConfig {
            seed,
            chunk_size: self.chunk_size,
            render_distance: self.render_distance,
            tile_size: self.tile_size,
            max_mobs_per_chunk: self.max_mobs_per_chunk,
            mob_spawn_chance: self.mob_spawn_chance,
            respawn_delay: Duration::from_secs(self.respawn_delay_secs),
            ..StreamingConfig::default()
        }
    }
}
