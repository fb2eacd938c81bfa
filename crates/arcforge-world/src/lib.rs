//! # Arcforge World
//!
//! Chunk-streamed tile world for Arcforge.
//!
//! This crate handles:
//! - Deterministic terrain from a world seed (noise, biomes, obstacles, decorations)
//! - Loading and unloading chunks around a moving observer
//! - Per-chunk resource manifests so unloads never leak scene objects
//! - Mob spawning, behaviour, damage and delayed respawns
//!
//! Rendering and physics stay behind the [`Scene`] trait; [`HeadlessScene`]
//! is an in-memory implementation used by tests and the engine driver.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod biome;
pub mod chunk_manager;
pub mod content;
pub mod headless;
pub mod layout;
pub mod manifest;
pub mod mob;
pub mod noise;
pub mod placement;
pub mod scene;
pub mod schedule;
pub mod spawn;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::biome::*;
    pub use crate::chunk_manager::*;
    pub use crate::content::*;
    pub use crate::headless::*;
    pub use crate::layout::*;
    pub use crate::manifest::*;
    pub use crate::mob::*;
    pub use crate::noise::*;
    pub use crate::placement::*;
    pub use crate::scene::*;
    pub use crate::schedule::*;
    pub use crate::spawn::*;
    pub use crate::world::*;
}

pub use prelude::*;
