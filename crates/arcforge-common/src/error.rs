//! Error types for Arcforge.

use thiserror::Error;

use crate::ids::EntityHandle;

/// Top-level error type for Arcforge operations.
#[derive(Debug, Error)]
pub enum ArcforgeError {
    /// World/chunk errors
    #[error("World error: {0}")]
    World(#[from] WorldError),

    /// Content table could not be parsed
    #[error("Content error: {0}")]
    Content(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// World, chunk, and entity errors.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Biome name not known to the classifier
    #[error("Unknown biome: {0}")]
    UnknownBiome(String),

    /// Mob kind missing from the content tables
    #[error("Unknown mob kind: {0}")]
    UnknownMob(String),

    /// Entity is not (or no longer) alive
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityHandle),

    /// Tile lies outside the world extents
    #[error("Tile out of bounds at ({x}, {y})")]
    OutOfBounds {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
    },
}

/// Result type alias for Arcforge operations.
pub type ArcforgeResult<T> = Result<T, ArcforgeError>;
