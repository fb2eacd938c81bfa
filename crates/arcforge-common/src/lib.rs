//! # Arcforge Common
//!
//! Common types, utilities, and shared abstractions for Arcforge.
//!
//! This crate provides foundational types used across all Arcforge crates:
//! - Coordinate types (tile, chunk) and the tile grid
//! - Scene handle types (visuals, colliders, entities)
//! - Version information for content schemas
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_coords_conversion() {
        let tile = TileCoord::new(100, 200);
        let chunk = tile.to_chunk_coord(32);

        assert_eq!(chunk, ChunkCoord::new(3, 6));
        assert_eq!(chunk.origin_tile(32), TileCoord::new(96, 192));
    }

    #[test]
    fn test_handles_are_distinct_types() {
        let visual = VisualHandle::from_raw(7);
        let entity = EntityHandle::from_raw(7);
        assert_eq!(visual.raw(), entity.raw());
        assert_eq!(entity.to_string(), "entity#7");
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        // Same major version reads either way
        assert!(v2.can_read(&v1));
        assert!(v1.can_read(&v2));
        // Different major versions are incompatible
        assert!(!v1.can_read(&v3));
        assert!(!SchemaVersion::CONTENT_TABLES.can_read(&v3));
    }

    #[test]
    fn test_error_display() {
        let err: ArcforgeError = WorldError::UnknownBiome("swamp".into()).into();
        assert_eq!(err.to_string(), "World error: Unknown biome: swamp");

        let err: ArcforgeError = WorldError::OutOfBounds { x: -1, y: 300 }.into();
        assert_eq!(err.to_string(), "World error: Tile out of bounds at (-1, 300)");
    }
}
