//! Coordinate types for tiles, chunks, and world-space positions.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Tile coordinate (integer tile units, global).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// X coordinate in tile space
    pub x: i32,
    /// Y coordinate in tile space
    pub y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts to the chunk containing this tile.
    #[must_use]
    pub const fn to_chunk_coord(self, chunk_size: u32) -> ChunkCoord {
        let size = chunk_size as i32;
        ChunkCoord {
            x: self.x.div_euclid(size),
            y: self.y.div_euclid(size),
        }
    }
}

/// Chunk coordinate (identifies a chunk in the world grid).
///
/// This is also the canonical key of a chunk.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the top-left tile of this chunk.
    #[must_use]
    pub const fn origin_tile(self, chunk_size: u32) -> TileCoord {
        let size = chunk_size as i32;
        TileCoord {
            x: self.x * size,
            y: self.y * size,
        }
    }

    /// Returns the tile at the centre of this chunk (rounded down).
    #[must_use]
    pub const fn center_tile(self, chunk_size: u32) -> TileCoord {
        let origin = self.origin_tile(chunk_size);
        let half = (chunk_size / 2) as i32;
        TileCoord {
            x: origin.x + half,
            y: origin.y + half,
        }
    }

    /// Iterates every tile covered by this chunk, row by row.
    pub fn tiles(self, chunk_size: u32) -> impl Iterator<Item = TileCoord> {
        let origin = self.origin_tile(chunk_size);
        let size = chunk_size as i32;
        (0..size).flat_map(move |dy| {
            (0..size).map(move |dx| TileCoord::new(origin.x + dx, origin.y + dy))
        })
    }

    /// Chebyshev distance to another chunk.
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        if dx > dy {
            dx
        } else {
            dy
        }
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Conversion between world-space positions (pixels) and tiles.
///
/// `tile_to_world` returns the tile centre, so the two conversions are
/// inverse for every tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    /// Edge length of one tile in world units.
    pub tile_size: f32,
}

impl TileGrid {
    /// Creates a grid with the given tile size.
    #[must_use]
    pub const fn new(tile_size: f32) -> Self {
        Self { tile_size }
    }

    /// Converts a world-space position to the tile containing it.
    #[must_use]
    pub fn world_to_tile(&self, position: Vec2) -> TileCoord {
        TileCoord::new(
            (position.x / self.tile_size).floor() as i32,
            (position.y / self.tile_size).floor() as i32,
        )
    }

    /// Converts a tile to the world-space position of its centre.
    #[must_use]
    pub fn tile_to_world(&self, tile: TileCoord) -> Vec2 {
        Vec2::new(
            (tile.x as f32 + 0.5) * self.tile_size,
            (tile.y as f32 + 0.5) * self.tile_size,
        )
    }

    /// Converts a world-space position straight to its chunk.
    #[must_use]
    pub fn world_to_chunk(&self, position: Vec2, chunk_size: u32) -> ChunkCoord {
        self.world_to_tile(position).to_chunk_coord(chunk_size)
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new(32.0)
    }
}
