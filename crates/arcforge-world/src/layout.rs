//! Hand-authored world layout: village, paths, landmark regions.
//!
//! The layout is static content. Together with the world seed it fully
//! determines the biome of every tile.

use arcforge_common::{ChunkCoord, TileCoord};
use serde::{Deserialize, Serialize};

use crate::biome::Biome;

/// Half-open rectangle of tiles: `min` inclusive, `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    /// Inclusive minimum X
    pub min_x: i32,
    /// Inclusive minimum Y
    pub min_y: i32,
    /// Exclusive maximum X
    pub max_x: i32,
    /// Exclusive maximum Y
    pub max_y: i32,
}

impl TileRect {
    /// Creates a rectangle from its bounds.
    #[must_use]
    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Checks whether the tile lies inside.
    #[must_use]
    pub const fn contains(&self, tile: TileCoord) -> bool {
        tile.x >= self.min_x && tile.x < self.max_x && tile.y >= self.min_y && tile.y < self.max_y
    }
}

/// A straight path between two tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Start tile
    pub start: TileCoord,
    /// End tile
    pub end: TileCoord,
}

impl PathSegment {
    /// Creates a path segment.
    #[must_use]
    pub const fn new(start: TileCoord, end: TileCoord) -> Self {
        Self { start, end }
    }

    /// Distance from the tile to the closest point of the segment.
    ///
    /// The projection parameter is clamped to `[0, 1]` so the ends are round.
    #[must_use]
    pub fn distance_to(&self, tile: TileCoord) -> f64 {
        let (ax, ay) = (f64::from(self.start.x), f64::from(self.start.y));
        let (bx, by) = (f64::from(self.end.x), f64::from(self.end.y));
        let (px, py) = (f64::from(tile.x), f64::from(tile.y));

        let (dx, dy) = (bx - ax, by - ay);
        let len_sq = dx * dx + dy * dy;
        if len_sq == 0.0 {
            return (px - ax).hypot(py - ay);
        }

        let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
        let (cx, cy) = (ax + t * dx, ay + t * dy);
        (px - cx).hypot(py - cy)
    }
}

/// A named rectangular landmark region with its biome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Display name
    pub name: String,
    /// Biome assigned to tiles inside
    pub biome: Biome,
    /// Covered tiles
    pub rect: TileRect,
}

impl Region {
    /// Creates a region.
    #[must_use]
    pub fn new(name: impl Into<String>, biome: Biome, rect: TileRect) -> Self {
        Self {
            name: name.into(),
            biome,
            rect,
        }
    }
}

/// Parameters of the pond/river water overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterNoise {
    /// Fractal octaves
    pub octaves: u32,
    /// Amplitude decay per octave
    pub persistence: f64,
    /// Seed offset
    pub salt: u32,
    /// Tiles whose noise falls below this become water
    pub threshold: f64,
}

impl Default for WaterNoise {
    fn default() -> Self {
        Self {
            octaves: 3,
            persistence: 0.5,
            salt: 4000,
            threshold: 0.3,
        }
    }
}

/// Static world layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldLayout {
    /// World width in tiles
    pub width: i32,
    /// World height in tiles
    pub height: i32,
    /// Village centre tile
    pub village_center: TileCoord,
    /// Radius of the village proper
    pub village_radius: f64,
    /// Outer radius of the outskirts band around the village
    pub outskirts_radius: f64,
    /// Chunks whose centre is closer than this never spawn mobs
    pub safe_radius: f64,
    /// Maximum distance from a path centre line that still counts as road
    pub path_half_width: f64,
    /// Width of the water band framing the world
    pub edge_band: i32,
    /// Authored paths
    pub paths: Vec<PathSegment>,
    /// Authored regions, first match wins
    pub regions: Vec<Region>,
    /// Pond/river overlay
    pub water: WaterNoise,
}

impl WorldLayout {
    /// The shipped Arcforge layout.
    #[must_use]
    pub fn arcforge() -> Self {
        let village = TileCoord::new(128, 128);
        let path_to = |x, y| PathSegment::new(village, TileCoord::new(x, y));

        Self {
            width: 256,
            height: 256,
            village_center: village,
            village_radius: 14.0,
            outskirts_radius: 22.0,
            safe_radius: 15.0,
            path_half_width: 1.5,
            edge_band: 6,
            paths: vec![
                path_to(128, 44),
                path_to(70, 70),
                path_to(180, 82),
                path_to(200, 122),
                path_to(182, 178),
                path_to(130, 200),
                path_to(78, 128),
            ],
            regions: vec![
                Region::new("Castle", Biome::Castle, TileRect::new(104, 12, 152, 44)),
                Region::new("Cemetery", Biome::Cemetery, TileRect::new(12, 12, 72, 72)),
                Region::new("Desert", Biome::Desert, TileRect::new(176, 12, 244, 84)),
                Region::new("Forge", Biome::Forge, TileRect::new(196, 100, 244, 144)),
                Region::new("Sewer", Biome::Sewer, TileRect::new(156, 138, 180, 160)),
                Region::new("Cave", Biome::Cave, TileRect::new(180, 176, 244, 244)),
                Region::new("Hideout", Biome::Ruins, TileRect::new(112, 200, 150, 236)),
                Region::new("Western Forest", Biome::Forest, TileRect::new(12, 88, 80, 168)),
                Region::new("Southern Forest", Biome::Forest, TileRect::new(12, 176, 96, 244)),
            ],
            water: WaterNoise::default(),
        }
    }

    /// Checks whether the tile lies inside the world extents.
    #[must_use]
    pub const fn contains(&self, tile: TileCoord) -> bool {
        tile.x >= 0 && tile.x < self.width && tile.y >= 0 && tile.y < self.height
    }

    /// Inclusive chunk bounds covering the world.
    #[must_use]
    pub fn chunk_bounds(&self, chunk_size: u32) -> (ChunkCoord, ChunkCoord) {
        let size = chunk_size as i32;
        let max_x = (self.width + size - 1) / size - 1;
        let max_y = (self.height + size - 1) / size - 1;
        (ChunkCoord::new(0, 0), ChunkCoord::new(max_x, max_y))
    }

    /// Checks whether any tile of the chunk lies inside the world.
    #[must_use]
    pub fn contains_chunk(&self, chunk: ChunkCoord, chunk_size: u32) -> bool {
        let (min, max) = self.chunk_bounds(chunk_size);
        chunk.x >= min.x && chunk.x <= max.x && chunk.y >= min.y && chunk.y <= max.y
    }

    /// Euclidean distance from the tile to the village centre.
    #[must_use]
    pub fn village_distance(&self, tile: TileCoord) -> f64 {
        f64::from(tile.x - self.village_center.x).hypot(f64::from(tile.y - self.village_center.y))
    }

    /// Checks whether the tile is within the path half-width of any path.
    #[must_use]
    pub fn on_path(&self, tile: TileCoord) -> bool {
        self.paths
            .iter()
            .any(|path| path.distance_to(tile) <= self.path_half_width)
    }

    /// Returns the first region containing the tile.
    #[must_use]
    pub fn region_at(&self, tile: TileCoord) -> Option<&Region> {
        self.regions.iter().find(|region| region.rect.contains(tile))
    }

    /// Checks whether the tile lies in the water band framing the world.
    #[must_use]
    pub const fn in_edge_band(&self, tile: TileCoord) -> bool {
        tile.x < self.edge_band
            || tile.y < self.edge_band
            || tile.x >= self.width - self.edge_band
            || tile.y >= self.height - self.edge_band
    }
}

impl Default for WorldLayout {
    fn default() -> Self {
        Self::arcforge()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_is_half_open() {
        let rect = TileRect::new(0, 0, 4, 4);
        assert!(rect.contains(TileCoord::new(0, 0)));
        assert!(rect.contains(TileCoord::new(3, 3)));
        assert!(!rect.contains(TileCoord::new(4, 3)));
        assert!(!rect.contains(TileCoord::new(-1, 0)));
    }

    #[test]
    fn test_segment_distance_clamps_projection() {
        let seg = PathSegment::new(TileCoord::new(0, 0), TileCoord::new(10, 0));
        assert!((seg.distance_to(TileCoord::new(5, 3)) - 3.0).abs() < 1e-9);
        // Past the end the distance is to the endpoint, not the infinite line
        assert!((seg.distance_to(TileCoord::new(13, 4)) - 5.0).abs() < 1e-9);
        assert!((seg.distance_to(TileCoord::new(-3, 0)) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_segment() {
        let seg = PathSegment::new(TileCoord::new(2, 2), TileCoord::new(2, 2));
        assert!((seg.distance_to(TileCoord::new(5, 6)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_world_bounds() {
        let layout = WorldLayout::arcforge();
        assert!(layout.contains(TileCoord::new(0, 0)));
        assert!(layout.contains(TileCoord::new(255, 255)));
        assert!(!layout.contains(TileCoord::new(256, 0)));
        assert!(!layout.contains(TileCoord::new(0, -1)));
    }

    #[test]
    fn test_chunk_bounds_round_up() {
        let layout = WorldLayout::arcforge();
        let (min, max) = layout.chunk_bounds(12);
        assert_eq!(min, ChunkCoord::new(0, 0));
        // 256 / 12 = 21.33, so the last partial chunk is 21
        assert_eq!(max, ChunkCoord::new(21, 21));
        assert!(layout.contains_chunk(ChunkCoord::new(21, 0), 12));
        assert!(!layout.contains_chunk(ChunkCoord::new(22, 0), 12));
        assert!(!layout.contains_chunk(ChunkCoord::new(-1, 5), 12));

        let (_, max) = layout.chunk_bounds(16);
        assert_eq!(max, ChunkCoord::new(15, 15));
    }

    #[test]
    fn test_edge_band() {
        let layout = WorldLayout::arcforge();
        assert!(layout.in_edge_band(TileCoord::new(5, 100)));
        assert!(layout.in_edge_band(TileCoord::new(100, 250)));
        assert!(!layout.in_edge_band(TileCoord::new(6, 100)));
        assert!(!layout.in_edge_band(TileCoord::new(249, 249)));
    }

    #[test]
    fn test_regions_first_match() {
        let layout = WorldLayout::arcforge();
        let region = layout.region_at(TileCoord::new(40, 40));
        assert_eq!(region.map(|r| r.biome), Some(Biome::Cemetery));
        assert!(layout.region_at(TileCoord::new(100, 80)).is_none());
    }

    #[test]
    fn test_layout_toml_round_trip() {
        let layout = WorldLayout::arcforge();
        let text = toml::to_string(&layout).expect("serialize layout");
        let parsed: WorldLayout = toml::from_str(&text).expect("parse layout");
        assert_eq!(parsed, layout);
    }
}
