//! Biome tags and the tile classifier.

use std::str::FromStr;

use arcforge_common::{TileCoord, WorldError};
use serde::{Deserialize, Serialize};

use crate::layout::WorldLayout;
use crate::noise::{fractal_noise_2d, WorldSeed};

/// Categorical terrain type of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    /// Central safe settlement
    Village,
    /// Authored path between landmarks
    Road,
    /// Open grassland, the default
    Meadow,
    /// Dense woodland
    Forest,
    /// Sand and cacti
    Desert,
    /// Graves and dead trees
    Cemetery,
    /// Damp underground tunnels
    Sewer,
    /// Rocky caverns and mushrooms
    Cave,
    /// Volcanic smithing grounds
    Forge,
    /// Castle grounds
    Castle,
    /// Ponds, rivers and the world border
    Water,
    /// Crumbled hideout
    Ruins,
}

impl Biome {
    /// Returns every biome, in declaration order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Village,
            Self::Road,
            Self::Meadow,
            Self::Forest,
            Self::Desert,
            Self::Cemetery,
            Self::Sewer,
            Self::Cave,
            Self::Forge,
            Self::Castle,
            Self::Water,
            Self::Ruins,
        ]
    }

    /// Returns the lowercase content key of this biome.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Village => "village",
            Self::Road => "road",
            Self::Meadow => "meadow",
            Self::Forest => "forest",
            Self::Desert => "desert",
            Self::Cemetery => "cemetery",
            Self::Sewer => "sewer",
            Self::Cave => "cave",
            Self::Forge => "forge",
            Self::Castle => "castle",
            Self::Water => "water",
            Self::Ruins => "ruins",
        }
    }

    /// Base ground colour (0xRRGGBB).
    #[must_use]
    pub const fn ground_color(self) -> u32 {
        match self {
            Self::Village => 0x008b_7355,
            Self::Road => 0x00a0_8660,
            Self::Meadow => 0x004a_7c3f,
            Self::Forest => 0x002d_5a2d,
            Self::Desert => 0x00d4_a754,
            Self::Cemetery => 0x004a_4a5a,
            Self::Sewer => 0x003d_4a3d,
            Self::Cave => 0x003d_3d4d,
            Self::Forge => 0x005a_3d3d,
            Self::Castle => 0x005d_5d6d,
            Self::Water => 0x0034_98db,
            Self::Ruins => 0x006b_6b7b,
        }
    }

    /// Accent colour used by decorations (0xRRGGBB).
    #[must_use]
    pub const fn accent_color(self) -> u32 {
        match self {
            Self::Village => 0x006b_5335,
            Self::Road => 0x008b_7355,
            Self::Meadow => 0x005a_9c4f,
            Self::Forest => 0x001a_3d1a,
            Self::Desert => 0x00c4_913a,
            Self::Cemetery => 0x003a_3a4a,
            Self::Sewer => 0x002d_3a2d,
            Self::Cave => 0x002d_2d3d,
            Self::Forge => 0x004a_2d2d,
            Self::Castle => 0x004a_4a5a,
            Self::Water => 0x0029_80b9,
            Self::Ruins => 0x004b_4b5b,
        }
    }

    /// Safe zones never receive obstacles and never become water.
    #[must_use]
    pub const fn is_safe_zone(self) -> bool {
        matches!(self, Self::Village | Self::Road | Self::Castle)
    }

    /// Returns true for water tiles.
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Water)
    }
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Biome {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|biome| biome.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| WorldError::UnknownBiome(s.to_string()))
    }
}

/// Maps tiles to biomes.
///
/// Classification is a pure function of the tile, the seed and the layout.
#[derive(Debug, Clone)]
pub struct BiomeClassifier {
    seed: WorldSeed,
    layout: WorldLayout,
}

impl BiomeClassifier {
    /// Creates a classifier for a seed and layout.
    #[must_use]
    pub fn new(seed: WorldSeed, layout: WorldLayout) -> Self {
        Self { seed, layout }
    }

    /// Returns the world seed.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Returns the world layout.
    #[must_use]
    pub const fn layout(&self) -> &WorldLayout {
        &self.layout
    }

    /// Classifies a tile. The caller bounds-checks the tile first.
    #[must_use]
    pub fn classify(&self, tile: TileCoord) -> Biome {
        let biome = self.classify_layout(tile);
        if biome.is_safe_zone() || biome.is_water() {
            return biome;
        }

        let water = &self.layout.water;
        let sample = fractal_noise_2d(
            f64::from(tile.x),
            f64::from(tile.y),
            water.octaves,
            water.persistence,
            self.seed.salted(water.salt),
        );
        if sample < water.threshold {
            Biome::Water
        } else {
            biome
        }
    }

    /// Classifies a tile that must lie inside the world.
    pub fn classify_checked(&self, tile: TileCoord) -> Result<Biome, WorldError> {
        if self.layout.contains(tile) {
            Ok(self.classify(tile))
        } else {
            Err(WorldError::OutOfBounds {
                x: tile.x,
                y: tile.y,
            })
        }
    }

    /// Authored layout pass, before the water overlay.
    fn classify_layout(&self, tile: TileCoord) -> Biome {
        let layout = &self.layout;

        let distance = layout.village_distance(tile);
        if distance < layout.village_radius {
            return Biome::Village;
        }
        if distance < layout.outskirts_radius {
            return if layout.on_path(tile) {
                Biome::Road
            } else {
                Biome::Meadow
            };
        }

        if layout.on_path(tile) {
            return Biome::Road;
        }
        if let Some(region) = layout.region_at(tile) {
            return region.biome;
        }
        if layout.in_edge_band(tile) {
            return Biome::Water;
        }
        Biome::Meadow
    }
}
