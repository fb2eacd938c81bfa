//! Deterministic obstacle and decoration placement.
//!
//! Every decision here is a seeded hash of the tile coordinate. Reloading a
//! chunk reproduces the same obstacles in the same places.

use arcforge_common::TileCoord;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::biome::Biome;
use crate::noise::{fractal_noise_2d, hash, lattice, WorldSeed};
use crate::scene::{Primitive, Style};

/// Size of every obstacle collider.
pub const OBSTACLE_COLLIDER_SIZE: Vec2 = Vec2::new(16.0, 16.0);

/// Collider offset from the obstacle anchor (the base of the object).
pub const OBSTACLE_COLLIDER_OFFSET: Vec2 = Vec2::new(0.0, 4.0);

/// Draw depth of ground tiles.
pub const GROUND_DEPTH: f32 = 0.0;
/// Draw depth of decorations.
pub const DECORATION_DEPTH: f32 = 1.0;
/// Draw depth of obstacles.
pub const OBSTACLE_DEPTH: f32 = 2.0;

// Salts for the per-tile hashes. Multipliers spread rows apart.
const PLACE_ROW: f64 = 2000.0;
const VARIANT_ROW: f64 = 3000.0;
const JITTER_ROW: f64 = 4000.0;
const DECOR_ROW: f64 = 1000.0;
const DECOR_KIND_ROW: f64 = 1500.0;
const CLUSTER_SALT: u32 = 7000;
const GROUND_SALT: u32 = 500;

/// Obstacle density of one biome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityEntry {
    /// Biome
    pub biome: Biome,
    /// Base chance per tile before clustering
    pub density: f64,
}

/// Per-biome obstacle density, loaded as content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DensityTable {
    entries: Vec<DensityEntry>,
}

impl DensityTable {
    /// Creates a table from entries. Later entries win on duplicates.
    #[must_use]
    pub fn new(entries: Vec<DensityEntry>) -> Self {
        Self { entries }
    }

    /// Base density of a biome. Safe zones and water are always zero.
    #[must_use]
    pub fn density(&self, biome: Biome) -> f64 {
        if biome.is_safe_zone() || biome.is_water() {
            return 0.0;
        }
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.biome == biome)
            .map_or(0.0, |entry| entry.density.clamp(0.0, 1.0))
    }

    /// Returns the raw entries.
    #[must_use]
    pub fn entries(&self) -> &[DensityEntry] {
        &self.entries
    }
}

impl Default for DensityTable {
    fn default() -> Self {
        let entry = |biome, density| DensityEntry { biome, density };
        Self::new(vec![
            entry(Biome::Forest, 0.09),
            entry(Biome::Meadow, 0.025),
            entry(Biome::Desert, 0.03),
            entry(Biome::Cemetery, 0.06),
            entry(Biome::Cave, 0.05),
            entry(Biome::Ruins, 0.05),
            entry(Biome::Forge, 0.04),
            entry(Biome::Sewer, 0.03),
        ])
    }
}

/// Obstacle families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    /// Leafy tree
    Tree,
    /// Bare tree
    DeadTree,
    /// Saguaro
    Cactus,
    /// Boulder
    Rock,
    /// Grave marker
    Gravestone,
    /// Giant mushroom
    Mushroom,
    /// Broken masonry
    Rubble,
    /// Cooling lava boulder
    LavaRock,
    /// Rotting barrel
    Barrel,
}

impl ObstacleKind {
    /// Obstacle families that grow in a biome.
    #[must_use]
    pub const fn families(biome: Biome) -> &'static [Self] {
        match biome {
            Biome::Forest => &[Self::Tree, Self::Tree, Self::Rock],
            Biome::Meadow => &[Self::Tree, Self::Rock],
            Biome::Desert => &[Self::Cactus, Self::Cactus, Self::Rock],
            Biome::Cemetery => &[Self::Gravestone, Self::Gravestone, Self::DeadTree],
            Biome::Cave => &[Self::Rock, Self::Mushroom],
            Biome::Ruins => &[Self::Rubble, Self::Rock, Self::DeadTree],
            Biome::Forge => &[Self::LavaRock, Self::Rock],
            Biome::Sewer => &[Self::Barrel, Self::Rubble],
            Biome::Village | Biome::Road | Biome::Castle | Biome::Water => &[],
        }
    }
}

/// A concrete obstacle look: family, size class and mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObstacleVariant {
    /// Obstacle family
    pub kind: ObstacleKind,
    /// Size class, 0 (small) to 2 (large)
    pub size: u8,
    /// Mirror horizontally
    pub flip: bool,
}

impl ObstacleVariant {
    /// Scale factor of the size class.
    #[must_use]
    pub fn scale(self) -> f32 {
        0.85 + f32::from(self.size) * 0.15
    }
}

/// One visual part of an obstacle or decoration.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualPart {
    /// Shape
    pub primitive: Primitive,
    /// Centre position in world units
    pub position: Vec2,
    /// Size box
    pub size: Vec2,
    /// Fill
    pub style: Style,
}

/// Small ground detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationKind {
    /// Coloured flower
    Flower,
    /// Darker grass tuft
    GrassTuft,
    /// Loose stone
    Pebble,
    /// Old bone
    Bone,
    /// Water ripple
    Ripple,
    /// Cracked floor
    Crack,
    /// Glowing ember
    Ember,
    /// Murky puddle
    Puddle,
}

impl DecorationKind {
    /// Decorations that appear in a biome.
    #[must_use]
    pub const fn for_biome(biome: Biome) -> &'static [Self] {
        match biome {
            Biome::Meadow => &[Self::Flower, Self::GrassTuft, Self::GrassTuft],
            Biome::Forest => &[Self::GrassTuft, Self::Pebble],
            Biome::Desert => &[Self::Pebble, Self::Bone],
            Biome::Cemetery => &[Self::Bone, Self::Crack],
            Biome::Sewer => &[Self::Puddle, Self::Crack],
            Biome::Cave => &[Self::Pebble, Self::Crack],
            Biome::Forge => &[Self::Ember, Self::Crack],
            Biome::Water => &[Self::Ripple],
            Biome::Village | Biome::Road | Biome::Castle | Biome::Ruins => {
                &[Self::Pebble, Self::Crack]
            },
        }
    }

    /// Chance per tile that a decoration appears.
    #[must_use]
    pub const fn chance(biome: Biome) -> f64 {
        match biome {
            Biome::Meadow | Biome::Forest => 0.2,
            Biome::Desert => 0.15,
            Biome::Water => 0.1,
            _ => 0.12,
        }
    }
}

/// A placed decoration.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
    /// Decoration kind
    pub kind: DecorationKind,
    /// The single visual part
    pub part: VisualPart,
}

/// Seeded placement decisions for one world.
#[derive(Debug, Clone)]
pub struct PlacementGenerator {
    seed: WorldSeed,
    densities: DensityTable,
    tile_size: f32,
}

impl PlacementGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new(seed: WorldSeed, densities: DensityTable, tile_size: f32) -> Self {
        Self {
            seed,
            densities,
            tile_size,
        }
    }

    /// Returns the density table.
    #[must_use]
    pub const fn densities(&self) -> &DensityTable {
        &self.densities
    }

    fn tile_hash(&self, tile: TileCoord, row: f64, salt: u32) -> f64 {
        hash(f64::from(tile.x) * row + f64::from(tile.y) + self.seed.salted(salt))
    }

    /// Decides whether an obstacle occupies the tile.
    ///
    /// The base density is scaled by a low-frequency cluster value so
    /// obstacles form groves and clearings.
    #[must_use]
    pub fn should_place(&self, tile: TileCoord, biome: Biome) -> bool {
        let base = self.densities.density(biome);
        if base <= 0.0 {
            return false;
        }

        let cluster = fractal_noise_2d(
            f64::from(tile.x),
            f64::from(tile.y),
            2,
            0.5,
            self.seed.salted(CLUSTER_SALT),
        );
        let factor = ((cluster - 0.3) / 0.4).clamp(0.0, 1.0) * 2.0;

        self.tile_hash(tile, PLACE_ROW, 0) < base * factor
    }

    /// Picks the obstacle variant for the tile, or `None` for exempt biomes.
    #[must_use]
    pub fn choose_variant(&self, tile: TileCoord, biome: Biome) -> Option<ObstacleVariant> {
        let families = ObstacleKind::families(biome);
        if families.is_empty() {
            return None;
        }

        let pick = |salt| self.tile_hash(tile, VARIANT_ROW, salt);
        let kind = families[index_of(pick(0), families.len())];
        let size = index_of(pick(1), 3) as u8;
        let flip = pick(2) < 0.5;
        Some(ObstacleVariant { kind, size, flip })
    }

    /// Sub-tile offset of an obstacle, at most a quarter tile per axis.
    #[must_use]
    pub fn jitter(&self, tile: TileCoord) -> Vec2 {
        let spread = 0.5 * self.tile_size;
        let jx = (self.tile_hash(tile, JITTER_ROW, 0) - 0.5) as f32 * spread;
        let jy = (self.tile_hash(tile, JITTER_ROW, 17) - 0.5) as f32 * spread;
        Vec2::new(jx, jy)
    }

    /// Visual parts of an obstacle anchored at `anchor`.
    #[must_use]
    pub fn obstacle_parts(&self, variant: ObstacleVariant, anchor: Vec2) -> Vec<VisualPart> {
        let s = variant.scale();
        let mirror = if variant.flip { -1.0 } else { 1.0 };
        let part = |primitive: Primitive, dx: f32, dy: f32, w: f32, h: f32, color: u32| VisualPart {
            primitive,
            position: anchor + Vec2::new(dx * mirror, dy) * s,
            size: Vec2::new(w, h) * s,
            style: Style::solid(color, OBSTACLE_DEPTH),
        };
        use Primitive::{Circle, Rect};

        match variant.kind {
            ObstacleKind::Tree => vec![
                part(Rect, 0.0, 6.0, 6.0, 12.0, 0x005d_4037),
                part(Circle, 0.0, -6.0, 20.0, 20.0, 0x002e_7d32),
                part(Circle, -6.0, -2.0, 16.0, 16.0, 0x0027_6b2b),
                part(Circle, 6.0, -2.0, 16.0, 16.0, 0x0038_8e3c),
            ],
            ObstacleKind::DeadTree => vec![
                part(Rect, 0.0, 2.0, 5.0, 20.0, 0x004e_342e),
                part(Rect, -5.0, -4.0, 8.0, 3.0, 0x004e_342e),
                part(Rect, 4.0, -8.0, 6.0, 3.0, 0x004e_342e),
            ],
            ObstacleKind::Cactus => vec![
                part(Rect, 0.0, 0.0, 8.0, 22.0, 0x002e_8b57),
                part(Rect, -7.0, -2.0, 6.0, 4.0, 0x002e_8b57),
                part(Rect, 7.0, -6.0, 6.0, 4.0, 0x002e_8b57),
            ],
            ObstacleKind::Rock => vec![
                part(Circle, 0.0, 0.0, 18.0, 18.0, 0x007f_8c8d),
                part(Circle, 4.0, -3.0, 10.0, 10.0, 0x0095_a5a6),
            ],
            ObstacleKind::Gravestone => vec![
                part(Rect, 0.0, 0.0, 12.0, 16.0, 0x0095_a5a6),
                part(Rect, 0.0, 7.0, 16.0, 3.0, 0x007f_8c8d),
            ],
            ObstacleKind::Mushroom => vec![
                part(Rect, 0.0, 4.0, 6.0, 10.0, 0x00d7_ccc8),
                part(Circle, 0.0, -3.0, 18.0, 12.0, 0x008e_44ad),
            ],
            ObstacleKind::Rubble => vec![
                part(Rect, -4.0, 2.0, 10.0, 8.0, 0x0075_7575),
                part(Rect, 5.0, 0.0, 8.0, 12.0, 0x0061_6161),
            ],
            ObstacleKind::LavaRock => vec![
                part(Circle, 0.0, 0.0, 18.0, 18.0, 0x0033_2222),
                part(Circle, -3.0, -2.0, 6.0, 6.0, 0x00e6_7e22),
            ],
            ObstacleKind::Barrel => vec![
                part(Rect, 0.0, 0.0, 14.0, 18.0, 0x006d_4c41),
                part(Rect, 0.0, -4.0, 14.0, 2.0, 0x0042_4242),
            ],
        }
    }

    /// Decides whether a decoration appears on a tile.
    #[must_use]
    pub fn should_decorate(&self, tile: TileCoord, biome: Biome) -> bool {
        self.tile_hash(tile, DECOR_ROW, 0) < DecorationKind::chance(biome)
    }

    /// Builds the decoration for a tile whose centre is `center`.
    #[must_use]
    pub fn decoration_for(&self, tile: TileCoord, biome: Biome, center: Vec2) -> Decoration {
        let kinds = DecorationKind::for_biome(biome);
        let kind = kinds[index_of(self.tile_hash(tile, DECOR_KIND_ROW, 0), kinds.len())];
        let offset = self.jitter(tile);
        let accent = biome.accent_color();

        let (primitive, size, color, alpha) = match kind {
            DecorationKind::Flower => {
                let palette = [0x00f1_c40f, 0x00e7_4c3c, 0x009b_59b6, 0x00ec_f0f1];
                let pick = index_of(self.tile_hash(tile, DECOR_KIND_ROW, 1), palette.len());
                (Primitive::Circle, Vec2::splat(4.0), palette[pick], 1.0)
            },
            DecorationKind::GrassTuft => (Primitive::Rect, Vec2::new(3.0, 6.0), accent, 0.8),
            DecorationKind::Pebble => (Primitive::Circle, Vec2::splat(3.0), 0x0095_a5a6, 0.9),
            DecorationKind::Bone => (Primitive::Rect, Vec2::new(8.0, 2.0), 0x00ec_e5d0, 0.9),
            DecorationKind::Ripple => (Primitive::Circle, Vec2::new(10.0, 4.0), 0x005d_ade2, 0.5),
            DecorationKind::Crack => (Primitive::Rect, Vec2::new(10.0, 1.0), accent, 0.6),
            DecorationKind::Ember => (Primitive::Circle, Vec2::splat(3.0), 0x00e6_7e22, 0.9),
            DecorationKind::Puddle => (Primitive::Circle, Vec2::new(12.0, 6.0), accent, 0.6),
        };

        Decoration {
            kind,
            part: VisualPart {
                primitive,
                position: center + offset,
                size,
                style: Style::solid(color, DECORATION_DEPTH).with_alpha(alpha),
            },
        }
    }

    /// Ground colour of a tile: the biome colour brightened by a seeded amount.
    #[must_use]
    pub fn ground_color(&self, tile: TileCoord, biome: Biome) -> u32 {
        let variation = lattice(
            f64::from(tile.x),
            f64::from(tile.y),
            self.seed.salted(GROUND_SALT),
        ) * 0.15;
        scale_color(biome.ground_color(), 1.0 + variation)
    }
}

fn index_of(unit: f64, len: usize) -> usize {
    ((unit * len as f64) as usize).min(len.saturating_sub(1))
}

fn scale_color(color: u32, factor: f64) -> u32 {
    let channel = |shift: u32| {
        let value = f64::from((color >> shift) & 0xff) * factor;
        (value.round().clamp(0.0, 255.0) as u32) << shift
    };
    channel(16) | channel(8) | channel(0)
}
