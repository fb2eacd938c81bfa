//! Read-only content tables: mob definitions, spawn tables, obstacle densities.

use std::path::Path;

use arcforge_common::{ArcforgeError, ArcforgeResult, SchemaVersion};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::biome::Biome;
use crate::placement::DensityTable;

/// Mob used when a kind is missing from the tables.
pub const FALLBACK_MOB: &str = "orc";

/// Biome whose spawn table stands in for biomes without one.
pub const FALLBACK_SPAWN_BIOME: Biome = Biome::Meadow;

/// Static definition of a mob kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobDef {
    /// Content key
    pub id: String,
    /// Display name
    pub name: String,
    /// Sprite asset key
    pub sprite: String,
    /// Maximum health
    pub hp: f32,
    /// Chase speed in world units per second
    pub speed: f32,
    /// Damage per hit
    pub attack: f32,
    /// Milliseconds between attacks
    pub attack_rate_ms: u32,
    /// Distance at which the mob starts chasing
    pub aggro_range: f32,
    /// Sprite tint (0xRRGGBB)
    #[serde(default)]
    pub tint: Option<u32>,
    /// Experience awarded on kill
    pub xp: u32,
}

/// One weighted entry of a spawn table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnEntry {
    /// Mob kind
    pub mob: String,
    /// Relative weight
    pub weight: u32,
}

/// Spawn table of one biome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiomeSpawnTable {
    /// Biome the table applies to
    pub biome: Biome,
    /// Weighted entries, in draw order
    pub entries: Vec<SpawnEntry>,
}

/// All content the world reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentTables {
    /// Schema version of the data
    pub version: SchemaVersion,
    /// Mob definitions
    pub mobs: Vec<MobDef>,
    /// Per-biome spawn tables
    pub spawn_tables: Vec<BiomeSpawnTable>,
    /// Per-biome obstacle densities
    pub densities: DensityTable,
}

impl ContentTables {
    /// Parses tables from TOML. Missing sections take the built-in defaults.
    pub fn from_toml_str(text: &str) -> ArcforgeResult<Self> {
        let tables: Self =
            toml::from_str(text).map_err(|e| ArcforgeError::Content(e.to_string()))?;

        if !SchemaVersion::CONTENT_TABLES.can_read(&tables.version) {
            return Err(ArcforgeError::VersionMismatch {
                expected: SchemaVersion::CONTENT_TABLES.to_string(),
                actual: tables.version.to_string(),
            });
        }

        tables.check_references();
        Ok(tables)
    }

    /// Loads tables from a TOML file.
    pub fn load_from(path: &Path) -> ArcforgeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let tables = Self::from_toml_str(&text)?;
        info!(
            "Loaded content v{} from {:?}: {} mobs, {} spawn tables",
            tables.version,
            path,
            tables.mobs.len(),
            tables.spawn_tables.len()
        );
        Ok(tables)
    }

    /// Serializes the tables to TOML.
    pub fn to_toml_string(&self) -> ArcforgeResult<String> {
        toml::to_string_pretty(self).map_err(|e| ArcforgeError::Content(e.to_string()))
    }

    /// Looks up a mob definition.
    #[must_use]
    pub fn mob(&self, id: &str) -> Option<&MobDef> {
        self.mobs.iter().find(|mob| mob.id == id)
    }

    /// Returns the spawn table of a biome, if it has one.
    #[must_use]
    pub fn spawn_table(&self, biome: Biome) -> Option<&[SpawnEntry]> {
        self.spawn_tables
            .iter()
            .find(|table| table.biome == biome)
            .map(|table| table.entries.as_slice())
    }

    /// Every sprite key a mob may use.
    pub fn sprite_keys(&self) -> impl Iterator<Item = &str> {
        self.mobs.iter().map(|mob| mob.sprite.as_str())
    }

    /// Warns about spawn entries that name unknown mobs.
    fn check_references(&self) {
        for table in &self.spawn_tables {
            for entry in &table.entries {
                if self.mob(&entry.mob).is_none() {
                    warn!(
                        "Spawn table '{}' references unknown mob '{}'",
                        table.biome, entry.mob
                    );
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn mob(
    id: &str,
    name: &str,
    sprite: &str,
    hp: f32,
    speed: f32,
    attack: f32,
    attack_rate_ms: u32,
    aggro_range: f32,
    xp: u32,
) -> MobDef {
    MobDef {
        id: id.to_string(),
        name: name.to_string(),
        sprite: sprite.to_string(),
        hp,
        speed,
        attack,
        attack_rate_ms,
        aggro_range,
        tint: None,
        xp,
    }
}

fn tinted(mut def: MobDef, tint: u32) -> MobDef {
    def.tint = Some(tint);
    def
}

fn table(biome: Biome, entries: &[(&str, u32)]) -> BiomeSpawnTable {
    BiomeSpawnTable {
        biome,
        entries: entries
            .iter()
            .map(|(mob, weight)| SpawnEntry {
                mob: (*mob).to_string(),
                weight: *weight,
            })
            .collect(),
    }
}

impl Default for ContentTables {
    fn default() -> Self {
        let mobs = vec![
            mob("orc", "Orc Forager", "orc", 30.0, 45.0, 6.0, 1200, 120.0, 10),
            mob("skeleton", "Crumbling Skeleton", "skeleton", 22.0, 55.0, 5.0, 1000, 140.0, 8),
            mob("bat", "Cave Bat", "bat", 12.0, 70.0, 3.0, 800, 100.0, 5),
            tinted(mob("slime", "Green Slime", "slime", 18.0, 30.0, 4.0, 1500, 80.0, 6), 0x002e_cc71),
            tinted(
                mob("skeleton_warrior", "Skeleton Warrior", "skeleton", 45.0, 50.0, 9.0, 1100, 150.0, 20),
                0x007f_8c8d,
            ),
            tinted(mob("golem", "Stone Golem", "golem", 100.0, 25.0, 18.0, 2000, 100.0, 35), 0x007f_8c8d),
            tinted(
                mob("necromancer", "Dark Necromancer", "skeleton", 60.0, 40.0, 15.0, 1400, 200.0, 45),
                0x008e_44ad,
            ),
            mob("elf_scout", "Forest Scout", "elf_base", 28.0, 60.0, 6.0, 1000, 150.0, 12),
            mob("elf_hunter", "Elf Hunter", "elf_hunter", 38.0, 55.0, 9.0, 1100, 180.0, 18),
            mob("elf_druid", "Forest Druid", "elf_druid", 32.0, 45.0, 11.0, 1400, 160.0, 22),
            mob("mummy", "Shambling Mummy", "mummy_base", 40.0, 35.0, 8.0, 1400, 120.0, 14),
            mob("mummy_warrior", "Mummy Guardian", "mummy_warrior", 65.0, 40.0, 12.0, 1200, 140.0, 25),
            mob("mummy_mage", "Sand Sorcerer", "mummy_mage", 35.0, 45.0, 14.0, 1500, 180.0, 28),
            mob("zombie", "Risen Corpse", "zombie_base", 35.0, 30.0, 7.0, 1500, 100.0, 10),
            mob("zombie_banshee", "Wailing Banshee", "zombie_banshee", 28.0, 55.0, 10.0, 1000, 160.0, 18),
            mob("zombie_brute", "Hulking Zombie", "zombie_muscle", 80.0, 25.0, 15.0, 1800, 120.0, 30),
            mob("rat", "Sewer Rat", "rat_base", 18.0, 70.0, 4.0, 700, 100.0, 6),
            mob("rat_warrior", "Rat Bruiser", "rat_warrior", 40.0, 55.0, 9.0, 900, 130.0, 16),
            mob("rat_mage", "Plague Caster", "rat_mage", 25.0, 50.0, 12.0, 1200, 150.0, 22),
            mob("fungus", "Spore Fungus", "fungus_immature", 22.0, 25.0, 5.0, 1600, 80.0, 8),
            mob("fungus_heavy", "Bloated Fungus", "fungus_heavy", 55.0, 20.0, 10.0, 2000, 90.0, 20),
            mob("fungus_elder", "Elder Shroom", "fungus_old", 90.0, 15.0, 16.0, 2200, 100.0, 35),
            mob("stone_sentinel", "Stone Sentinel", "stone_base", 70.0, 30.0, 12.0, 1800, 100.0, 25),
            tinted(
                mob("lava_golem", "Lava Golem", "stone_lava", 120.0, 25.0, 20.0, 2000, 120.0, 45),
                0x00ff_6b35,
            ),
        ];

        let spawn_tables = vec![
            table(Biome::Meadow, &[("orc", 4), ("slime", 3), ("bat", 2)]),
            table(Biome::Forest, &[("elf_scout", 5), ("elf_hunter", 3), ("elf_druid", 1)]),
            table(Biome::Desert, &[("mummy", 5), ("mummy_warrior", 2), ("mummy_mage", 1)]),
            table(
                Biome::Cemetery,
                &[("zombie", 5), ("zombie_banshee", 2), ("zombie_brute", 1)],
            ),
            table(Biome::Sewer, &[("rat", 5), ("rat_warrior", 2), ("rat_mage", 1)]),
            table(
                Biome::Cave,
                &[("fungus", 4), ("fungus_heavy", 2), ("fungus_elder", 1), ("bat", 3)],
            ),
            table(
                Biome::Forge,
                &[("stone_sentinel", 4), ("lava_golem", 2), ("golem", 1)],
            ),
            table(
                Biome::Ruins,
                &[("skeleton", 4), ("skeleton_warrior", 2), ("necromancer", 1)],
            ),
        ];

        Self {
            version: SchemaVersion::CONTENT_TABLES,
            mobs,
            spawn_tables,
            densities: DensityTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_tables_are_consistent() {
        let tables = ContentTables::default();
        assert!(tables.mob(FALLBACK_MOB).is_some());
        assert!(tables.spawn_table(FALLBACK_SPAWN_BIOME).is_some());
        for table in &tables.spawn_tables {
            for entry in &table.entries {
                assert!(tables.mob(&entry.mob).is_some(), "missing {}", entry.mob);
                assert!(entry.weight > 0);
            }
        }
    }

    #[test]
    fn test_lookup() {
        let tables = ContentTables::default();
        let slime = tables.mob("slime").expect("slime");
        assert_eq!(slime.tint, Some(0x002e_cc71));
        assert!(tables.mob("dragon").is_none());
        assert!(tables.spawn_table(Biome::Village).is_none());
        assert_eq!(tables.spawn_table(Biome::Cave).map(<[_]>::len), Some(4));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let text = r#"
            [[spawn_tables]]
            biome = "meadow"
            entries = [{ mob = "bat", weight = 1 }]
        "#;
        let tables = ContentTables::from_toml_str(text).expect("parse");
        assert_eq!(tables.spawn_table(Biome::Meadow).map(<[_]>::len), Some(1));
        assert_eq!(tables.spawn_tables.len(), 1);
        assert_eq!(tables.mobs.len(), ContentTables::default().mobs.len());
        assert_eq!(tables.version, SchemaVersion::CONTENT_TABLES);
    }

    #[test]
    fn test_major_version_mismatch_rejected() {
        let text = "version = { major = 2, minor = 0, patch = 0 }";
        let err = ContentTables::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ArcforgeError::VersionMismatch { .. }));

        let older = "version = { major = 1, minor = 0, patch = 3 }";
        assert!(ContentTables::from_toml_str(older).is_ok());
    }

    #[test]
    fn test_bad_toml_is_content_error() {
        let err = ContentTables::from_toml_str("mobs = 7").unwrap_err();
        assert!(matches!(err, ArcforgeError::Content(_)));
    }

    #[test]
    fn test_unknown_biome_in_table_is_rejected() {
        let text = r#"
            [[spawn_tables]]
            biome = "swamp"
            entries = []
        "#;
        assert!(ContentTables::from_toml_str(text).is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let tables = ContentTables::default();
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(tables.to_toml_string().expect("serialize").as_bytes())
            .expect("write");

        let loaded = ContentTables::load_from(file.path()).expect("load");
        assert_eq!(loaded, tables);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = ContentTables::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ArcforgeError::Io(_)));
    }
}
