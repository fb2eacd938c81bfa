//! Weighted mob selection per biome.
//!
//! This is the one place where true randomness enters the world; mob
//! identity and position are not part of the reproducible terrain.

use ahash::AHashMap;
use tracing::warn;

use crate::biome::Biome;
use crate::content::{ContentTables, SpawnEntry, FALLBACK_SPAWN_BIOME};

/// Draws mob kinds from per-biome weighted tables.
#[derive(Debug, Clone, Default)]
pub struct SpawnSelector {
    tables: AHashMap<Biome, Vec<SpawnEntry>>,
    fallback: Option<Vec<SpawnEntry>>,
}

impl SpawnSelector {
    /// Creates a selector from the content tables.
    #[must_use]
    pub fn new(content: &ContentTables) -> Self {
        let tables: AHashMap<_, _> = content
            .spawn_tables
            .iter()
            .map(|table| (table.biome, table.entries.clone()))
            .collect();
        let fallback = tables.get(&FALLBACK_SPAWN_BIOME).cloned();
        Self { tables, fallback }
    }

    /// Returns the table used for a biome, falling back to the default biome.
    #[must_use]
    pub fn table_for(&self, biome: Biome) -> Option<&[SpawnEntry]> {
        match self.tables.get(&biome) {
            Some(entries) => Some(entries),
            None => {
                warn!("No spawn table for biome '{biome}', using '{FALLBACK_SPAWN_BIOME}'");
                self.fallback.as_deref()
            },
        }
    }

    /// Picks a mob kind for a biome.
    ///
    /// Draws uniformly in `[0, total)` and subtracts weights in table order
    /// until the running value is no longer positive. Returns `None` when
    /// neither the biome nor the fallback has a usable table.
    pub fn pick(&self, biome: Biome, rng: &mut fastrand::Rng) -> Option<&str> {
        let entries = self.table_for(biome)?;
        let total: u64 = entries.iter().map(|e| u64::from(e.weight)).sum();
        if total == 0 {
            warn!("Spawn table for '{biome}' has no weight");
            return None;
        }

        let mut roll = rng.f64() * total as f64;
        for entry in entries.iter().filter(|e| e.weight > 0) {
            roll -= f64::from(entry.weight);
            if roll <= 0.0 {
                return Some(entry.mob.as_str());
            }
        }
        // Rounding can leave a sliver above zero
        entries
            .iter()
            .rev()
            .find(|e| e.weight > 0)
            .map(|e| e.mob.as_str())
    }
}
