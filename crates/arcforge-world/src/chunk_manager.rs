//! Chunk streaming around a moving observer.
//!
//! The manager keeps exactly the chunks within the render distance of the
//! observer's chunk loaded. Every scene resource a chunk creates is recorded
//! in that chunk's manifest and released when the chunk unloads.

use std::time::Duration;

use ahash::{AHashMap, AHashSet};
use arcforge_common::{ChunkCoord, EntityHandle, TileCoord, TileGrid, VisualHandle};
use glam::Vec2;
use tracing::{debug, info, warn};

use crate::biome::{Biome, BiomeClassifier};
use crate::content::ContentTables;
use crate::layout::WorldLayout;
use crate::manifest::ChunkManifest;
use crate::mob::{Mob, MobRegistry};
use crate::noise::WorldSeed;
use crate::placement::{
    PlacementGenerator, VisualPart, GROUND_DEPTH, OBSTACLE_COLLIDER_OFFSET, OBSTACLE_COLLIDER_SIZE,
};
use crate::scene::{CollisionGroup, OverlapTarget, Primitive, Scene, Style};
use crate::schedule::Scheduler;
use crate::spawn::SpawnSelector;

/// Attempts at finding a dry tile for a mob before giving up.
const SPAWN_TILE_ATTEMPTS: u32 = 12;

/// Settings the chunk manager needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    /// World seed
    pub seed: WorldSeed,
    /// Chunk edge length in tiles
    pub chunk_size: u32,
    /// Chunks kept loaded around the observer's chunk (Chebyshev radius)
    pub render_distance: u32,
    /// Tile edge length in world units
    pub tile_size: f32,
    /// Spawn attempts per chunk load
    pub max_mobs_per_chunk: u32,
    /// Chance each attempt spawns a mob
    pub mob_spawn_chance: f32,
    /// Delay before a killed mob is replaced
    pub respawn_delay: Duration,
    /// Duration of the red hit flash
    pub damage_flash: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            seed: WorldSeed::default(),
            chunk_size: 12,
            render_distance: 2,
            tile_size: 32.0,
            max_mobs_per_chunk: 3,
            mob_spawn_chance: 0.5,
            respawn_delay: Duration::from_secs(15),
            damage_flash: Duration::from_millis(80),
        }
    }
}

impl StreamingConfig {
    /// Clamps values to ranges the manager can stream with.
    pub fn validate(&mut self) {
        self.chunk_size = self.chunk_size.clamp(4, 64);
        self.render_distance = self.render_distance.min(8);
        self.tile_size = self.tile_size.clamp(8.0, 128.0);
        self.max_mobs_per_chunk = self.max_mobs_per_chunk.min(10);
        self.mob_spawn_chance = self.mob_spawn_chance.clamp(0.0, 1.0);
    }
}

/// Counters kept by the manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    /// Calls to `update`
    pub updates: u64,
    /// Updates that returned early because the observer chunk was unchanged
    pub skipped_updates: u64,
    /// Chunk loads
    pub chunks_loaded: u64,
    /// Chunk unloads
    pub chunks_unloaded: u64,
    /// Visuals that fell back to a plain rectangle
    pub fallback_visuals: u64,
    /// Mobs spawned on chunk load
    pub mobs_spawned: u64,
    /// Mobs spawned by respawn tasks
    pub mobs_respawned: u64,
}

/// What one `update` call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingDelta {
    /// Observer chunk
    pub center: ChunkCoord,
    /// Chunks loaded, centre-out
    pub loaded: Vec<ChunkCoord>,
    /// Chunks unloaded
    pub unloaded: Vec<ChunkCoord>,
    /// True when the update returned without doing any work
    pub skipped: bool,
}

impl StreamingDelta {
    /// Returns true if nothing was loaded or unloaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty()
    }
}

/// Result of a single chunk load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The chunk was created
    Loaded {
        /// Handles recorded in the manifest
        handles: usize,
        /// Mobs spawned
        mobs: usize,
    },
    /// The chunk was already loaded; nothing was created
    AlreadyLoaded,
    /// The chunk lies outside the world; nothing was created
    OutOfBounds,
}

#[derive(Debug)]
struct LoadedChunk {
    manifest: ChunkManifest,
    generation: u64,
}

/// Loads and unloads chunks around the observer.
pub struct ChunkManager {
    config: StreamingConfig,
    grid: TileGrid,
    classifier: BiomeClassifier,
    placement: PlacementGenerator,
    spawner: SpawnSelector,
    mobs: MobRegistry,
    scheduler: Scheduler,
    rng: fastrand::Rng,
    loaded: AHashMap<ChunkCoord, LoadedChunk>,
    last_center: Option<ChunkCoord>,
    force_refresh: bool,
    next_generation: u64,
    observer: Option<EntityHandle>,
    stats: StreamingStats,
}

impl ChunkManager {
    /// Creates a manager with nothing loaded.
    ///
    /// `rng` drives mob spawning and behaviour only; terrain never reads it.
    /// Out-of-range settings are clamped first.
    #[must_use]
    pub fn new(
        mut config: StreamingConfig,
        layout: WorldLayout,
        content: &ContentTables,
        rng: fastrand::Rng,
    ) -> Self {
        config.validate();
        info!(
            "Creating chunk manager with seed={}, chunk_size={}, render_distance={}",
            config.seed.value(),
            config.chunk_size,
            config.render_distance
        );

        Self {
            grid: TileGrid::new(config.tile_size),
            classifier: BiomeClassifier::new(config.seed, layout),
            placement: PlacementGenerator::new(
                config.seed,
                content.densities.clone(),
                config.tile_size,
            ),
            spawner: SpawnSelector::new(content),
            mobs: MobRegistry::new(content),
            scheduler: Scheduler::new(),
            rng,
            loaded: AHashMap::new(),
            last_center: None,
            force_refresh: false,
            next_generation: 0,
            observer: None,
            stats: StreamingStats::default(),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Returns the biome classifier.
    #[must_use]
    pub const fn classifier(&self) -> &BiomeClassifier {
        &self.classifier
    }

    /// Returns the live mobs.
    #[must_use]
    pub const fn mobs(&self) -> &MobRegistry {
        &self.mobs
    }

    /// Returns the live mobs mutably.
    pub fn mobs_mut(&mut self) -> &mut MobRegistry {
        &mut self.mobs
    }

    /// Returns the deferred task queue.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Returns the deferred task queue mutably.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Returns the counters.
    #[must_use]
    pub const fn stats(&self) -> &StreamingStats {
        &self.stats
    }

    /// Sets the entity mobs register an overlap against when spawned.
    pub fn set_observer_entity(&mut self, observer: Option<EntityHandle>) {
        self.observer = observer;
    }

    /// Forces the next `update` to recompute even if the observer has not
    /// changed chunk.
    pub fn refresh(&mut self) {
        self.force_refresh = true;
    }

    /// Streams chunks for the observer's current position.
    ///
    /// Chunks that fell out of range are unloaded before missing ones are
    /// loaded. Does nothing when the observer is still in the same chunk.
    pub fn update(&mut self, scene: &mut dyn Scene, observer: Vec2) -> StreamingDelta {
        self.stats.updates += 1;
        let center = self.grid.world_to_chunk(observer, self.config.chunk_size);

        if self.last_center == Some(center) && !self.force_refresh {
            self.stats.skipped_updates += 1;
            return StreamingDelta {
                center,
                skipped: true,
                ..StreamingDelta::default()
            };
        }
        if self.last_center != Some(center) {
            debug!("Observer moved to chunk {center}");
        }
        self.last_center = Some(center);
        self.force_refresh = false;

        let required = self.required_chunks(center);
        let required_set: AHashSet<ChunkCoord> = required.iter().copied().collect();

        let mut unloaded: Vec<ChunkCoord> = self
            .loaded
            .keys()
            .filter(|key| !required_set.contains(key))
            .copied()
            .collect();
        unloaded.sort_unstable();
        for key in &unloaded {
            self.unload(scene, *key);
        }

        let mut loaded = Vec::new();
        for key in required {
            if let LoadOutcome::Loaded { .. } = self.load(scene, key) {
                loaded.push(key);
            }
        }

        StreamingDelta {
            center,
            loaded,
            unloaded,
            skipped: false,
        }
    }

    /// Chunks within the render distance of `center`, clipped to the world,
    /// centre first and then ring by ring.
    #[must_use]
    pub fn required_chunks(&self, center: ChunkCoord) -> Vec<ChunkCoord> {
        let layout = self.classifier.layout();
        spiral_chunks(center, self.config.render_distance)
            .into_iter()
            .filter(|chunk| layout.contains_chunk(*chunk, self.config.chunk_size))
            .collect()
    }

    /// Loads a chunk: terrain, obstacles, decorations, water and mobs.
    pub fn load(&mut self, scene: &mut dyn Scene, chunk: ChunkCoord) -> LoadOutcome {
        if !self
            .classifier
            .layout()
            .contains_chunk(chunk, self.config.chunk_size)
        {
            debug!("Skipping out-of-bounds chunk {chunk}");
            return LoadOutcome::OutOfBounds;
        }
        if self.loaded.contains_key(&chunk) {
            return LoadOutcome::AlreadyLoaded;
        }

        let mut manifest = ChunkManifest::new();
        for tile in chunk.tiles(self.config.chunk_size) {
            if self.classifier.layout().contains(tile) {
                self.populate_tile(scene, tile, &mut manifest);
            }
        }

        let mut mobs = 0;
        if self.spawns_allowed(chunk) {
            for _ in 0..self.config.max_mobs_per_chunk {
                if self.rng.f32() < self.config.mob_spawn_chance {
                    if let Some(entity) = self.spawn_mob(scene, chunk) {
                        let bar = self.mobs.get(entity).and_then(Mob::health_bar);
                        manifest.record_mob(entity, bar);
                        self.stats.mobs_spawned += 1;
                        mobs += 1;
                    }
                }
            }
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let handles = manifest.len();
        self.loaded.insert(
            chunk,
            LoadedChunk {
                manifest,
                generation,
            },
        );
        self.stats.chunks_loaded += 1;
        debug!("Loaded chunk {chunk} (generation {generation}): {handles} handles, {mobs} mobs");

        LoadOutcome::Loaded { handles, mobs }
    }

    /// Unloads a chunk and releases everything it owns.
    ///
    /// Returns false if the chunk was not loaded.
    pub fn unload(&mut self, scene: &mut dyn Scene, chunk: ChunkCoord) -> bool {
        let Some(mut entry) = self.loaded.remove(&chunk) else {
            return false;
        };

        self.scheduler.cancel_for_chunk(chunk);
        for entity in self.mobs.despawn_chunk(scene, chunk) {
            self.scheduler.cancel_for_entity(entity);
        }
        let released = entry.manifest.release(scene);

        self.stats.chunks_unloaded += 1;
        debug!("Unloaded chunk {chunk} ({released} handles)");
        true
    }

    /// Spawns a replacement mob if the chunk is still loaded with the given
    /// generation. Stale requests are ignored.
    pub fn respawn(
        &mut self,
        scene: &mut dyn Scene,
        chunk: ChunkCoord,
        generation: u64,
    ) -> Option<EntityHandle> {
        if self.generation(chunk) != Some(generation) {
            debug!("Dropping stale respawn for chunk {chunk} (generation {generation})");
            return None;
        }

        let entity = self.spawn_mob(scene, chunk)?;
        let bar = self.mobs.get(entity).and_then(Mob::health_bar);
        if let Some(entry) = self.loaded.get_mut(&chunk) {
            entry.manifest.record_mob(entity, bar);
        }
        self.stats.mobs_respawned += 1;
        Some(entity)
    }

    /// Drops a mob that died, and its health bar, from its home chunk's
    /// manifest.
    pub fn forget_mob(&mut self, chunk: ChunkCoord, entity: EntityHandle) -> bool {
        self.loaded
            .get_mut(&chunk)
            .is_some_and(|entry| entry.manifest.forget_mob(entity))
    }

    /// Runs mob behaviour against the observer position.
    pub fn update_mobs(&mut self, scene: &mut dyn Scene, observer: Vec2, dt: Duration) {
        self.mobs.update(scene, observer, dt, &mut self.rng);
    }

    /// Checks whether a chunk is loaded.
    #[must_use]
    pub fn is_loaded(&self, chunk: ChunkCoord) -> bool {
        self.loaded.contains_key(&chunk)
    }

    /// Returns the manifest of a loaded chunk.
    #[must_use]
    pub fn manifest(&self, chunk: ChunkCoord) -> Option<&ChunkManifest> {
        self.loaded.get(&chunk).map(|entry| &entry.manifest)
    }

    /// Returns the load generation of a loaded chunk.
    ///
    /// Every load gets a fresh generation, so a chunk that was unloaded and
    /// loaded again never reports the old value.
    #[must_use]
    pub fn generation(&self, chunk: ChunkCoord) -> Option<u64> {
        self.loaded.get(&chunk).map(|entry| entry.generation)
    }

    /// Loaded chunk keys, sorted.
    #[must_use]
    pub fn loaded_chunks(&self) -> Vec<ChunkCoord> {
        let mut keys: Vec<_> = self.loaded.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Number of loaded chunks.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Biome of a tile, or `None` outside the world.
    #[must_use]
    pub fn get_biome_at(&self, tile: TileCoord) -> Option<Biome> {
        self.classifier.classify_checked(tile).ok()
    }

    /// Tile containing a world position.
    #[must_use]
    pub fn world_to_tile(&self, position: Vec2) -> TileCoord {
        self.grid.world_to_tile(position)
    }

    /// World position of a tile centre.
    #[must_use]
    pub fn tile_to_world(&self, tile: TileCoord) -> Vec2 {
        self.grid.tile_to_world(tile)
    }

    fn populate_tile(&mut self, scene: &mut dyn Scene, tile: TileCoord, manifest: &mut ChunkManifest) {
        let biome = self.classifier.classify(tile);
        let center = self.grid.tile_to_world(tile);
        let tile_size = self.config.tile_size;

        let ground = VisualPart {
            primitive: Primitive::Rect,
            position: center,
            size: Vec2::splat(tile_size),
            style: Style::solid(self.placement.ground_color(tile, biome), GROUND_DEPTH),
        };
        if let Some(handle) = self.create_part(scene, &ground) {
            manifest.record_terrain(handle);
        }

        if biome.is_water() {
            let collider =
                scene.create_static_collider(CollisionGroup::Water, center, Vec2::splat(tile_size));
            manifest.record_water_collider(collider);
        } else if self.placement.should_place(tile, biome) {
            if let Some(variant) = self.placement.choose_variant(tile, biome) {
                let anchor = center + self.placement.jitter(tile);
                let parts: Vec<VisualHandle> = self
                    .placement
                    .obstacle_parts(variant, anchor)
                    .iter()
                    .filter_map(|part| self.create_part(scene, part))
                    .collect();
                let collider = scene.create_static_collider(
                    CollisionGroup::Obstacles,
                    anchor + OBSTACLE_COLLIDER_OFFSET,
                    OBSTACLE_COLLIDER_SIZE,
                );
                manifest.record_obstacle(parts, collider);
                return;
            }
        }

        if self.placement.should_decorate(tile, biome) {
            let decoration = self.placement.decoration_for(tile, biome, center);
            if let Some(handle) = self.create_part(scene, &decoration.part) {
                manifest.record_decoration(handle);
            }
        }
    }

    /// Creates a visual, falling back to a plain rectangle if the scene
    /// refuses the requested primitive.
    fn create_part(&mut self, scene: &mut dyn Scene, part: &VisualPart) -> Option<VisualHandle> {
        match scene.create_visual(&part.primitive, part.position, part.size, part.style) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("{e}, using a plain rect");
                self.stats.fallback_visuals += 1;
                scene
                    .create_visual(&Primitive::Rect, part.position, part.size, part.style)
                    .map_err(|e| warn!("Fallback visual failed: {e}"))
                    .ok()
            },
        }
    }

    fn spawns_allowed(&self, chunk: ChunkCoord) -> bool {
        let layout = self.classifier.layout();
        layout.village_distance(chunk.center_tile(self.config.chunk_size)) >= layout.safe_radius
    }

    /// A random dry tile of the chunk outside the village safe radius.
    fn random_land_tile(&mut self, chunk: ChunkCoord) -> Option<TileCoord> {
        let origin = chunk.origin_tile(self.config.chunk_size);
        let size = self.config.chunk_size as i32;
        let layout = self.classifier.layout();
        for _ in 0..SPAWN_TILE_ATTEMPTS {
            let tile = TileCoord::new(
                origin.x + self.rng.i32(0..size),
                origin.y + self.rng.i32(0..size),
            );
            if layout.village_distance(tile) < layout.safe_radius {
                continue;
            }
            if self
                .classifier
                .classify_checked(tile)
                .is_ok_and(|biome| !biome.is_water())
            {
                return Some(tile);
            }
        }
        None
    }

    fn spawn_mob(&mut self, scene: &mut dyn Scene, chunk: ChunkCoord) -> Option<EntityHandle> {
        let tile = self.random_land_tile(chunk)?;
        let biome = self.classifier.classify(tile);
        let kind = self.spawner.pick(biome, &mut self.rng)?.to_string();
        let position = self.grid.tile_to_world(tile);

        match self.mobs.spawn(scene, &kind, position, chunk) {
            Ok(entity) => {
                scene.add_overlap(entity, OverlapTarget::Group(CollisionGroup::Obstacles));
                if let Some(observer) = self.observer {
                    scene.add_overlap(entity, OverlapTarget::Entity(observer));
                }
                Some(entity)
            },
            Err(e) => {
                warn!("Skipping mob in chunk {chunk}: {e}");
                None
            },
        }
    }
}

impl std::fmt::Debug for ChunkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkManager")
            .field("config", &self.config)
            .field("loaded", &self.loaded.len())
            .field("last_center", &self.last_center)
            .field("mobs", &self.mobs.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Chunks in a square of `radius` around `center`, centre first, then each
/// ring clockwise starting from its top-left corner.
#[must_use]
pub fn spiral_chunks(center: ChunkCoord, radius: u32) -> Vec<ChunkCoord> {
    let side = 2 * radius as usize + 1;
    let mut result = Vec::with_capacity(side * side);
    result.push(center);

    let at = |dx: i32, dy: i32| ChunkCoord::new(center.x + dx, center.y + dy);
    for ring in 1..=radius as i32 {
        for x in -ring..ring {
            result.push(at(x, ring));
        }
        for y in (-ring + 1..=ring).rev() {
            result.push(at(ring, y));
        }
        for x in (-ring + 1..=ring).rev() {
            result.push(at(x, -ring));
        }
        for y in -ring..ring {
            result.push(at(-ring, y));
        }
    }

    result
}
