//! Application lifecycle.
//!
//! Walks an observer along the authored paths against the headless scene,
//! letting the world stream chunks and resolving mob contact every frame.

use std::time::Duration;

use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};
use arcforge_common::{EntityHandle, TileGrid};
use arcforge_world::{
    ContentTables, DamageOutcome, HeadlessScene, OverlapHit, Scene, StreamingStats, World,
    WorldLayout,
};
use glam::Vec2;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::context::GameContext;

/// Damage of an observer strike before the random bonus.
const BASE_STRIKE_DAMAGE: f32 = 6.0;
/// Minimum time between observer strikes.
const STRIKE_COOLDOWN: Duration = Duration::from_millis(400);
/// Frames between progress lines.
const REPORT_INTERVAL: u32 = 600;

/// Result of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Frames simulated
    pub frames: u32,
    /// Final observer state
    pub context: GameContext,
    /// Streaming counters
    pub stats: StreamingStats,
    /// Chunks loaded at the end
    pub loaded_chunks: usize,
    /// Mobs alive at the end
    pub live_mobs: usize,
}

/// Headless application state.
pub struct App {
    config: EngineConfig,
    scene: HeadlessScene,
    world: World,
    context: GameContext,
    observer: EntityHandle,
    home: Vec2,
    route: Vec<Vec2>,
    waypoint: usize,
    elapsed: Duration,
    mob_cooldowns: AHashMap<EntityHandle, Duration>,
    next_strike: Duration,
    rng: fastrand::Rng,
}

impl App {
    /// Builds the world, scene and observer from a configuration.
    pub fn new(mut config: EngineConfig) -> Result<Self> {
        config.validate();

        let content = match &config.content_path {
            Some(path) => ContentTables::load_from(path)
                .with_context(|| format!("failed to load content from {}", path.display()))?,
            None => ContentTables::default(),
        };

        let seed = config.resolve_seed();
        let layout = WorldLayout::arcforge();
        let grid = TileGrid::new(config.tile_size);
        let home = grid.tile_to_world(layout.village_center);
        let route = layout
            .paths
            .iter()
            .flat_map(|path| [grid.tile_to_world(path.end), grid.tile_to_world(path.start)])
            .collect();

        let mut scene = HeadlessScene::new();
        for key in content.sprite_keys() {
            scene.register_asset(key);
        }
        let observer = scene.spawn_observer(home);

        let mut world = World::new(
            config.streaming(seed),
            layout,
            &content,
            fastrand::Rng::with_seed(u64::from(seed.value())),
        );
        world.set_observer_entity(Some(observer));

        info!("World seed: {}", seed.value());

        Ok(Self {
            rng: fastrand::Rng::with_seed(u64::from(seed.value()) ^ 0x5eed),
            context: GameContext::new(home),
            config,
            scene,
            world,
            observer,
            home,
            route,
            waypoint: 0,
            elapsed: Duration::ZERO,
            mob_cooldowns: AHashMap::new(),
            next_strike: Duration::ZERO,
        })
    }

    /// Returns the world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Returns the scene.
    #[must_use]
    pub const fn scene(&self) -> &HeadlessScene {
        &self.scene
    }

    /// Returns the observer state.
    #[must_use]
    pub const fn context(&self) -> &GameContext {
        &self.context
    }

    /// Runs the configured number of frames.
    pub fn run(&mut self) -> Result<RunSummary> {
        let dt = self.config.frame_duration();
        info!(
            "Running {} frames at {:.1} ms",
            self.config.frames,
            dt.as_secs_f64() * 1000.0
        );

        for frame in 1..=self.config.frames {
            self.frame(dt)?;
            if frame % REPORT_INTERVAL == 0 {
                let stats = self.world.chunks().stats();
                info!(
                    "Frame {frame}: {} chunks, {} mobs, hp {}/{}, level {}",
                    self.world.chunks().loaded_count(),
                    self.world.mobs().len(),
                    self.context.hp,
                    self.context.max_hp,
                    self.context.level
                );
                debug!("Streaming so far: {stats:?}");
            }
        }

        let stats = *self.world.chunks().stats();
        info!(
            "Streaming: {} loads, {} unloads, {} skipped updates, {} fallback visuals, {} mobs spawned",
            stats.chunks_loaded,
            stats.chunks_unloaded,
            stats.skipped_updates,
            stats.fallback_visuals,
            stats.mobs_spawned
        );
        info!(
            "Observer: level {}, {} kills, {} defeats, {} coins",
            self.context.level, self.context.kills, self.context.defeats, self.context.coins
        );

        Ok(RunSummary {
            frames: self.config.frames,
            context: self.context.clone(),
            stats,
            loaded_chunks: self.world.chunks().loaded_count(),
            live_mobs: self.world.mobs().len(),
        })
    }

    /// Streaming and world tasks complete before movement and overlap
    /// resolution.
    fn frame(&mut self, dt: Duration) -> Result<()> {
        self.elapsed += dt;

        let position = self
            .scene
            .entity_position(self.observer)
            .ok_or_else(|| anyhow!("observer body is missing from the scene"))?;
        self.context.position = position;

        let report = self.world.tick(&mut self.scene, position, dt);
        if !report.streaming.skipped {
            debug!(
                "Chunk {}: {} loaded, {} unloaded",
                report.streaming.center,
                report.streaming.loaded.len(),
                report.streaming.unloaded.len()
            );
        }
        if report.stale_tasks > 0 {
            debug!("{} deferred tasks fired without a target", report.stale_tasks);
        }

        self.steer_observer(position, dt)?;
        self.scene.step(dt);
        self.resolve_overlaps();
        let mobs = self.world.mobs();
        self.mob_cooldowns.retain(|entity, _| mobs.get(*entity).is_some());

        if self.context.is_defeated() {
            warn!("Observer was defeated, returning to the village");
            self.context.respawn_at(self.home);
            self.scene.teleport(self.observer, self.home)?;
            self.waypoint = 0;
        }
        Ok(())
    }

    fn steer_observer(&mut self, position: Vec2, dt: Duration) -> Result<()> {
        let velocity = match self.route.get(self.waypoint) {
            Some(target) => {
                let to_target = *target - position;
                let step = self.config.observer_speed * dt.as_secs_f32();
                if to_target.length() <= step.max(1.0) {
                    self.waypoint = (self.waypoint + 1) % self.route.len();
                }
                to_target.normalize_or_zero() * self.config.observer_speed
            },
            None => Vec2::ZERO,
        };
        self.scene.set_velocity(self.observer, velocity)?;
        Ok(())
    }

    fn resolve_overlaps(&mut self) {
        for event in self.scene.drain_overlaps() {
            if event.other == OverlapHit::Entity(self.observer) {
                self.mob_contact(event.entity);
            }
        }
    }

    /// A mob touching the observer hits it on its own cooldown, and the
    /// observer strikes back on a shared one.
    fn mob_contact(&mut self, mob: EntityHandle) {
        let Some(kind) = self.world.mobs().get(mob).map(|m| m.kind.clone()) else {
            return;
        };

        let ready = self
            .mob_cooldowns
            .get(&mob)
            .map_or(true, |next| self.elapsed >= *next);
        if ready {
            if let Ok(def) = self.world.mobs().definition(&kind) {
                let attack = def.attack;
                let rate = Duration::from_millis(u64::from(def.attack_rate_ms));
                self.mob_cooldowns.insert(mob, self.elapsed + rate);
                let taken = self.context.take_damage(attack);
                debug!("{kind} hit the observer for {taken}");
            }
        }

        if self.elapsed < self.next_strike {
            return;
        }
        self.next_strike = self.elapsed + STRIKE_COOLDOWN;
        let damage = BASE_STRIKE_DAMAGE + self.rng.u32(0..=3) as f32;
        match self.world.damage_mob(&mut self.scene, mob, damage) {
            Ok(DamageOutcome::Killed { kind, xp, .. }) => {
                self.context.kills += 1;
                self.mob_cooldowns.remove(&mob);
                info!("{kind} defeated! +{xp} XP");
                self.context.award_xp(xp);
            },
            Ok(DamageOutcome::Hurt { .. }) => {},
            Err(e) => warn!("Strike missed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcforge_world::{CollisionGroup, ManifestEntry};
    use std::path::PathBuf;

    fn config(frames: u32) -> EngineConfig {
        EngineConfig {
            world_seed: Some(2024),
            frames,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_new_loads_nothing_until_first_frame() {
        let app = App::new(config(1)).expect("app");
        assert_eq!(app.world().chunks().loaded_count(), 0);
        assert_eq!(app.scene().entity_count(), 1);
        assert_eq!(app.context().level, 1);
    }

    #[test]
    fn test_first_frame_loads_village() {
        let mut app = App::new(config(1)).expect("app");
        let summary = app.run().expect("run");
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.loaded_chunks, 25);
        assert_eq!(summary.stats.chunks_loaded, 25);
    }

    #[test]
    fn test_walk_streams_chunks() {
        let mut app = App::new(config(900)).expect("app");
        let summary = app.run().expect("run");

        assert!(summary.stats.chunks_unloaded > 0);
        assert!(summary.loaded_chunks <= 25);
        assert!(summary.stats.skipped_updates > 0);
        assert_ne!(summary.context.position, app.home);
    }

    #[test]
    fn test_scene_matches_manifests_after_walk() {
        let mut app = App::new(config(900)).expect("app");
        app.run().expect("run");

        let chunks = app.world().chunks();
        let mut colliders = 0;
        for chunk in chunks.loaded_chunks() {
            for entry in chunks.manifest(chunk).expect("manifest").handles() {
                match entry {
                    ManifestEntry::Visual(h) => assert!(app.scene().visual(h).is_some()),
                    ManifestEntry::Collider(h) => {
                        assert!(app.scene().collider(h).is_some());
                        colliders += 1;
                    },
                    ManifestEntry::Entity(h) => assert!(app.scene().entity(h).is_some()),
                }
            }
        }
        let live_colliders = app.scene().collider_count(CollisionGroup::Obstacles)
            + app.scene().collider_count(CollisionGroup::Water);
        assert_eq!(colliders, live_colliders);
        // Mobs plus the observer body
        assert_eq!(app.scene().entity_count(), app.world().mobs().len() + 1);
    }

    #[test]
    fn test_missing_content_file_is_an_error() {
        let config = EngineConfig {
            content_path: Some(PathBuf::from("/nonexistent/content.toml")),
            ..config(1)
        };
        assert!(App::new(config).is_err());
    }

    #[test]
    fn test_same_seed_same_streaming() {
        let mut a = App::new(config(300)).expect("app");
        let mut b = App::new(config(300)).expect("app");
        let a = a.run().expect("run");
        let b = b.run().expect("run");
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.loaded_chunks, b.loaded_chunks);
        assert_eq!(a.live_mobs, b.live_mobs);
        // Mob behaviour and combat replay too
        assert_eq!(a.context, b.context);
    }
}
