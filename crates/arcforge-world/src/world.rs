//! Per-frame world driver.
//!
//! `World` ties streaming, deferred tasks and mob behaviour into a single
//! `tick`, and owns the damage path so hit flashes and respawns are
//! scheduled against the right chunk load.

use std::time::Duration;

use arcforge_common::{EntityHandle, WorldError};
use glam::Vec2;
use tracing::{debug, info};

use crate::chunk_manager::{ChunkManager, StreamingConfig, StreamingDelta};
use crate::content::ContentTables;
use crate::layout::WorldLayout;
use crate::mob::{DamageOutcome, MobRegistry};
use crate::scene::Scene;
use crate::schedule::{DeferredAction, Scheduler};

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Chunk streaming changes
    pub streaming: StreamingDelta,
    /// Hit flashes that ended
    pub cleared_tints: usize,
    /// Mobs respawned
    pub respawned: usize,
    /// Tasks that fired after their target went away
    pub stale_tasks: usize,
}

/// The streamed world around one observer.
#[derive(Debug)]
pub struct World {
    chunks: ChunkManager,
}

impl World {
    /// Creates a world with nothing loaded.
    #[must_use]
    pub fn new(
        config: StreamingConfig,
        layout: WorldLayout,
        content: &ContentTables,
        rng: fastrand::Rng,
    ) -> Self {
        info!("Creating world (seed {})", config.seed.value());
        Self {
            chunks: ChunkManager::new(config, layout, content, rng),
        }
    }

    /// Returns the chunk manager.
    #[must_use]
    pub const fn chunks(&self) -> &ChunkManager {
        &self.chunks
    }

    /// Returns the chunk manager mutably.
    pub fn chunks_mut(&mut self) -> &mut ChunkManager {
        &mut self.chunks
    }

    /// Returns the live mobs.
    #[must_use]
    pub const fn mobs(&self) -> &MobRegistry {
        self.chunks.mobs()
    }

    /// Returns the deferred task queue.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        self.chunks.scheduler()
    }

    /// Sets the observer body that newly spawned mobs watch for overlaps.
    pub fn set_observer_entity(&mut self, observer: Option<EntityHandle>) {
        self.chunks.set_observer_entity(observer);
    }

    /// Advances the world by `dt` for an observer at `observer`.
    ///
    /// Streams chunks first, then runs due tasks, then mob behaviour.
    pub fn tick(&mut self, scene: &mut dyn Scene, observer: Vec2, dt: Duration) -> TickReport {
        let mut report = TickReport {
            streaming: self.chunks.update(scene, observer),
            ..TickReport::default()
        };

        let scheduler = self.chunks.scheduler_mut();
        scheduler.advance(dt);
        for task in scheduler.drain_due() {
            match task.action {
                DeferredAction::ClearTint { entity } => {
                    if self.chunks.mobs_mut().clear_flash(scene, entity) {
                        report.cleared_tints += 1;
                    } else {
                        debug!("Tint reset for {entity} fired after it was removed");
                        report.stale_tasks += 1;
                    }
                },
                DeferredAction::RespawnMob { chunk, generation } => {
                    if self.chunks.respawn(scene, chunk, generation).is_some() {
                        report.respawned += 1;
                    } else {
                        report.stale_tasks += 1;
                    }
                },
            }
        }

        self.chunks.update_mobs(scene, observer, dt);
        report
    }

    /// Damages a mob.
    ///
    /// A surviving mob flashes red until a scheduled reset. A killed mob is
    /// dropped from its chunk and a replacement is scheduled for that
    /// chunk's current load.
    pub fn damage_mob(
        &mut self,
        scene: &mut dyn Scene,
        entity: EntityHandle,
        amount: f32,
    ) -> Result<DamageOutcome, WorldError> {
        let outcome = self.chunks.mobs_mut().damage(scene, entity, amount)?;
        let flash = self.chunks.config().damage_flash;
        let respawn_delay = self.chunks.config().respawn_delay;

        match &outcome {
            DamageOutcome::Hurt { .. } => {
                let scheduler = self.chunks.scheduler_mut();
                scheduler.cancel_for_entity(entity);
                scheduler.schedule(flash, DeferredAction::ClearTint { entity });
            },
            DamageOutcome::Killed { home_chunk, .. } => {
                let chunk = *home_chunk;
                self.chunks.scheduler_mut().cancel_for_entity(entity);
                self.chunks.forget_mob(chunk, entity);
                if let Some(generation) = self.chunks.generation(chunk) {
                    self.chunks.scheduler_mut().schedule(
                        respawn_delay,
                        DeferredAction::RespawnMob { chunk, generation },
                    );
                }
            },
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;
    use crate::mob::DAMAGE_TINT;
    use arcforge_common::{ChunkCoord, TileCoord};

    fn world() -> World {
        World::new(
            StreamingConfig {
                mob_spawn_chance: 1.0,
                ..StreamingConfig::default()
            },
            WorldLayout::arcforge(),
            &ContentTables::default(),
            fastrand::Rng::with_seed(5),
        )
    }

    fn scene() -> HeadlessScene {
        let mut scene = HeadlessScene::new();
        for key in ContentTables::default().sprite_keys() {
            scene.register_asset(key);
        }
        scene
    }

    /// Observer parked in the western forest, far from the village.
    fn forest(world: &World) -> Vec2 {
        world.chunks().tile_to_world(TileCoord::new(42, 126))
    }

    fn first_mob(world: &World, chunk: ChunkCoord) -> EntityHandle {
        world.chunks().manifest(chunk).unwrap().mobs()[0]
    }

    #[test]
    fn test_tick_streams_then_runs_mobs() {
        let mut world = world();
        let mut scene = scene();
        let report = world.tick(&mut scene, forest(&world), Duration::from_millis(16));
        assert_eq!(report.streaming.loaded.len(), 25);
        assert!(!world.mobs().is_empty());
        assert!(world.mobs().iter().all(|mob| scene
            .entity(mob.entity)
            .is_some_and(|e| e.velocity != Vec2::ZERO)));
    }

    #[test]
    fn test_hit_flash_clears() {
        let mut world = world();
        let mut scene = scene();
        let observer = forest(&world);
        world.tick(&mut scene, observer, Duration::ZERO);
        let mob = first_mob(&world, ChunkCoord::new(3, 10));

        let outcome = world.damage_mob(&mut scene, mob, 1.0).unwrap();
        assert!(matches!(outcome, DamageOutcome::Hurt { .. }));
        assert_eq!(scene.entity(mob).unwrap().tint, Some(DAMAGE_TINT));

        let report = world.tick(&mut scene, observer, Duration::from_millis(100));
        assert_eq!(report.cleared_tints, 1);
        assert_ne!(scene.entity(mob).unwrap().tint, Some(DAMAGE_TINT));
    }

    #[test]
    fn test_kill_schedules_respawn() {
        let mut world = world();
        let mut scene = scene();
        let observer = forest(&world);
        let chunk = ChunkCoord::new(3, 10);
        world.tick(&mut scene, observer, Duration::ZERO);
        let mob = first_mob(&world, chunk);
        let before = world.chunks().manifest(chunk).unwrap().mobs().len();

        let DamageOutcome::Killed { xp, home_chunk, .. } =
            world.damage_mob(&mut scene, mob, 10_000.0).unwrap()
        else {
            panic!("mob should die");
        };
        assert!(xp > 0);
        assert_eq!(home_chunk, chunk);
        assert!(scene.entity(mob).is_none());
        assert_eq!(
            world.chunks().manifest(chunk).unwrap().mobs().len(),
            before - 1
        );
        assert_eq!(world.scheduler().pending(), 1);

        let report = world.tick(&mut scene, observer, Duration::from_secs(16));
        assert_eq!(report.respawned, 1);
        assert_eq!(world.chunks().manifest(chunk).unwrap().mobs().len(), before);
    }

    #[test]
    fn test_damage_unknown_entity() {
        let mut world = world();
        let mut scene = scene();
        let result = world.damage_mob(&mut scene, EntityHandle::from_raw(404), 5.0);
        assert!(matches!(result, Err(WorldError::EntityNotFound(_))));
    }

    #[test]
    fn test_unloading_home_chunk_cancels_respawn() {
        let mut world = world();
        let mut scene = scene();
        let chunk = ChunkCoord::new(3, 10);
        world.tick(&mut scene, forest(&world), Duration::ZERO);
        let mob = first_mob(&world, chunk);
        world.damage_mob(&mut scene, mob, 10_000.0).unwrap();
        assert_eq!(world.scheduler().pending(), 1);

        // Far enough east that chunk (3, 10) drops out
        let east = world.chunks().tile_to_world(TileCoord::new(200, 126));
        world.tick(&mut scene, east, Duration::ZERO);
        assert!(!world.chunks().is_loaded(chunk));
        assert_eq!(world.scheduler().pending(), 0);

        // Coming back creates a new load and nothing stale fires
        let report = world.tick(&mut scene, forest(&world), Duration::from_secs(20));
        assert!(world.chunks().is_loaded(chunk));
        assert_eq!(report.respawned, 0);
        assert_eq!(report.stale_tasks, 0);
    }

    #[test]
    fn test_flash_on_unloaded_mob_is_cancelled() {
        let mut world = world();
        let mut scene = scene();
        let chunk = ChunkCoord::new(3, 10);
        world.tick(&mut scene, forest(&world), Duration::ZERO);
        let mob = first_mob(&world, chunk);
        world.damage_mob(&mut scene, mob, 1.0).unwrap();

        let east = world.chunks().tile_to_world(TileCoord::new(200, 126));
        world.tick(&mut scene, east, Duration::ZERO);
        assert!(scene.entity(mob).is_none());
        assert_eq!(world.scheduler().pending(), 0);
    }
}
