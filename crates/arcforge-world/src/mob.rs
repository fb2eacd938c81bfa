//! Live mobs: spawning, chase/wander behaviour, health bars, damage.

use std::f32::consts::TAU;
use std::time::Duration;

use ahash::AHashMap;
use arcforge_common::{ChunkCoord, EntityHandle, VisualHandle, WorldError};
use glam::Vec2;
use thiserror::Error;
use tracing::{debug, warn};

use crate::content::{ContentTables, MobDef, FALLBACK_MOB};
use crate::scene::{
    AnimationState, Primitive, Scene, SceneError, SceneResult, Style, FALLBACK_SPRITE,
};

/// Time between wander direction changes.
pub const WANDER_INTERVAL: Duration = Duration::from_millis(2500);

/// Fraction of full speed used while wandering.
pub const WANDER_SPEED_FACTOR: f32 = 0.3;

/// Tint flashed on a hit.
pub const DAMAGE_TINT: u32 = 0x00ff_0000;

const BAR_SIZE: Vec2 = Vec2::new(24.0, 4.0);
const BAR_OFFSET: Vec2 = Vec2::new(0.0, -20.0);
const BAR_DEPTH: f32 = 10.0;
const BAR_BACKGROUND: u32 = 0x0033_3333;

/// Errors from spawning a mob.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// Neither the kind nor the fallback kind is defined
    #[error(transparent)]
    World(#[from] WorldError),

    /// The scene refused the entity even with the fallback sprite
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Behaviour state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MobState {
    /// Wandering slowly
    #[default]
    Idle,
    /// Running at the observer
    Chase,
}

/// Health bar visuals attached to a mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthBar {
    /// Dark backing bar
    pub background: VisualHandle,
    /// Coloured fill
    pub fill: VisualHandle,
}

/// A live mob.
#[derive(Debug, Clone)]
pub struct Mob {
    /// Scene entity
    pub entity: EntityHandle,
    /// Content key of the definition in use
    pub kind: String,
    /// Chunk that spawned the mob
    pub home_chunk: ChunkCoord,
    /// Current health
    pub hp: f32,
    /// Maximum health
    pub max_hp: f32,
    /// Chase speed
    pub speed: f32,
    /// Chase trigger distance
    pub aggro_range: f32,
    /// Experience on kill
    pub xp: u32,
    /// Resting tint
    pub tint: Option<u32>,
    /// Behaviour state
    pub state: MobState,
    wander_dir: Vec2,
    wander_timer: Duration,
    bar: Option<HealthBar>,
}

impl Mob {
    /// Remaining health as a fraction of maximum.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_hp <= 0.0 {
            0.0
        } else {
            (self.hp / self.max_hp).clamp(0.0, 1.0)
        }
    }

    /// Attached health bar, if it could be created.
    #[must_use]
    pub const fn health_bar(&self) -> Option<HealthBar> {
        self.bar
    }
}

/// Result of damaging a mob.
#[derive(Debug, Clone, PartialEq)]
pub enum DamageOutcome {
    /// The mob survived
    Hurt {
        /// Health left
        remaining: f32,
    },
    /// The mob died and was removed from the scene
    Killed {
        /// Content key
        kind: String,
        /// Experience awarded
        xp: u32,
        /// Chunk that spawned it
        home_chunk: ChunkCoord,
    },
}

/// Fill colour for a health fraction.
#[must_use]
pub fn health_color(fraction: f32) -> u32 {
    if fraction > 0.6 {
        0x002e_cc71
    } else if fraction > 0.3 {
        0x00f3_9c12
    } else {
        0x00e7_4c3c
    }
}

/// Owns every live mob.
#[derive(Debug, Default)]
pub struct MobRegistry {
    defs: AHashMap<String, MobDef>,
    mobs: AHashMap<EntityHandle, Mob>,
    fallback_sprites: u64,
}

impl MobRegistry {
    /// Creates a registry over the content's mob definitions.
    #[must_use]
    pub fn new(content: &ContentTables) -> Self {
        Self {
            defs: content
                .mobs
                .iter()
                .map(|def| (def.id.clone(), def.clone()))
                .collect(),
            mobs: AHashMap::new(),
            fallback_sprites: 0,
        }
    }

    /// Resolves a mob kind, falling back to the default kind.
    pub fn definition(&self, kind: &str) -> Result<&MobDef, WorldError> {
        if let Some(def) = self.defs.get(kind) {
            return Ok(def);
        }
        warn!("Unknown mob kind '{kind}', using '{FALLBACK_MOB}'");
        self.defs
            .get(FALLBACK_MOB)
            .ok_or_else(|| WorldError::UnknownMob(kind.to_string()))
    }

    /// Spawns a mob with its health bar.
    pub fn spawn(
        &mut self,
        scene: &mut dyn Scene,
        kind: &str,
        position: Vec2,
        home_chunk: ChunkCoord,
    ) -> Result<EntityHandle, SpawnError> {
        let def = self.definition(kind)?.clone();

        let entity = match scene.create_dynamic_entity(position, &def.sprite) {
            Ok(entity) => entity,
            Err(SceneError::MissingAsset(key)) => {
                warn!("Missing sprite '{key}' for mob '{}', using placeholder", def.id);
                self.fallback_sprites += 1;
                scene.create_dynamic_entity(position, FALLBACK_SPRITE)?
            },
            Err(e) => return Err(e.into()),
        };

        if let Some(tint) = def.tint {
            if let Err(e) = scene.set_tint(entity, Some(tint)) {
                warn!("Could not tint {entity}: {e}");
            }
        }

        let bar = create_bar(scene, position);
        let mob = Mob {
            entity,
            kind: def.id.clone(),
            home_chunk,
            hp: def.hp,
            max_hp: def.hp,
            speed: def.speed,
            aggro_range: def.aggro_range,
            xp: def.xp,
            tint: def.tint,
            state: MobState::Idle,
            wander_dir: Vec2::ZERO,
            wander_timer: Duration::ZERO,
            bar,
        };
        debug!("Spawned {} ({entity}) for chunk {home_chunk}", def.id);
        self.mobs.insert(entity, mob);
        Ok(entity)
    }

    /// Removes a mob and destroys its entity and health bar.
    pub fn despawn(&mut self, scene: &mut dyn Scene, entity: EntityHandle) -> Option<Mob> {
        let mob = self.mobs.remove(&entity)?;
        if let Some(bar) = mob.bar {
            scene.destroy_visual(bar.background);
            scene.destroy_visual(bar.fill);
        }
        scene.destroy_entity(entity);
        Some(mob)
    }

    /// Despawns every mob whose home is `chunk`.
    pub fn despawn_chunk(&mut self, scene: &mut dyn Scene, chunk: ChunkCoord) -> Vec<EntityHandle> {
        let doomed = self.mobs_in_chunk(chunk);
        for entity in &doomed {
            self.despawn(scene, *entity);
        }
        doomed
    }

    /// Applies damage. A killed mob is removed from the scene.
    pub fn damage(
        &mut self,
        scene: &mut dyn Scene,
        entity: EntityHandle,
        amount: f32,
    ) -> Result<DamageOutcome, WorldError> {
        let mob = self
            .mobs
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        mob.hp = (mob.hp - amount.max(0.0)).max(0.0);

        if mob.hp <= 0.0 {
            let kind = mob.kind.clone();
            let xp = mob.xp;
            let home_chunk = mob.home_chunk;
            self.despawn(scene, entity);
            debug!("{kind} ({entity}) killed");
            return Ok(DamageOutcome::Killed {
                kind,
                xp,
                home_chunk,
            });
        }

        if let Err(e) = scene.set_tint(entity, Some(DAMAGE_TINT)) {
            warn!("Could not flash {entity}: {e}");
        }
        if let (Some(bar), Some(position)) = (mob.bar, scene.entity_position(entity)) {
            place_bar(scene, bar, position, mob.health_fraction());
        }
        Ok(DamageOutcome::Hurt { remaining: mob.hp })
    }

    /// Restores a mob's resting tint. Returns false if the mob is gone.
    pub fn clear_flash(&mut self, scene: &mut dyn Scene, entity: EntityHandle) -> bool {
        let Some(mob) = self.mobs.get(&entity) else {
            return false;
        };
        scene.set_tint(entity, mob.tint).is_ok()
    }

    /// Runs chase/wander behaviour for every mob and moves health bars.
    ///
    /// Mobs are visited in handle order, so a seeded `rng` gives the same
    /// wander directions on every run.
    pub fn update(
        &mut self,
        scene: &mut dyn Scene,
        observer: Vec2,
        dt: Duration,
        rng: &mut fastrand::Rng,
    ) {
        let mut order: Vec<EntityHandle> = self.mobs.keys().copied().collect();
        order.sort_unstable();

        for entity in order {
            let Some(mob) = self.mobs.get_mut(&entity) else {
                continue;
            };
            let Some(position) = scene.entity_position(mob.entity) else {
                continue;
            };

            let to_observer = observer - position;
            let distance = to_observer.length();
            let velocity = if distance < mob.aggro_range && distance > 1.0 {
                mob.state = MobState::Chase;
                to_observer / distance * mob.speed
            } else {
                mob.state = MobState::Idle;
                mob.wander_timer = mob.wander_timer.saturating_sub(dt);
                if mob.wander_timer.is_zero() {
                    let angle = rng.f32() * TAU;
                    mob.wander_dir = Vec2::new(angle.cos(), angle.sin());
                    mob.wander_timer = WANDER_INTERVAL;
                }
                mob.wander_dir * mob.speed * WANDER_SPEED_FACTOR
            };

            if let Err(e) = steer(scene, mob, velocity) {
                debug!("Skipping behaviour for {}: {e}", mob.entity);
                continue;
            }
            if let Some(bar) = mob.bar {
                place_bar(scene, bar, position, mob.health_fraction());
            }
        }
    }

    /// Returns a live mob.
    #[must_use]
    pub fn get(&self, entity: EntityHandle) -> Option<&Mob> {
        self.mobs.get(&entity)
    }

    /// Iterates live mobs.
    pub fn iter(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.values()
    }

    /// Mobs whose home is `chunk`.
    #[must_use]
    pub fn mobs_in_chunk(&self, chunk: ChunkCoord) -> Vec<EntityHandle> {
        self.mobs
            .values()
            .filter(|mob| mob.home_chunk == chunk)
            .map(|mob| mob.entity)
            .collect()
    }

    /// Number of live mobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mobs.len()
    }

    /// Returns true if no mob is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty()
    }

    /// Number of mobs spawned with the placeholder sprite.
    #[must_use]
    pub const fn fallback_sprites(&self) -> u64 {
        self.fallback_sprites
    }
}

fn steer(scene: &mut dyn Scene, mob: &Mob, velocity: Vec2) -> SceneResult<()> {
    scene.set_velocity(mob.entity, velocity)?;
    let animation = match mob.state {
        MobState::Chase => AnimationState::Run,
        MobState::Idle => AnimationState::Idle,
    };
    scene.play_animation(mob.entity, animation)?;
    if velocity.x.abs() > f32::EPSILON {
        scene.set_flip_x(mob.entity, velocity.x < 0.0)?;
    }
    Ok(())
}

fn create_bar(scene: &mut dyn Scene, position: Vec2) -> Option<HealthBar> {
    let anchor = position + BAR_OFFSET;
    let background = scene
        .create_visual(
            &Primitive::Rect,
            anchor,
            BAR_SIZE,
            Style::solid(BAR_BACKGROUND, BAR_DEPTH),
        )
        .map_err(|e| warn!("Health bar unavailable: {e}"))
        .ok()?;
    match scene.create_visual(
        &Primitive::Rect,
        anchor,
        BAR_SIZE,
        Style::solid(health_color(1.0), BAR_DEPTH + 0.1),
    ) {
        Ok(fill) => Some(HealthBar { background, fill }),
        Err(e) => {
            warn!("Health bar unavailable: {e}");
            scene.destroy_visual(background);
            None
        },
    }
}

fn place_bar(scene: &mut dyn Scene, bar: HealthBar, position: Vec2, fraction: f32) {
    let anchor = position + BAR_OFFSET;
    scene.set_visual_position(bar.background, anchor);

    let width = BAR_SIZE.x * fraction;
    let left = anchor.x - BAR_SIZE.x * 0.5;
    scene.set_visual_position(bar.fill, Vec2::new(left + width * 0.5, anchor.y));
    scene.set_visual_style(
        bar.fill,
        Vec2::new(width, BAR_SIZE.y),
        Style::solid(health_color(fraction), BAR_DEPTH + 0.1),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;

    fn setup() -> (HeadlessScene, MobRegistry) {
        let content = ContentTables::default();
        let mut scene = HeadlessScene::new();
        for key in content.sprite_keys() {
            scene.register_asset(key);
        }
        (scene, MobRegistry::new(&content))
    }

    #[test]
    fn test_spawn_creates_entity_and_bar() {
        let (mut scene, mut mobs) = setup();
        let entity = mobs
            .spawn(&mut scene, "slime", Vec2::new(50.0, 50.0), ChunkCoord::new(1, 1))
            .unwrap();

        let mob = mobs.get(entity).unwrap();
        assert_eq!(mob.kind, "slime");
        assert!((mob.hp - 18.0).abs() < f32::EPSILON);
        assert!(mob.health_bar().is_some());
        assert_eq!(scene.visual_count(), 2);
        assert_eq!(scene.entity(entity).unwrap().tint, Some(0x002e_cc71));
    }

    #[test]
    fn test_unknown_kind_falls_back_to_orc() {
        let (mut scene, mut mobs) = setup();
        let entity = mobs
            .spawn(&mut scene, "dragon", Vec2::ZERO, ChunkCoord::new(0, 0))
            .unwrap();
        assert_eq!(mobs.get(entity).unwrap().kind, FALLBACK_MOB);
    }

    #[test]
    fn test_unknown_kind_without_fallback_fails() {
        let mut scene = HeadlessScene::new();
        let mut content = ContentTables::default();
        content.mobs.retain(|m| m.id != FALLBACK_MOB);
        let mut mobs = MobRegistry::new(&content);
        let err = mobs
            .spawn(&mut scene, "dragon", Vec2::ZERO, ChunkCoord::new(0, 0))
            .unwrap_err();
        assert!(matches!(err, SpawnError::World(WorldError::UnknownMob(_))));
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn test_missing_sprite_uses_placeholder() {
        let mut scene = HeadlessScene::new();
        let mut mobs = MobRegistry::new(&ContentTables::default());
        let entity = mobs
            .spawn(&mut scene, "orc", Vec2::ZERO, ChunkCoord::new(0, 0))
            .unwrap();
        assert_eq!(scene.entity(entity).unwrap().sprite, FALLBACK_SPRITE);
        assert_eq!(mobs.fallback_sprites(), 1);
    }

    #[test]
    fn test_damage_and_death() {
        let (mut scene, mut mobs) = setup();
        let entity = mobs
            .spawn(&mut scene, "orc", Vec2::ZERO, ChunkCoord::new(2, 3))
            .unwrap();

        let outcome = mobs.damage(&mut scene, entity, 20.0).unwrap();
        assert_eq!(outcome, DamageOutcome::Hurt { remaining: 10.0 });
        assert_eq!(scene.entity(entity).unwrap().tint, Some(DAMAGE_TINT));

        let bar = mobs.get(entity).unwrap().health_bar().unwrap();
        let fill = scene.visual(bar.fill).unwrap();
        assert_eq!(fill.style.color, health_color(1.0 / 3.0));
        assert!((fill.size.x - 8.0).abs() < 1e-4);

        assert!(mobs.clear_flash(&mut scene, entity));
        assert_eq!(scene.entity(entity).unwrap().tint, None);

        let outcome = mobs.damage(&mut scene, entity, 50.0).unwrap();
        assert_eq!(
            outcome,
            DamageOutcome::Killed {
                kind: "orc".into(),
                xp: 10,
                home_chunk: ChunkCoord::new(2, 3),
            }
        );
        assert!(mobs.is_empty());
        assert_eq!(scene.entity_count(), 0);
        assert_eq!(scene.visual_count(), 0);
        assert!(!mobs.clear_flash(&mut scene, entity));
        assert!(matches!(
            mobs.damage(&mut scene, entity, 1.0),
            Err(WorldError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_health_colors() {
        assert_eq!(health_color(0.9), 0x002e_cc71);
        assert_eq!(health_color(0.5), 0x00f3_9c12);
        assert_eq!(health_color(0.2), 0x00e7_4c3c);
    }

    #[test]
    fn test_chase_and_wander() {
        let (mut scene, mut mobs) = setup();
        let mut rng = fastrand::Rng::with_seed(3);
        let entity = mobs
            .spawn(&mut scene, "orc", Vec2::ZERO, ChunkCoord::new(0, 0))
            .unwrap();

        // Observer inside aggro range (120) to the left
        mobs.update(&mut scene, Vec2::new(-100.0, 0.0), Duration::from_millis(16), &mut rng);
        let body = scene.entity(entity).unwrap();
        assert_eq!(mobs.get(entity).unwrap().state, MobState::Chase);
        assert_eq!(body.animation, AnimationState::Run);
        assert!((body.velocity - Vec2::new(-45.0, 0.0)).length() < 1e-3);
        assert!(body.flip_x);

        // Far away: wander at 30% speed
        mobs.update(&mut scene, Vec2::new(5_000.0, 0.0), Duration::from_millis(16), &mut rng);
        let body = scene.entity(entity).unwrap();
        assert_eq!(mobs.get(entity).unwrap().state, MobState::Idle);
        assert_eq!(body.animation, AnimationState::Idle);
        assert!((body.velocity.length() - 45.0 * WANDER_SPEED_FACTOR).abs() < 1e-3);
    }

    #[test]
    fn test_wander_direction_holds_for_interval() {
        let (mut scene, mut mobs) = setup();
        let mut rng = fastrand::Rng::with_seed(11);
        let entity = mobs
            .spawn(&mut scene, "bat", Vec2::ZERO, ChunkCoord::new(0, 0))
            .unwrap();
        let far = Vec2::new(9_000.0, 9_000.0);

        mobs.update(&mut scene, far, Duration::from_millis(100), &mut rng);
        let first = scene.entity(entity).unwrap().velocity;
        mobs.update(&mut scene, far, Duration::from_millis(1_000), &mut rng);
        assert_eq!(scene.entity(entity).unwrap().velocity, first);
    }

    #[test]
    fn test_same_rng_same_wander() {
        let run = || {
            let (mut scene, mut mobs) = setup();
            let mut rng = fastrand::Rng::with_seed(21);
            let spawned: Vec<_> = (0..8)
                .map(|i| {
                    let position = Vec2::new(i as f32 * 40.0, 0.0);
                    mobs.spawn(&mut scene, "slime", position, ChunkCoord::new(0, 0))
                        .unwrap()
                })
                .collect();
            mobs.update(&mut scene, Vec2::splat(9_000.0), Duration::from_millis(16), &mut rng);
            spawned
                .iter()
                .map(|e| scene.entity(*e).unwrap().velocity)
                .collect::<Vec<_>>()
        };

        let first = run();
        for _ in 0..4 {
            assert_eq!(run(), first);
        }
    }

    #[test]
    fn test_bar_follows_mob() {
        let (mut scene, mut mobs) = setup();
        let mut rng = fastrand::Rng::with_seed(5);
        let entity = mobs
            .spawn(&mut scene, "orc", Vec2::ZERO, ChunkCoord::new(0, 0))
            .unwrap();
        scene.set_velocity(entity, Vec2::new(10.0, 0.0)).unwrap();
        scene.step(Duration::from_secs(1));

        mobs.update(&mut scene, Vec2::new(9_000.0, 0.0), Duration::ZERO, &mut rng);
        let bar = mobs.get(entity).unwrap().health_bar().unwrap();
        let position = scene.visual(bar.background).unwrap().position;
        assert_eq!(position, Vec2::new(10.0, -20.0));
    }

    #[test]
    fn test_despawn_chunk() {
        let (mut scene, mut mobs) = setup();
        let home = ChunkCoord::new(4, 4);
        mobs.spawn(&mut scene, "orc", Vec2::ZERO, home).unwrap();
        mobs.spawn(&mut scene, "bat", Vec2::ZERO, home).unwrap();
        mobs.spawn(&mut scene, "bat", Vec2::ZERO, ChunkCoord::new(5, 4))
            .unwrap();

        assert_eq!(mobs.despawn_chunk(&mut scene, home).len(), 2);
        assert_eq!(mobs.len(), 1);
        assert_eq!(scene.entity_count(), 1);
        assert_eq!(scene.visual_count(), 2);
    }
}
