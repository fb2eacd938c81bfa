//! In-memory scene used by the headless driver and by tests.
//!
//! Handle ids are never reused. Overlaps are resolved as axis-aligned boxes
//! during [`HeadlessScene::step`].

use std::time::Duration;

use ahash::{AHashMap, AHashSet};
use arcforge_common::{ColliderHandle, EntityHandle, VisualHandle};
use glam::Vec2;
use tracing::debug;

use crate::scene::{
    AnimationState, CollisionGroup, OverlapEvent, OverlapHit, OverlapTarget, Primitive, Scene,
    SceneError, SceneResult, Style, FALLBACK_SPRITE,
};

/// Body size given to every dynamic entity.
pub const ENTITY_BODY_SIZE: Vec2 = Vec2::new(20.0, 20.0);

/// Sprite key of the observer body.
pub const OBSERVER_SPRITE: &str = "observer";

/// A live visual primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualRecord {
    /// Shape
    pub primitive: Primitive,
    /// Centre position
    pub position: Vec2,
    /// Size box
    pub size: Vec2,
    /// Fill
    pub style: Style,
}

/// A live static collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderRecord {
    /// Owning group
    pub group: CollisionGroup,
    /// Centre position
    pub position: Vec2,
    /// Box size
    pub size: Vec2,
}

/// A live dynamic entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Sprite key
    pub sprite: String,
    /// Centre position
    pub position: Vec2,
    /// Velocity in world units per second
    pub velocity: Vec2,
    /// Body size
    pub size: Vec2,
    /// Current tint
    pub tint: Option<u32>,
    /// Current animation
    pub animation: AnimationState,
    /// Horizontal mirror
    pub flip_x: bool,
}

/// Scene that keeps everything in hash maps.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    next_id: u64,
    assets: AHashSet<String>,
    visuals: AHashMap<VisualHandle, VisualRecord>,
    colliders: AHashMap<ColliderHandle, ColliderRecord>,
    entities: AHashMap<EntityHandle, EntityRecord>,
    overlaps: Vec<(EntityHandle, OverlapTarget)>,
    events: Vec<OverlapEvent>,
    visuals_created: u64,
}

impl HeadlessScene {
    /// Creates an empty scene that only knows the fallback sprite.
    #[must_use]
    pub fn new() -> Self {
        let mut scene = Self::default();
        scene.register_asset(FALLBACK_SPRITE);
        scene.register_asset(OBSERVER_SPRITE);
        scene
    }

    /// Makes a sprite key available.
    pub fn register_asset(&mut self, key: impl Into<String>) {
        self.assets.insert(key.into());
    }

    /// Checks whether a sprite key is available.
    #[must_use]
    pub fn has_asset(&self, key: &str) -> bool {
        self.assets.contains(key)
    }

    /// Creates the observer body.
    pub fn spawn_observer(&mut self, position: Vec2) -> EntityHandle {
        let handle = EntityHandle::from_raw(self.allocate());
        self.entities.insert(handle, Self::entity_record(OBSERVER_SPRITE, position));
        handle
    }

    /// Advances entity positions by their velocities and resolves overlaps.
    pub fn step(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        for entity in self.entities.values_mut() {
            entity.position += entity.velocity * seconds;
        }

        let entities = &self.entities;
        self.overlaps.retain(|(entity, target)| {
            entities.contains_key(entity)
                && match target {
                    OverlapTarget::Group(_) => true,
                    OverlapTarget::Entity(other) => entities.contains_key(other),
                }
        });

        for (entity, target) in &self.overlaps {
            let Some(body) = self.entities.get(entity) else {
                continue;
            };
            match target {
                OverlapTarget::Group(group) => {
                    for (handle, collider) in &self.colliders {
                        if collider.group == *group
                            && aabb_overlap(body.position, body.size, collider.position, collider.size)
                        {
                            self.events.push(OverlapEvent {
                                entity: *entity,
                                other: OverlapHit::Collider(*handle),
                            });
                        }
                    }
                },
                OverlapTarget::Entity(other) => {
                    if let Some(other_body) = self.entities.get(other) {
                        if aabb_overlap(body.position, body.size, other_body.position, other_body.size)
                        {
                            self.events.push(OverlapEvent {
                                entity: *entity,
                                other: OverlapHit::Entity(*other),
                            });
                        }
                    }
                },
            }
        }
    }

    /// Takes every overlap event reported since the last drain.
    pub fn drain_overlaps(&mut self) -> Vec<OverlapEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of live visuals.
    #[must_use]
    pub fn visual_count(&self) -> usize {
        self.visuals.len()
    }

    /// Number of visuals ever created.
    #[must_use]
    pub const fn visuals_created(&self) -> u64 {
        self.visuals_created
    }

    /// Number of live colliders in a group.
    #[must_use]
    pub fn collider_count(&self, group: CollisionGroup) -> usize {
        self.colliders.values().filter(|c| c.group == group).count()
    }

    /// Number of live dynamic entities, the observer included.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of registered overlap pairs.
    #[must_use]
    pub fn overlap_count(&self) -> usize {
        self.overlaps.len()
    }

    /// Returns a live visual.
    #[must_use]
    pub fn visual(&self, handle: VisualHandle) -> Option<&VisualRecord> {
        self.visuals.get(&handle)
    }

    /// Returns a live collider.
    #[must_use]
    pub fn collider(&self, handle: ColliderHandle) -> Option<&ColliderRecord> {
        self.colliders.get(&handle)
    }

    /// Returns a live entity.
    #[must_use]
    pub fn entity(&self, handle: EntityHandle) -> Option<&EntityRecord> {
        self.entities.get(&handle)
    }

    /// Moves an entity without integrating velocity.
    pub fn teleport(&mut self, entity: EntityHandle, position: Vec2) -> SceneResult<()> {
        self.entity_mut(entity)?.position = position;
        Ok(())
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn entity_record(sprite: &str, position: Vec2) -> EntityRecord {
        EntityRecord {
            sprite: sprite.to_string(),
            position,
            velocity: Vec2::ZERO,
            size: ENTITY_BODY_SIZE,
            tint: None,
            animation: AnimationState::Idle,
            flip_x: false,
        }
    }

    fn entity_mut(&mut self, entity: EntityHandle) -> SceneResult<&mut EntityRecord> {
        self.entities
            .get_mut(&entity)
            .ok_or(SceneError::UnknownEntity(entity))
    }
}

fn aabb_overlap(a_pos: Vec2, a_size: Vec2, b_pos: Vec2, b_size: Vec2) -> bool {
    let delta = (a_pos - b_pos).abs();
    let reach = (a_size + b_size) * 0.5;
    delta.x < reach.x && delta.y < reach.y
}

impl Scene for HeadlessScene {
    fn create_visual(
        &mut self,
        primitive: &Primitive,
        position: Vec2,
        size: Vec2,
        style: Style,
    ) -> SceneResult<VisualHandle> {
        if let Primitive::Sprite { key } = primitive {
            if !self.assets.contains(key) {
                return Err(SceneError::MissingAsset(key.clone()));
            }
        }
        let handle = VisualHandle::from_raw(self.allocate());
        self.visuals.insert(
            handle,
            VisualRecord {
                primitive: primitive.clone(),
                position,
                size,
                style,
            },
        );
        self.visuals_created += 1;
        Ok(handle)
    }

    fn destroy_visual(&mut self, handle: VisualHandle) {
        self.visuals.remove(&handle);
    }

    fn create_static_collider(
        &mut self,
        group: CollisionGroup,
        position: Vec2,
        size: Vec2,
    ) -> ColliderHandle {
        let handle = ColliderHandle::from_raw(self.allocate());
        self.colliders.insert(
            handle,
            ColliderRecord {
                group,
                position,
                size,
            },
        );
        handle
    }

    fn remove_from_group(&mut self, handle: ColliderHandle) {
        self.colliders.remove(&handle);
    }

    fn create_dynamic_entity(
        &mut self,
        position: Vec2,
        sprite_key: &str,
    ) -> SceneResult<EntityHandle> {
        if !self.assets.contains(sprite_key) {
            return Err(SceneError::MissingAsset(sprite_key.to_string()));
        }
        let handle = EntityHandle::from_raw(self.allocate());
        self.entities
            .insert(handle, Self::entity_record(sprite_key, position));
        Ok(handle)
    }

    fn destroy_entity(&mut self, handle: EntityHandle) {
        if self.entities.remove(&handle).is_some() {
            self.overlaps.retain(|(entity, target)| {
                *entity != handle && *target != OverlapTarget::Entity(handle)
            });
        }
    }

    fn set_velocity(&mut self, entity: EntityHandle, velocity: Vec2) -> SceneResult<()> {
        self.entity_mut(entity)?.velocity = velocity;
        Ok(())
    }

    fn set_tint(&mut self, entity: EntityHandle, tint: Option<u32>) -> SceneResult<()> {
        self.entity_mut(entity)?.tint = tint;
        Ok(())
    }

    fn play_animation(&mut self, entity: EntityHandle, state: AnimationState) -> SceneResult<()> {
        self.entity_mut(entity)?.animation = state;
        Ok(())
    }

    fn set_flip_x(&mut self, entity: EntityHandle, flip: bool) -> SceneResult<()> {
        self.entity_mut(entity)?.flip_x = flip;
        Ok(())
    }

    fn entity_position(&self, entity: EntityHandle) -> Option<Vec2> {
        self.entities.get(&entity).map(|e| e.position)
    }

    fn set_visual_position(&mut self, handle: VisualHandle, position: Vec2) {
        if let Some(visual) = self.visuals.get_mut(&handle) {
            visual.position = position;
        }
    }

    fn set_visual_style(&mut self, handle: VisualHandle, size: Vec2, style: Style) {
        if let Some(visual) = self.visuals.get_mut(&handle) {
            visual.size = size;
            visual.style = style;
        }
    }

    fn add_overlap(&mut self, entity: EntityHandle, target: OverlapTarget) {
        if !self.entities.contains_key(&entity) {
            debug!("Ignoring overlap for dead {entity}");
            return;
        }
        self.overlaps.push((entity, target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sprite_is_reported() {
        let mut scene = HeadlessScene::new();
        let sprite = Primitive::Sprite { key: "tree".into() };
        let err = scene
            .create_visual(&sprite, Vec2::ZERO, Vec2::ONE, Style::solid(0, 0.0))
            .unwrap_err();
        assert_eq!(err, SceneError::MissingAsset("tree".into()));

        scene.register_asset("tree");
        assert!(scene
            .create_visual(&sprite, Vec2::ZERO, Vec2::ONE, Style::solid(0, 0.0))
            .is_ok());
        assert!(scene.create_dynamic_entity(Vec2::ZERO, FALLBACK_SPRITE).is_ok());
    }

    #[test]
    fn test_handles_never_reused() {
        let mut scene = HeadlessScene::new();
        let a = scene
            .create_visual(&Primitive::Rect, Vec2::ZERO, Vec2::ONE, Style::solid(0, 0.0))
            .unwrap();
        scene.destroy_visual(a);
        let b = scene
            .create_visual(&Primitive::Rect, Vec2::ZERO, Vec2::ONE, Style::solid(0, 0.0))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(scene.visual_count(), 1);
        assert_eq!(scene.visuals_created(), 2);
    }

    #[test]
    fn test_destroy_absent_handles_is_noop() {
        let mut scene = HeadlessScene::new();
        scene.destroy_visual(VisualHandle::from_raw(99));
        scene.remove_from_group(ColliderHandle::from_raw(99));
        scene.destroy_entity(EntityHandle::from_raw(99));
        assert_eq!(scene.visual_count(), 0);
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn test_collider_groups() {
        let mut scene = HeadlessScene::new();
        let rock = scene.create_static_collider(CollisionGroup::Obstacles, Vec2::ZERO, Vec2::ONE);
        scene.create_static_collider(CollisionGroup::Water, Vec2::ZERO, Vec2::ONE);
        assert_eq!(scene.collider_count(CollisionGroup::Obstacles), 1);
        scene.remove_from_group(rock);
        assert_eq!(scene.collider_count(CollisionGroup::Obstacles), 0);
        assert_eq!(scene.collider_count(CollisionGroup::Water), 1);
    }

    #[test]
    fn test_step_moves_entities_and_reports_overlaps() {
        let mut scene = HeadlessScene::new();
        let rock = scene.create_static_collider(
            CollisionGroup::Obstacles,
            Vec2::new(100.0, 0.0),
            Vec2::new(16.0, 16.0),
        );
        let mob = scene.create_dynamic_entity(Vec2::ZERO, FALLBACK_SPRITE).unwrap();
        scene.add_overlap(mob, OverlapTarget::Group(CollisionGroup::Obstacles));

        scene.step(Duration::from_secs(1));
        assert!(scene.drain_overlaps().is_empty());

        scene.set_velocity(mob, Vec2::new(90.0, 0.0)).unwrap();
        scene.step(Duration::from_secs(1));
        assert_eq!(scene.entity_position(mob), Some(Vec2::new(90.0, 0.0)));
        assert_eq!(
            scene.drain_overlaps(),
            vec![OverlapEvent {
                entity: mob,
                other: OverlapHit::Collider(rock),
            }]
        );
        assert!(scene.drain_overlaps().is_empty());
    }

    #[test]
    fn test_entity_overlap_pruned_on_destroy() {
        let mut scene = HeadlessScene::new();
        let observer = scene.spawn_observer(Vec2::ZERO);
        let mob = scene.create_dynamic_entity(Vec2::new(5.0, 0.0), FALLBACK_SPRITE).unwrap();
        scene.add_overlap(mob, OverlapTarget::Entity(observer));

        scene.step(Duration::ZERO);
        assert_eq!(scene.drain_overlaps().len(), 1);

        scene.destroy_entity(mob);
        assert_eq!(scene.overlap_count(), 0);
        assert!(scene.set_tint(mob, Some(0xff0000)).is_err());
    }
}
