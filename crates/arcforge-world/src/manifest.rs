//! Per-chunk record of every scene resource the chunk owns.

use arcforge_common::{ColliderHandle, EntityHandle, VisualHandle};

use crate::mob::HealthBar;
use crate::scene::Scene;

/// A placed obstacle: its visual parts plus exactly one collider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObstacleRecord {
    /// Visual parts
    pub parts: Vec<VisualHandle>,
    /// Collider in the obstacle group
    pub collider: ColliderHandle,
}

/// Any handle recorded in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestEntry {
    /// Visual primitive
    Visual(VisualHandle),
    /// Static collider
    Collider(ColliderHandle),
    /// Dynamic entity
    Entity(EntityHandle),
}

/// Resources owned by one loaded chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkManifest {
    terrain: Vec<VisualHandle>,
    decorations: Vec<VisualHandle>,
    obstacles: Vec<ObstacleRecord>,
    water_colliders: Vec<ColliderHandle>,
    mobs: Vec<EntityHandle>,
    health_bars: Vec<(EntityHandle, HealthBar)>,
}

impl ChunkManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a ground tile visual.
    pub fn record_terrain(&mut self, handle: VisualHandle) {
        self.terrain.push(handle);
    }

    /// Records a decoration visual.
    pub fn record_decoration(&mut self, handle: VisualHandle) {
        self.decorations.push(handle);
    }

    /// Records an obstacle.
    pub fn record_obstacle(&mut self, parts: Vec<VisualHandle>, collider: ColliderHandle) {
        self.obstacles.push(ObstacleRecord { parts, collider });
    }

    /// Records a water collider.
    pub fn record_water_collider(&mut self, handle: ColliderHandle) {
        self.water_colliders.push(handle);
    }

    /// Records a spawned mob and the visuals of its health bar.
    pub fn record_mob(&mut self, entity: EntityHandle, bar: Option<HealthBar>) {
        self.mobs.push(entity);
        if let Some(bar) = bar {
            self.health_bars.push((entity, bar));
        }
    }

    /// Drops a mob that was removed independently (death), together with its
    /// health bar. Returns whether it was recorded.
    pub fn forget_mob(&mut self, entity: EntityHandle) -> bool {
        let before = self.mobs.len();
        self.mobs.retain(|m| *m != entity);
        self.health_bars.retain(|(owner, _)| *owner != entity);
        self.mobs.len() != before
    }

    /// Ground tile visuals.
    #[must_use]
    pub fn terrain(&self) -> &[VisualHandle] {
        &self.terrain
    }

    /// Decoration visuals.
    #[must_use]
    pub fn decorations(&self) -> &[VisualHandle] {
        &self.decorations
    }

    /// Placed obstacles.
    #[must_use]
    pub fn obstacles(&self) -> &[ObstacleRecord] {
        &self.obstacles
    }

    /// Water colliders.
    #[must_use]
    pub fn water_colliders(&self) -> &[ColliderHandle] {
        &self.water_colliders
    }

    /// Mobs spawned for this chunk and still alive.
    #[must_use]
    pub fn mobs(&self) -> &[EntityHandle] {
        &self.mobs
    }

    /// Health bars of the recorded mobs.
    #[must_use]
    pub fn health_bars(&self) -> &[(EntityHandle, HealthBar)] {
        &self.health_bars
    }

    /// Iterates every recorded handle.
    pub fn handles(&self) -> impl Iterator<Item = ManifestEntry> + '_ {
        let visuals = self
            .terrain
            .iter()
            .chain(&self.decorations)
            .chain(self.obstacles.iter().flat_map(|o| &o.parts))
            .copied()
            .chain(
                self.health_bars
                    .iter()
                    .flat_map(|(_, bar)| [bar.background, bar.fill]),
            )
            .map(ManifestEntry::Visual);
        let colliders = self
            .obstacles
            .iter()
            .map(|o| o.collider)
            .chain(self.water_colliders.iter().copied())
            .map(ManifestEntry::Collider);
        let entities = self.mobs.iter().copied().map(ManifestEntry::Entity);
        visuals.chain(colliders).chain(entities)
    }

    /// Number of recorded handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terrain.len()
            + self.decorations.len()
            + self
                .obstacles
                .iter()
                .map(|o| o.parts.len() + 1)
                .sum::<usize>()
            + self.water_colliders.len()
            + self.mobs.len()
            + 2 * self.health_bars.len()
    }

    /// Returns true if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroys every recorded resource and empties the manifest.
    ///
    /// Colliders are deregistered from their group. Handles already gone
    /// from the scene are skipped by the scene itself.
    pub fn release(&mut self, scene: &mut dyn Scene) -> usize {
        let released = self.len();
        for handle in self.terrain.drain(..).chain(self.decorations.drain(..)) {
            scene.destroy_visual(handle);
        }
        for obstacle in self.obstacles.drain(..) {
            for part in obstacle.parts {
                scene.destroy_visual(part);
            }
            scene.remove_from_group(obstacle.collider);
        }
        for collider in self.water_colliders.drain(..) {
            scene.remove_from_group(collider);
        }
        for (_, bar) in self.health_bars.drain(..) {
            scene.destroy_visual(bar.background);
            scene.destroy_visual(bar.fill);
        }
        for entity in self.mobs.drain(..) {
            scene.destroy_entity(entity);
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;
    use crate::scene::{CollisionGroup, Primitive, Style, FALLBACK_SPRITE};
    use glam::Vec2;

    fn rect(scene: &mut HeadlessScene) -> VisualHandle {
        scene
            .create_visual(&Primitive::Rect, Vec2::ZERO, Vec2::ONE, Style::solid(0, 0.0))
            .unwrap()
    }

    #[test]
    fn test_len_and_handles_agree() {
        let mut scene = HeadlessScene::new();
        let mut manifest = ChunkManifest::new();
        assert!(manifest.is_empty());

        manifest.record_terrain(rect(&mut scene));
        manifest.record_decoration(rect(&mut scene));
        let parts = vec![rect(&mut scene), rect(&mut scene)];
        let collider =
            scene.create_static_collider(CollisionGroup::Obstacles, Vec2::ZERO, Vec2::ONE);
        manifest.record_obstacle(parts, collider);
        manifest.record_water_collider(scene.create_static_collider(
            CollisionGroup::Water,
            Vec2::ZERO,
            Vec2::ONE,
        ));
        let bar = HealthBar {
            background: rect(&mut scene),
            fill: rect(&mut scene),
        };
        manifest.record_mob(
            scene.create_dynamic_entity(Vec2::ZERO, FALLBACK_SPRITE).unwrap(),
            Some(bar),
        );

        assert_eq!(manifest.len(), 9);
        let handles: Vec<_> = manifest.handles().collect();
        assert_eq!(handles.len(), 9);
        assert!(handles.contains(&ManifestEntry::Collider(collider)));
        assert!(handles.contains(&ManifestEntry::Visual(bar.fill)));
        // Every visual created above is recorded exactly once
        let visuals = handles
            .iter()
            .filter(|h| matches!(h, ManifestEntry::Visual(_)))
            .count();
        assert_eq!(visuals, scene.visual_count());
    }

    #[test]
    fn test_release_frees_everything() {
        let mut scene = HeadlessScene::new();
        let mut manifest = ChunkManifest::new();
        manifest.record_terrain(rect(&mut scene));
        let part = rect(&mut scene);
        let collider =
            scene.create_static_collider(CollisionGroup::Obstacles, Vec2::ZERO, Vec2::ONE);
        manifest.record_obstacle(vec![part], collider);
        let mob = scene.create_dynamic_entity(Vec2::ZERO, FALLBACK_SPRITE).unwrap();
        let bar = HealthBar {
            background: rect(&mut scene),
            fill: rect(&mut scene),
        };
        manifest.record_mob(mob, Some(bar));

        assert_eq!(manifest.release(&mut scene), 6);
        assert!(manifest.is_empty());
        assert_eq!(scene.visual_count(), 0);
        assert_eq!(scene.collider_count(CollisionGroup::Obstacles), 0);
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn test_release_tolerates_dead_mobs() {
        let mut scene = HeadlessScene::new();
        let mut manifest = ChunkManifest::new();
        let mob = scene.create_dynamic_entity(Vec2::ZERO, FALLBACK_SPRITE).unwrap();
        let bar = HealthBar {
            background: rect(&mut scene),
            fill: rect(&mut scene),
        };
        manifest.record_mob(mob, Some(bar));
        scene.destroy_entity(mob);
        scene.destroy_visual(bar.background);
        scene.destroy_visual(bar.fill);

        assert_eq!(manifest.release(&mut scene), 3);
        assert_eq!(scene.entity_count(), 0);
        assert_eq!(scene.visual_count(), 0);
    }

    #[test]
    fn test_forget_mob() {
        let mut manifest = ChunkManifest::new();
        let mob = EntityHandle::from_raw(3);
        let bar = HealthBar {
            background: VisualHandle::from_raw(4),
            fill: VisualHandle::from_raw(5),
        };
        manifest.record_mob(mob, Some(bar));
        manifest.record_mob(EntityHandle::from_raw(6), None);
        assert_eq!(manifest.len(), 4);

        assert!(manifest.forget_mob(mob));
        assert!(!manifest.forget_mob(mob));
        assert!(manifest.health_bars().is_empty());
        assert_eq!(manifest.len(), 1);
    }
}
