//! The narrow rendering/physics interface the world streams into.
//!
//! Positions and sizes are in world units. Every position is the centre of
//! the primitive, collider, or entity body.

use arcforge_common::{ColliderHandle, EntityHandle, VisualHandle};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sprite key every scene must accept for dynamic entities.
pub const FALLBACK_SPRITE: &str = "placeholder";

/// Errors reported by a scene.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Sprite key not registered with the scene
    #[error("Missing asset: {0}")]
    MissingAsset(String),

    /// Entity handle is not (or no longer) alive
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityHandle),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Shape of a visual primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    /// Filled rectangle
    Rect,
    /// Filled circle inscribed in the size box
    Circle,
    /// Textured sprite
    Sprite {
        /// Asset key
        key: String,
    },
}

/// Fill parameters of a visual primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Fill colour (0xRRGGBB)
    pub color: u32,
    /// Opacity in `[0, 1]`
    pub alpha: f32,
    /// Draw order, higher is drawn later
    pub depth: f32,
}

impl Style {
    /// Creates an opaque style.
    #[must_use]
    pub const fn solid(color: u32, depth: f32) -> Self {
        Self {
            color,
            alpha: 1.0,
            depth,
        }
    }

    /// Returns the style with a different opacity.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Named static collision groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionGroup {
    /// Trees, rocks, graves and the like
    Obstacles,
    /// Impassable water tiles
    Water,
}

/// Two-state entity animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnimationState {
    /// Standing or wandering slowly
    #[default]
    Idle,
    /// Moving with purpose
    Run,
}

/// What an entity can be registered to overlap with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlapTarget {
    /// Every collider of a static group
    Group(CollisionGroup),
    /// A single other entity
    Entity(EntityHandle),
}

/// The other party of a reported overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlapHit {
    /// A static collider
    Collider(ColliderHandle),
    /// A dynamic entity
    Entity(EntityHandle),
}

/// A single overlap reported by the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlapEvent {
    /// The entity that registered the overlap
    pub entity: EntityHandle,
    /// What it overlapped with
    pub other: OverlapHit,
}

/// Host renderer and physics world.
///
/// Destroy and remove calls on absent handles are no-ops.
pub trait Scene {
    /// Creates a visual primitive.
    fn create_visual(
        &mut self,
        primitive: &Primitive,
        position: Vec2,
        size: Vec2,
        style: Style,
    ) -> SceneResult<VisualHandle>;

    /// Destroys a visual primitive.
    fn destroy_visual(&mut self, handle: VisualHandle);

    /// Creates a static collider and registers it in a collision group.
    fn create_static_collider(
        &mut self,
        group: CollisionGroup,
        position: Vec2,
        size: Vec2,
    ) -> ColliderHandle;

    /// Deregisters a collider from its group and destroys it.
    fn remove_from_group(&mut self, handle: ColliderHandle);

    /// Creates a dynamic entity with the given sprite.
    fn create_dynamic_entity(&mut self, position: Vec2, sprite_key: &str)
        -> SceneResult<EntityHandle>;

    /// Destroys a dynamic entity and every overlap registered for it.
    fn destroy_entity(&mut self, handle: EntityHandle);

    /// Sets an entity's velocity in world units per second.
    fn set_velocity(&mut self, entity: EntityHandle, velocity: Vec2) -> SceneResult<()>;

    /// Sets or clears an entity's tint.
    fn set_tint(&mut self, entity: EntityHandle, tint: Option<u32>) -> SceneResult<()>;

    /// Plays one of the two entity animations.
    fn play_animation(&mut self, entity: EntityHandle, state: AnimationState) -> SceneResult<()>;

    /// Mirrors an entity horizontally.
    fn set_flip_x(&mut self, entity: EntityHandle, flip: bool) -> SceneResult<()>;

    /// Returns an entity's current position, or `None` if it is gone.
    fn entity_position(&self, entity: EntityHandle) -> Option<Vec2>;

    /// Moves a visual primitive.
    fn set_visual_position(&mut self, handle: VisualHandle, position: Vec2);

    /// Resizes and restyles a visual primitive.
    fn set_visual_style(&mut self, handle: VisualHandle, size: Vec2, style: Style);

    /// Registers an overlap pair for the entity.
    fn add_overlap(&mut self, entity: EntityHandle, target: OverlapTarget);
}
