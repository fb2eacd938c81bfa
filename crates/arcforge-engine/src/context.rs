//! Player-side game state owned by the frame loop.

use glam::Vec2;
use tracing::info;

/// Coins lost on defeat.
pub const DEFEAT_COIN_PENALTY: u32 = 20;

/// Observer stats and progress.
#[derive(Debug, Clone, PartialEq)]
pub struct GameContext {
    /// World position of the observer
    pub position: Vec2,
    /// Current health
    pub hp: f32,
    /// Maximum health
    pub max_hp: f32,
    /// Experience towards the next level
    pub xp: u32,
    /// Current level
    pub level: u32,
    /// Coins carried
    pub coins: u32,
    /// Mobs killed
    pub kills: u32,
    /// Times the observer was defeated
    pub defeats: u32,
}

impl GameContext {
    /// Creates a fresh context at `position`.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            hp: 100.0,
            max_hp: 100.0,
            xp: 0,
            level: 1,
            coins: 120,
            kills: 0,
            defeats: 0,
        }
    }

    /// Experience needed to leave the current level.
    #[must_use]
    pub const fn xp_to_next_level(&self) -> u32 {
        self.level * 50
    }

    /// Adds experience. Returns true if the observer levelled up.
    ///
    /// A level up spends the threshold, raises max health by 10 and heals fully.
    pub fn award_xp(&mut self, xp: u32) -> bool {
        self.xp += xp;
        let needed = self.xp_to_next_level();
        if self.xp < needed {
            return false;
        }

        self.xp -= needed;
        self.level += 1;
        self.max_hp += 10.0;
        self.hp = self.max_hp;
        info!("Level up! Now level {}", self.level);
        true
    }

    /// Applies damage and returns the amount actually taken.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        let actual = amount.max(0.0).min(self.hp);
        self.hp -= actual;
        actual
    }

    /// Returns true once health reaches zero.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.hp <= 0.0
    }

    /// Brings the observer back at `position` with half health and a coin penalty.
    pub fn respawn_at(&mut self, position: Vec2) {
        self.hp = (self.max_hp * 0.5).floor();
        self.coins = self.coins.saturating_sub(DEFEAT_COIN_PENALTY);
        self.defeats += 1;
        self.position = position;
    }

    /// Health as a fraction of maximum.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_hp <= 0.0 {
            0.0
        } else {
            (self.hp / self.max_hp).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context() {
        let ctx = GameContext::new(Vec2::new(4112.0, 4112.0));
        assert_eq!(ctx.level, 1);
        assert_eq!(ctx.coins, 120);
        assert_eq!(ctx.health_fraction(), 1.0);
    }

    #[test]
    fn test_level_up_at_threshold() {
        let mut ctx = GameContext::new(Vec2::ZERO);
        ctx.take_damage(30.0);

        assert!(!ctx.award_xp(49));
        assert!(ctx.award_xp(6));
        assert_eq!(ctx.level, 2);
        assert_eq!(ctx.xp, 5);
        assert_eq!(ctx.max_hp, 110.0);
        assert_eq!(ctx.hp, 110.0);
        assert_eq!(ctx.xp_to_next_level(), 100);
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut ctx = GameContext::new(Vec2::ZERO);
        assert_eq!(ctx.take_damage(-5.0), 0.0);
        assert_eq!(ctx.take_damage(150.0), 100.0);
        assert!(ctx.is_defeated());
    }

    #[test]
    fn test_respawn_penalty() {
        let mut ctx = GameContext::new(Vec2::ZERO);
        ctx.coins = 10;
        ctx.take_damage(500.0);
        ctx.respawn_at(Vec2::new(1.0, 2.0));

        assert_eq!(ctx.hp, 50.0);
        assert_eq!(ctx.coins, 0);
        assert_eq!(ctx.defeats, 1);
        assert_eq!(ctx.position, Vec2::new(1.0, 2.0));
    }
}
