//! Combat system - projectiles, ability gates, hit records

use super::constants::ability::{RELOAD_AMOUNT, RELOAD_COOLDOWN_TICKS};
use super::constants::projectile::{MAX_LIFETIME_TICKS, MAX_PER_PLAYER, SIZE, SPEED, DAMAGE};
use super::physics::PhysicsSystem;
use super::player::Player;
use super::{PlayerId, ProjectileId};

/// Why a queued action resolved to a no-op. Never surfaced to callers;
/// the outcome is only visible through later state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ActionRejected {
    #[error("out of ammo")]
    NoAmmo,
    #[error("reload in progress")]
    Reloading,
    #[error("projectile cap reached")]
    ProjectileCap,
    #[error("ammo already full")]
    AmmoFull,
    #[error("not enough energy")]
    InsufficientEnergy,
    #[error("destination blocked")]
    Blocked,
    #[error("heading is not a finite direction")]
    InvalidHeading,
}

/// Active projectile in the arena
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    pub x: f64,
    pub y: f64,
    /// Unit direction
    pub dx: f64,
    pub dy: f64,
    pub speed: f64,
    pub damage: u32,
    pub size: f64,
    pub max_lifetime: u32,
    pub ticks_lived: u32,
    pub alive: bool,
}

impl Projectile {
    /// Create a projectile with the standard stats. The direction is
    /// normalized here; a degenerate direction yields `None`.
    pub fn new(
        id: ProjectileId,
        owner_id: PlayerId,
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
    ) -> Option<Self> {
        let (dx, dy) = PhysicsSystem::normalize(dx, dy)?;
        Some(Self {
            id,
            owner_id,
            x,
            y,
            dx,
            dy,
            speed: SPEED,
            damage: DAMAGE,
            size: SIZE,
            max_lifetime: MAX_LIFETIME_TICKS,
            ticks_lived: 0,
            alive: true,
        })
    }

    /// Move one tick along the direction; expires once lifetime is reached
    pub fn advance(&mut self) {
        if !self.alive {
            return;
        }

        let (x, y) = PhysicsSystem::step(self.x, self.y, self.dx, self.dy, self.speed);
        self.x = x;
        self.y = y;
        self.ticks_lived += 1;

        if self.ticks_lived >= self.max_lifetime {
            self.destroy();
        }
    }

    /// Idempotent
    pub fn destroy(&mut self) {
        self.alive = false;
    }

    /// Check collision with a circular target
    pub fn check_hit(&self, target_x: f64, target_y: f64, target_radius: f64) -> bool {
        PhysicsSystem::circles_overlap(self.x, self.y, self.size, target_x, target_y, target_radius)
    }
}

/// Combat rules that gate abilities
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a player can fire given how many of their projectiles are live
    pub fn can_shoot(player: &Player, live_projectiles: usize) -> Result<(), ActionRejected> {
        if player.ammo == 0 {
            return Err(ActionRejected::NoAmmo);
        }
        if player.is_reloading() {
            return Err(ActionRejected::Reloading);
        }
        if live_projectiles >= MAX_PER_PLAYER {
            return Err(ActionRejected::ProjectileCap);
        }
        Ok(())
    }

    /// Refill ammo immediately and start the reload cooldown
    pub fn reload(player: &mut Player) -> Result<(), ActionRejected> {
        if player.is_reloading() {
            return Err(ActionRejected::Reloading);
        }
        if player.ammo >= player.max_ammo {
            return Err(ActionRejected::AmmoFull);
        }

        player.ammo = (player.ammo + RELOAD_AMOUNT).min(player.max_ammo);
        player.reload_cooldown = RELOAD_COOLDOWN_TICKS;
        Ok(())
    }

    /// Deduct an energy cost or reject without touching the pool
    pub fn spend_energy(player: &mut Player, cost: u32) -> Result<(), ActionRejected> {
        if player.energy < cost {
            return Err(ActionRejected::InsufficientEnergy);
        }
        player.energy -= cost;
        Ok(())
    }
}

/// Hit result from projectile resolution
#[derive(Debug, Clone)]
pub struct HitResult {
    pub projectile_id: ProjectileId,
    pub shooter_id: PlayerId,
    pub target_id: PlayerId,
    pub damage: u32,
    pub target_shielded: bool,
    pub target_killed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projectile(dx: f64, dy: f64) -> Projectile {
        Projectile::new(
            ProjectileId("b_00000001".to_string()),
            PlayerId::from("p_00000001"),
            1.0,
            1.0,
            dx,
            dy,
        )
        .unwrap()
    }

    fn player() -> Player {
        Player::new(
            PlayerId::from("p_00000001"),
            "alice".to_string(),
            5.0,
            5.0,
            "#3498db".to_string(),
        )
    }

    #[test]
    fn test_direction_is_unit_at_creation() {
        let p = projectile(3.0, 4.0);
        assert!(((p.dx * p.dx + p.dy * p.dy) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_direction_rejected() {
        assert!(Projectile::new(
            ProjectileId("b_x".to_string()),
            PlayerId::from("p_x"),
            0.0,
            0.0,
            0.0,
            0.0
        )
        .is_none());
    }

    #[test]
    fn test_advance_moves_by_speed() {
        let mut p = projectile(1.0, 0.0);
        p.advance();
        assert!((p.x - (1.0 + SPEED)).abs() < 1e-12);
        assert_eq!(p.ticks_lived, 1);
    }

    #[test]
    fn test_expires_at_max_lifetime() {
        let mut p = projectile(1.0, 0.0);
        for _ in 0..MAX_LIFETIME_TICKS - 1 {
            p.advance();
        }
        assert!(p.alive);
        p.advance();
        assert!(!p.alive);

        // Dead projectiles stay put
        let x = p.x;
        p.advance();
        assert_eq!(p.x, x);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut p = projectile(0.0, 1.0);
        p.destroy();
        p.destroy();
        assert!(!p.alive);
    }

    #[test]
    fn test_shoot_gates() {
        let mut p = player();
        assert_eq!(CombatSystem::can_shoot(&p, 0), Ok(()));
        assert_eq!(
            CombatSystem::can_shoot(&p, MAX_PER_PLAYER),
            Err(ActionRejected::ProjectileCap)
        );

        p.reload_cooldown = 3;
        assert_eq!(CombatSystem::can_shoot(&p, 0), Err(ActionRejected::Reloading));

        p.ammo = 0;
        assert_eq!(CombatSystem::can_shoot(&p, 0), Err(ActionRejected::NoAmmo));
    }

    #[test]
    fn test_reload_refills_and_blocks_repeat() {
        let mut p = player();
        assert_eq!(CombatSystem::reload(&mut p), Err(ActionRejected::AmmoFull));

        p.ammo = 8;
        assert_eq!(CombatSystem::reload(&mut p), Ok(()));
        assert_eq!(p.ammo, p.max_ammo);
        assert_eq!(p.reload_cooldown, RELOAD_COOLDOWN_TICKS);

        p.ammo = 0;
        assert_eq!(CombatSystem::reload(&mut p), Err(ActionRejected::Reloading));
        assert_eq!(p.ammo, 0);
    }

    #[test]
    fn test_spend_energy() {
        let mut p = player();
        p.energy = 2;
        assert_eq!(
            CombatSystem::spend_energy(&mut p, 3),
            Err(ActionRejected::InsufficientEnergy)
        );
        assert_eq!(p.energy, 2);
        assert_eq!(CombatSystem::spend_energy(&mut p, 2), Ok(()));
        assert_eq!(p.energy, 0);
    }
}
