//! Gameplay tunables. All durations are in ticks.

/// Arena dimensions
pub mod arena {
    pub const WIDTH: f64 = 40.0;
    pub const HEIGHT: f64 = 30.0;

    /// Inset from the walls for random spawns
    pub const SPAWN_MARGIN: f64 = 2.0;
    /// Minimum distance between two spawn points
    pub const SPAWN_MIN_SEPARATION: f64 = 4.0;
    /// Clearance radius a spawn point must have from geometry
    pub const SPAWN_CLEARANCE: f64 = 0.5;
    pub const SPAWN_ATTEMPTS: u32 = 200;
}

/// Player stats
pub mod player {
    pub const RADIUS: f64 = 0.5;
    pub const MAX_HP: u32 = 100;
    pub const MAX_AMMO: u32 = 10;
    pub const START_AMMO: u32 = 10;
    pub const MAX_ENERGY: u32 = 10;
    pub const START_ENERGY: u32 = 10;
    /// Distance covered by one move action
    pub const MOVE_SPEED: f64 = 1.0;

    pub const COLORS: [&str; 12] = [
        "#e74c3c", "#3498db", "#2ecc71", "#f1c40f", "#9b59b6", "#e67e22", "#1abc9c", "#e84393",
        "#00cec9", "#fdcb6e", "#6c5ce7", "#ff7675",
    ];
}

/// Ability costs and timings
pub mod ability {
    pub const RELOAD_AMOUNT: u32 = 5;
    pub const RELOAD_COOLDOWN_TICKS: u32 = 10;

    pub const SHIELD_ENERGY_COST: u32 = 3;
    pub const SHIELD_DURATION_TICKS: u32 = 10;

    pub const DASH_ENERGY_COST: u32 = 2;
    /// Number of unit steps a dash attempts
    pub const DASH_DISTANCE: u32 = 3;

    /// Living players gain 1 energy every this many ticks
    pub const ENERGY_REGEN_INTERVAL: u64 = 10;
}

/// Projectile stats
pub mod projectile {
    pub const SPEED: f64 = 1.5;
    pub const DAMAGE: u32 = 20;
    pub const SIZE: f64 = 0.2;
    pub const MAX_LIFETIME_TICKS: u32 = 30;
    /// Gap between the shooter's edge and the spawned projectile
    pub const SPAWN_GAP: f64 = 0.2;
    /// Live projectiles a single player may own
    pub const MAX_PER_PLAYER: usize = 3;
}

/// Match rules
pub mod rules {
    pub const MAX_BATTLE_DURATION_TICKS: u64 = 3000;
    pub const USERNAME_MAX_LEN: usize = 20;
}

/// Snapshot shaping
pub mod view {
    /// Radius of the restricted per-player snapshot
    pub const VIEW_RADIUS: f64 = 12.0;
    /// Battle log entries included in the debug snapshot
    pub const DEBUG_LOG_TAIL: usize = 50;
    /// Decimal digits kept for positions in every snapshot
    pub const POSITION_DECIMALS: i32 = 2;
}
