//! Snapshot building for observers

use crate::protocol::{
    DebugPlayerView, DebugProjectileView, DebugSnapshot, FullSnapshot, PlayerSnapshot,
    PlayerView, ProjectileView,
};

use super::combat::Projectile;
use super::constants::view::{DEBUG_LOG_TAIL, POSITION_DECIMALS, VIEW_RADIUS};
use super::engine::GameEngine;
use super::physics::PhysicsSystem;
use super::player::Player;
use super::PlayerId;

/// Round to the snapshot precision
fn round_position(value: f64) -> f64 {
    let factor = 10f64.powi(POSITION_DECIMALS);
    (value * factor).round() / factor
}

/// Builds read-only views of an engine. Views are detached copies; nothing
/// here can reach back into engine state.
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn player_view(p: &Player) -> PlayerView {
        PlayerView {
            id: p.id.clone(),
            username: p.username.clone(),
            x: round_position(p.x),
            y: round_position(p.y),
            hp: p.hp,
            max_hp: p.max_hp,
            alive: p.alive,
            reloading: p.is_reloading(),
            shielded: p.is_shielded(),
            kills: p.kills,
            ready: p.ready,
            color: p.color.clone(),
        }
    }

    pub fn projectile_view(p: &Projectile) -> ProjectileView {
        ProjectileView {
            id: p.id.clone(),
            owner_id: p.owner_id.clone(),
            x: round_position(p.x),
            y: round_position(p.y),
            dx: p.dx,
            dy: p.dy,
        }
    }

    /// Everything: all players, live projectiles, winner
    pub fn full(engine: &GameEngine) -> FullSnapshot {
        FullSnapshot {
            mode: engine.mode(),
            tick: engine.tick_count(),
            arena: engine.arena().clone(),
            players: engine.players().iter().map(Self::player_view).collect(),
            projectiles: engine
                .projectiles()
                .iter()
                .filter(|p| p.alive)
                .map(Self::projectile_view)
                .collect(),
            winner: engine.winner().map(Self::player_view),
        }
    }

    /// Self plus players and projectiles strictly inside the view radius
    pub fn for_player(engine: &GameEngine, player_id: &PlayerId) -> Option<PlayerSnapshot> {
        let me = engine.player(player_id)?;
        let in_view = |x: f64, y: f64| PhysicsSystem::distance(me.x, me.y, x, y) < VIEW_RADIUS;

        let nearby_players = engine
            .players()
            .iter()
            .filter(|p| &p.id != player_id && in_view(p.x, p.y))
            .map(Self::player_view)
            .collect();

        let nearby_projectiles = engine
            .projectiles()
            .iter()
            .filter(|p| p.alive && in_view(p.x, p.y))
            .map(Self::projectile_view)
            .collect();

        Some(PlayerSnapshot {
            mode: engine.mode(),
            tick: engine.tick_count(),
            me: Self::player_view(me),
            nearby_players,
            nearby_projectiles,
            arena: engine.arena().clone(),
        })
    }

    /// Full view plus internal counters and the tail of the battle log
    pub fn debug(engine: &GameEngine) -> DebugSnapshot {
        let players = engine
            .players()
            .iter()
            .map(|p| DebugPlayerView {
                public: Self::player_view(p),
                energy: p.energy,
                max_energy: p.max_energy,
                ammo: p.ammo,
                max_ammo: p.max_ammo,
                pending_action: p.pending_action,
                shield_ticks: p.shield_ticks,
                reload_cooldown: p.reload_cooldown,
                damage_dealt: p.damage_dealt,
            })
            .collect();

        let projectiles = engine
            .projectiles()
            .iter()
            .filter(|p| p.alive)
            .map(|p| DebugProjectileView {
                public: Self::projectile_view(p),
                ticks_lived: p.ticks_lived,
                max_lifetime: p.max_lifetime,
            })
            .collect();

        let log = engine.battle_log();
        let tail_start = log.len().saturating_sub(DEBUG_LOG_TAIL);

        DebugSnapshot {
            mode: engine.mode(),
            tick: engine.tick_count(),
            arena: engine.arena().clone(),
            players,
            projectiles,
            battle_log: log[tail_start..].to_vec(),
            winner: engine.winner().map(Self::player_view),
        }
    }
}
