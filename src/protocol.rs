//! Wire types exchanged with the transport layer
//!
//! Inbound: [`ActionRequest`]. Outbound: the snapshot views and battle log
//! events. Positions in every snapshot are rounded to two decimals.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::game::{Action, Arena, EngineMode, PlayerId, ProjectileId};

/// Raw action submission as received from a client.
///
/// Submissions are not queued: a newer request replaces any intent the
/// player has not yet had consumed by a tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRequest {
    /// One of `move`, `shoot`, `reload`, `shield`, `dash`
    pub action: String,
    /// `up`, `down`, `left` or `right`
    #[serde(default)]
    pub direction: Option<String>,
    /// Heading in degrees; takes precedence over `direction`
    #[serde(default)]
    pub angle: Option<f64>,
}

/// Battle log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BattleEvent {
    /// Projectile connected
    Hit {
        tick: u64,
        shooter: PlayerId,
        target: PlayerId,
        damage: u32,
        shielded: bool,
    },

    /// Lethal hit
    Kill {
        tick: u64,
        /// `None` if the shooter left before the hit landed
        killer: Option<String>,
        victim: String,
    },

    /// Battle finished; recorded exactly once
    GameOver {
        tick: u64,
        /// Winner username, `"none"` when nobody is left to win
        winner: String,
    },
}

impl BattleEvent {
    pub fn tick(&self) -> u64 {
        match self {
            BattleEvent::Hit { tick, .. }
            | BattleEvent::Kill { tick, .. }
            | BattleEvent::GameOver { tick, .. } => *tick,
        }
    }
}

/// Public fields of a player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub username: String,
    pub x: f64,
    pub y: f64,
    pub hp: u32,
    pub max_hp: u32,
    pub alive: bool,
    pub reloading: bool,
    pub shielded: bool,
    pub kills: u32,
    pub ready: bool,
    pub color: String,
}

/// Public fields of a live projectile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectileView {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
}

/// Everything an observer of the whole arena may see
#[derive(Debug, Clone, Serialize)]
pub struct FullSnapshot {
    pub mode: EngineMode,
    pub tick: u64,
    pub arena: Arc<Arena>,
    pub players: Vec<PlayerView>,
    pub projectiles: Vec<ProjectileView>,
    pub winner: Option<PlayerView>,
}

/// Restricted view: self plus whatever lies within the view radius
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub mode: EngineMode,
    pub tick: u64,
    #[serde(rename = "self")]
    pub me: PlayerView,
    pub nearby_players: Vec<PlayerView>,
    pub nearby_projectiles: Vec<ProjectileView>,
    pub arena: Arc<Arena>,
}

/// Player with internal counters exposed
#[derive(Debug, Clone, Serialize)]
pub struct DebugPlayerView {
    #[serde(flatten)]
    pub public: PlayerView,
    pub energy: u32,
    pub max_energy: u32,
    pub ammo: u32,
    pub max_ammo: u32,
    pub pending_action: Option<Action>,
    pub shield_ticks: u32,
    pub reload_cooldown: u32,
    pub damage_dealt: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugProjectileView {
    #[serde(flatten)]
    pub public: ProjectileView,
    pub ticks_lived: u32,
    pub max_lifetime: u32,
}

/// Verbose view for diagnosing a client
#[derive(Debug, Clone, Serialize)]
pub struct DebugSnapshot {
    pub mode: EngineMode,
    pub tick: u64,
    pub arena: Arc<Arena>,
    pub players: Vec<DebugPlayerView>,
    pub projectiles: Vec<DebugProjectileView>,
    /// Most recent battle log entries
    pub battle_log: Vec<BattleEvent>,
    pub winner: Option<PlayerView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_request_optional_fields() {
        let req: ActionRequest = serde_json::from_str(r#"{"action":"reload"}"#).unwrap();
        assert_eq!(req.action, "reload");
        assert!(req.direction.is_none());
        assert!(req.angle.is_none());

        let req: ActionRequest =
            serde_json::from_str(r#"{"action":"shoot","angle":45.5}"#).unwrap();
        assert_eq!(req.angle, Some(45.5));
    }

    #[test]
    fn test_battle_event_tagging() {
        let event = BattleEvent::GameOver {
            tick: 12,
            winner: "alice".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "game_over");
        assert_eq!(json["winner"], "alice");
        assert_eq!(event.tick(), 12);
    }
}
