//! Player entity state and the actions a player can queue

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::EngineError;
use crate::protocol::ActionRequest;

use super::constants::player::{
    MAX_AMMO, MAX_ENERGY, MAX_HP, RADIUS, START_AMMO, START_ENERGY,
};
use super::physics::PhysicsSystem;
use super::PlayerId;

/// Named cardinal direction (screen coordinates, `up` is -y)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn vector(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(()),
        }
    }
}

/// Where a directional action points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aim {
    Direction(Direction),
    /// Heading in degrees, normalized to [0, 360)
    Angle(f64),
}

impl Aim {
    /// Build a heading aim, normalizing into [0, 360)
    pub fn degrees(angle: f64) -> Self {
        let deg = angle.rem_euclid(360.0);
        // tiny negatives round up to exactly 360
        Aim::Angle(if deg >= 360.0 { 0.0 } else { deg })
    }

    /// Unit direction vector, or `None` if the heading is not finite
    pub fn unit_vector(&self) -> Option<(f64, f64)> {
        match *self {
            Aim::Direction(dir) => Some(dir.vector()),
            Aim::Angle(deg) if deg.is_finite() => {
                let (dx, dy) = PhysicsSystem::heading_vector(deg);
                PhysicsSystem::normalize(dx, dy)
            }
            Aim::Angle(_) => None,
        }
    }
}

/// Action kind as named on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Move,
    Shoot,
    Reload,
    Shield,
    Dash,
}

impl ActionKind {
    /// Whether the action needs a direction or angle
    pub fn is_directional(self) -> bool {
        matches!(self, ActionKind::Move | ActionKind::Shoot | ActionKind::Dash)
    }
}

impl FromStr for ActionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move" => Ok(ActionKind::Move),
            "shoot" => Ok(ActionKind::Shoot),
            "reload" => Ok(ActionKind::Reload),
            "shield" => Ok(ActionKind::Shield),
            "dash" => Ok(ActionKind::Dash),
            other => Err(EngineError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Move => "move",
            ActionKind::Shoot => "shoot",
            ActionKind::Reload => "reload",
            ActionKind::Shield => "shield",
            ActionKind::Dash => "dash",
        };
        f.write_str(name)
    }
}

/// A validated player intent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Move { aim: Aim },
    Shoot { aim: Aim },
    Reload,
    Shield,
    Dash { aim: Aim },
}

impl Action {
    /// Validate a raw request. A finite angle wins over a named direction.
    pub fn parse(request: &ActionRequest) -> Result<Self, EngineError> {
        let kind: ActionKind = request.action.parse()?;

        let aim = if kind.is_directional() {
            let angle = request.angle.filter(|a| a.is_finite()).map(Aim::degrees);
            let named = request
                .direction
                .as_deref()
                .and_then(|d| d.parse::<Direction>().ok())
                .map(Aim::Direction);

            match angle.or(named) {
                Some(aim) => Some(aim),
                None => return Err(EngineError::MissingAim { action: kind }),
            }
        } else {
            None
        };

        Ok(match (kind, aim) {
            (ActionKind::Move, Some(aim)) => Action::Move { aim },
            (ActionKind::Shoot, Some(aim)) => Action::Shoot { aim },
            (ActionKind::Dash, Some(aim)) => Action::Dash { aim },
            (ActionKind::Reload, _) => Action::Reload,
            (ActionKind::Shield, _) => Action::Shield,
            (kind, None) => return Err(EngineError::MissingAim { action: kind }),
        })
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Move { .. } => ActionKind::Move,
            Action::Shoot { .. } => ActionKind::Shoot,
            Action::Reload => ActionKind::Reload,
            Action::Shield => ActionKind::Shield,
            Action::Dash { .. } => ActionKind::Dash,
        }
    }
}

/// Authoritative player state, owned by exactly one engine at a time
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub color: String,

    // Position
    pub x: f64,
    pub y: f64,
    pub radius: f64,

    // Combat
    pub hp: u32,
    pub max_hp: u32,
    pub energy: u32,
    pub max_energy: u32,
    pub ammo: u32,
    pub max_ammo: u32,
    pub alive: bool,
    pub reload_cooldown: u32,
    pub shield_ticks: u32,

    /// At most one queued intent; a newer submission replaces it
    pub pending_action: Option<Action>,
    pub ready: bool,

    // Stats
    pub kills: u32,
    pub damage_dealt: u32,
}

impl Player {
    pub fn new(id: PlayerId, username: String, x: f64, y: f64, color: String) -> Self {
        Self {
            id,
            username,
            color,
            x,
            y,
            radius: RADIUS,
            hp: MAX_HP,
            max_hp: MAX_HP,
            energy: START_ENERGY,
            max_energy: MAX_ENERGY,
            ammo: START_AMMO,
            max_ammo: MAX_AMMO,
            alive: true,
            reload_cooldown: 0,
            shield_ticks: 0,
            pending_action: None,
            ready: false,
            kills: 0,
            damage_dealt: 0,
        }
    }

    pub fn is_shielded(&self) -> bool {
        self.shield_ticks > 0
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_cooldown > 0
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Apply incoming damage and return the hp actually removed.
    ///
    /// Shielded players take half (floored). `alive` flips to false exactly
    /// when hp first reaches zero; further hits on a dead player are no-ops.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        if !self.alive {
            return 0;
        }

        let incoming = if self.is_shielded() { amount / 2 } else { amount };
        let applied = incoming.min(self.hp);
        self.hp -= applied;

        if self.hp == 0 {
            self.alive = false;
        }

        applied
    }

    pub fn tick_cooldowns(&mut self) {
        self.shield_ticks = self.shield_ticks.saturating_sub(1);
        self.reload_cooldown = self.reload_cooldown.saturating_sub(1);
    }

    pub fn regen_energy(&mut self) {
        if self.energy < self.max_energy {
            self.energy += 1;
        }
    }

    /// Restore default combat stats and move to a new position
    pub fn reset(&mut self, x: f64, y: f64) {
        self.hp = self.max_hp;
        self.energy = START_ENERGY;
        self.ammo = START_AMMO;
        self.alive = true;
        self.reload_cooldown = 0;
        self.shield_ticks = 0;
        self.pending_action = None;
        self.ready = false;
        self.kills = 0;
        self.damage_dealt = 0;
        self.x = x;
        self.y = y;
    }
}
