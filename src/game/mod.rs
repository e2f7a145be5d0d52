//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod constants;
pub mod engine;
pub mod physics;
pub mod player;
pub mod scheduler;
pub mod snapshot;

pub use arena::{Arena, Obstacle, ObstacleKind};
pub use combat::{ActionRejected, HitResult, Projectile};
pub use engine::{EngineMode, GameEngine, ReadyStatus, StateCallback, TickResult};
pub use player::{Action, ActionKind, Aim, Direction, Player};
pub use scheduler::EngineHandle;

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Builder;

/// Player identifier (`p_` + 8 hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Draw a fresh id from the given rng
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self(short_id("p_", rng))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Projectile identifier (`b_` + 8 hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectileId(String);

impl ProjectileId {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self(short_id("b_", rng))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// v4 uuid built from rng bytes so seeded engines produce stable ids
fn short_id<R: Rng>(prefix: &str, rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    let uuid = Builder::from_random_bytes(bytes).into_uuid();
    let simple = uuid.simple().to_string();
    format!("{}{}", prefix, &simple[..8])
}
