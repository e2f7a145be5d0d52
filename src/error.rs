//! Error types surfaced to callers of the core

use crate::game::{ActionKind, PlayerId};

/// Synchronous validation and state errors from a single engine.
/// None of these mutate state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Username is required (max {max} characters)")]
    InvalidUsername { max: usize },

    #[error("Username already taken")]
    UsernameTaken { player_id: PlayerId },

    #[error("Player not found")]
    PlayerNotFound,

    #[error("Player is dead")]
    PlayerDead,

    #[error("Invalid action: {0}")]
    UnknownAction(String),

    #[error("Provide direction (up/down/left/right) or angle in degrees (0-360) for '{action}'")]
    MissingAim { action: ActionKind },

    #[error("Need at least 1 player to start")]
    NoPlayers,
}

/// Errors from the lobby coordinator
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LobbyError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("A battle is already in progress")]
    BattleInProgress,

    #[error("No active game session")]
    NoActiveSession,
}
