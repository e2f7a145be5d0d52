//! Arena combat simulation core
//!
//! A fixed-rate engine simulates players moving, shooting and using
//! abilities inside a rectangular arena with obstacles. Every player gets a
//! private sandbox engine; a lobby can promote everyone into one shared
//! battle engine and send them back afterwards.

pub mod app;
pub mod config;
pub mod error;
pub mod game;
pub mod lobby;
pub mod protocol;
pub mod sandbox;
pub mod util;

pub use error::{EngineError, LobbyError};
pub use game::{EngineHandle, GameEngine};
pub use lobby::Lobby;
pub use sandbox::SandboxManager;
