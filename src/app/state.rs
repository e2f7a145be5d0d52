//! Application state shared by the binary's tasks

use std::sync::Arc;

use crate::config::Config;
use crate::lobby::Lobby;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lobby: Arc<Lobby>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let lobby = Arc::new(Lobby::from_config(&config));

        Self { config, lobby }
    }
}
