//! Lobby coordinator: sandboxes plus at most one battle engine
//!
//! Every registered player lives in exactly one engine at a time: their own
//! sandbox, or the shared battle engine once a battle has been started.
//! Promotion into a battle moves the player value out of the sandbox and
//! into a fresh battle engine; `reset` moves it back.

use std::time::Duration;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{EngineError, LobbyError};
use crate::game::engine::validate_username;
use crate::game::{EngineHandle, EngineMode, GameEngine, Player, PlayerId, ReadyStatus, StateCallback};
use crate::protocol::{ActionRequest, DebugSnapshot, FullSnapshot, PlayerSnapshot};
use crate::sandbox::SandboxManager;

/// Lobby listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LobbyPlayer {
    pub id: PlayerId,
    pub username: String,
    pub ready: bool,
    pub color: String,
    pub alive: bool,
    pub hp: u32,
    /// Mode of the engine currently holding the player
    pub mode: EngineMode,
}

#[derive(Debug, Clone)]
struct RosterEntry {
    id: PlayerId,
    username: String,
}

#[derive(Default)]
struct LobbyState {
    /// Registration order
    roster: Vec<RosterEntry>,
    battle: Option<EngineHandle>,
}

/// Routes players between their sandboxes and the battle engine.
///
/// The battle callback runs under the battle engine lock and must not call
/// back into the lobby.
pub struct Lobby {
    state: Mutex<LobbyState>,
    sandboxes: SandboxManager,
    tick_interval: Duration,
    battle_seeds: Mutex<ChaCha8Rng>,
    on_battle_update: Mutex<Option<StateCallback>>,
}

impl Lobby {
    pub fn new(tick_interval: Duration, seed: Option<u64>) -> Self {
        let mut seeds = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let sandbox_seed = seeds.gen();

        Self {
            state: Mutex::new(LobbyState::default()),
            sandboxes: SandboxManager::new(tick_interval, Some(sandbox_seed)),
            tick_interval,
            battle_seeds: Mutex::new(seeds),
            on_battle_update: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tick_interval, config.rng_seed)
    }

    pub fn sandboxes(&self) -> &SandboxManager {
        &self.sandboxes
    }

    /// Current battle engine, finished or not
    pub fn battle(&self) -> Option<EngineHandle> {
        self.state.lock().battle.clone()
    }

    /// Attach a snapshot callback to the current and every future battle engine
    pub fn on_battle_update(&self, callback: StateCallback) {
        *self.on_battle_update.lock() = Some(callback.clone());
        if let Some(battle) = self.battle() {
            battle.with_engine_mut(|engine| engine.set_state_callback(callback));
        }
    }

    /// Register a player and put them in a running sandbox.
    /// Must be called inside a tokio runtime.
    pub fn register(&self, username: &str) -> Result<PlayerId, LobbyError> {
        let username = validate_username(username)?;

        let mut state = self.state.lock();
        if let Some(existing) = state.roster.iter().find(|e| e.username == username) {
            return Err(EngineError::UsernameTaken {
                player_id: existing.id.clone(),
            }
            .into());
        }

        let (player_id, _) = self.sandboxes.create_for_player(&username)?;
        state.roster.push(RosterEntry {
            id: player_id.clone(),
            username,
        });

        info!(player_id = %player_id, players = state.roster.len(), "Player joined lobby");
        Ok(player_id)
    }

    /// Engine currently holding the player
    fn engine_for(&self, state: &LobbyState, player_id: &PlayerId) -> Option<EngineHandle> {
        if let Some(battle) = &state.battle {
            if battle.with_engine(|engine| engine.player(player_id).is_some()) {
                return Some(battle.clone());
            }
        }
        self.sandboxes.get(player_id)
    }

    fn require_engine(&self, player_id: &PlayerId) -> Result<EngineHandle, LobbyError> {
        let state = self.state.lock();
        self.engine_for(&state, player_id)
            .ok_or(LobbyError::Engine(EngineError::PlayerNotFound))
    }

    pub fn submit_action(
        &self,
        player_id: &PlayerId,
        request: &ActionRequest,
    ) -> Result<(), LobbyError> {
        Ok(self.require_engine(player_id)?.submit_action(player_id, request)?)
    }

    /// Mark a player ready; counts span the whole lobby
    pub fn set_ready(&self, player_id: &PlayerId) -> Result<ReadyStatus, LobbyError> {
        self.require_engine(player_id)?
            .with_engine_mut(|engine| engine.set_ready(player_id))?;

        let players = self.players();
        Ok(ReadyStatus {
            ready_count: players.iter().filter(|p| p.ready).count(),
            total_players: players.len(),
        })
    }

    /// Everyone registered, in registration order
    pub fn players(&self) -> Vec<LobbyPlayer> {
        let state = self.state.lock();
        state
            .roster
            .iter()
            .filter_map(|entry| {
                let handle = self.engine_for(&state, &entry.id)?;
                handle.with_engine(|engine| {
                    engine.player(&entry.id).map(|p| LobbyPlayer {
                        id: p.id.clone(),
                        username: p.username.clone(),
                        ready: p.ready,
                        color: p.color.clone(),
                        alive: p.alive,
                        hp: p.hp,
                        mode: engine.mode(),
                    })
                })
            })
            .collect()
    }

    /// Move every player into a fresh battle engine and start it.
    ///
    /// On failure every extracted player goes back to a running sandbox.
    /// Must be called inside a tokio runtime.
    pub fn start_battle(&self) -> Result<EngineHandle, LobbyError> {
        let mut state = self.state.lock();

        if let Some(battle) = &state.battle {
            if battle.with_engine(|engine| engine.mode() == EngineMode::Battle) {
                return Err(LobbyError::BattleInProgress);
            }
        }
        if state.roster.is_empty() {
            return Err(EngineError::NoPlayers.into());
        }

        // Players still sitting in a finished battle come along too
        let mut leftover = match state.battle.take() {
            Some(previous) => {
                previous.stop();
                previous.with_engine_mut(GameEngine::drain_players)
            }
            None => Vec::new(),
        };

        let mut players = Vec::with_capacity(state.roster.len());
        for entry in &state.roster {
            let player = match leftover.iter().position(|p| p.id == entry.id) {
                Some(idx) => Some(leftover.swap_remove(idx)),
                None => self.sandboxes.remove(&entry.id),
            };
            players.extend(player);
        }

        let handle = match self.build_battle(&players) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Battle start failed, restoring sandboxes");
                self.restore_sandboxes(players);
                return Err(e.into());
            }
        };
        state.battle = Some(handle.clone());

        info!(players = state.roster.len(), "Lobby battle started");
        Ok(handle)
    }

    /// Running battle engine holding copies of `players`
    fn build_battle(&self, players: &[Player]) -> Result<EngineHandle, EngineError> {
        let mut engine = GameEngine::with_seed(self.battle_seeds.lock().gen());
        if let Some(callback) = self.on_battle_update.lock().clone() {
            engine.set_state_callback(callback);
        }
        for player in players {
            engine.insert_player(player.clone())?;
        }

        let handle = EngineHandle::new(engine, self.tick_interval);
        handle.start_battle()?;
        Ok(handle)
    }

    fn restore_sandboxes(&self, players: Vec<Player>) {
        for player in players {
            let player_id = player.id.clone();
            if let Err(e) = self.sandboxes.adopt(player) {
                warn!(player_id = %player_id, error = %e, "Failed to restore sandbox");
            }
        }
    }

    /// Stop the battle and send everyone back to a fresh sandbox.
    /// Must be called inside a tokio runtime.
    pub fn reset(&self) -> Result<(), LobbyError> {
        let mut state = self.state.lock();

        if let Some(battle) = state.battle.take() {
            battle.stop();
            self.restore_sandboxes(battle.with_engine_mut(GameEngine::drain_players));
        }

        // Players who joined mid-battle never left their sandbox
        for entry in &state.roster {
            if let Some(handle) = self.sandboxes.get(&entry.id) {
                handle.with_engine_mut(|engine| {
                    if let Some(player) = engine.player_mut(&entry.id) {
                        player.ready = false;
                    }
                });
            }
        }

        info!(players = state.roster.len(), "Lobby reset");
        Ok(())
    }

    /// Drop a player from the roster and whichever engine holds them.
    /// No-op for unknown ids.
    pub fn remove_player(&self, player_id: &PlayerId) -> Option<Player> {
        let mut state = self.state.lock();
        state.roster.retain(|entry| &entry.id != player_id);

        let from_battle = state
            .battle
            .as_ref()
            .and_then(|battle| battle.with_engine_mut(|engine| engine.remove_player(player_id)));
        let from_sandbox = self.sandboxes.remove(player_id);

        let removed = from_battle.or(from_sandbox);
        if removed.is_some() {
            info!(player_id = %player_id, "Player left lobby");
        }
        removed
    }

    /// Restricted view for one player
    pub fn state(&self, player_id: &PlayerId) -> Result<PlayerSnapshot, LobbyError> {
        self.require_engine(player_id)?
            .player_snapshot(player_id)
            .ok_or(LobbyError::Engine(EngineError::PlayerNotFound))
    }

    /// Debug view of the engine holding a player
    pub fn debug_state(&self, player_id: &PlayerId) -> Result<DebugSnapshot, LobbyError> {
        Ok(self.require_engine(player_id)?.debug_snapshot())
    }

    /// Full view of the battle engine
    pub fn battle_state(&self) -> Result<FullSnapshot, LobbyError> {
        self.battle()
            .map(|battle| battle.full_snapshot())
            .ok_or(LobbyError::NoActiveSession)
    }

    /// Stop the battle and every sandbox
    pub fn shutdown(&self) {
        if let Some(battle) = self.state.lock().battle.as_ref() {
            battle.stop();
        }
        self.sandboxes.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby() -> Lobby {
        Lobby::new(Duration::from_millis(100), Some(17))
    }

    fn req(action: &str, direction: Option<&str>) -> ActionRequest {
        ActionRequest {
            action: action.to_string(),
            direction: direction.map(str::to_string),
            angle: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_validates_and_dedupes() {
        let lobby = lobby();
        let alice = lobby.register(" alice ").unwrap();

        assert_eq!(
            lobby.register("alice"),
            Err(LobbyError::Engine(EngineError::UsernameTaken { player_id: alice.clone() }))
        );
        assert!(matches!(
            lobby.register(""),
            Err(LobbyError::Engine(EngineError::InvalidUsername { .. }))
        ));

        let players = lobby.players();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].username, "alice");
        assert_eq!(players[0].mode, EngineMode::Sandbox);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_battle_moves_players_and_keeps_colors() {
        let lobby = lobby();
        let alice = lobby.register("alice").unwrap();
        let bob = lobby.register("bob").unwrap();
        let colors: Vec<String> = lobby.players().into_iter().map(|p| p.color).collect();

        let battle = lobby.start_battle().unwrap();

        assert!(lobby.sandboxes().is_empty());
        assert!(battle.is_running());
        let players = lobby.players();
        assert_eq!(
            players.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            vec![alice, bob]
        );
        assert!(players.iter().all(|p| p.mode == EngineMode::Battle));
        assert_eq!(players.into_iter().map(|p| p.color).collect::<Vec<_>>(), colors);

        assert!(matches!(lobby.start_battle(), Err(LobbyError::BattleInProgress)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_battle_without_players() {
        let lobby = lobby();
        assert!(matches!(
            lobby.start_battle(),
            Err(LobbyError::Engine(EngineError::NoPlayers))
        ));
        assert!(matches!(lobby.battle_state(), Err(LobbyError::NoActiveSession)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_actions_route_to_current_engine() {
        let lobby = lobby();
        let alice = lobby.register("alice").unwrap();

        lobby.submit_action(&alice, &req("reload", None)).unwrap();
        let pending = lobby.debug_state(&alice).unwrap().players[0].pending_action;
        assert!(pending.is_some());

        lobby.start_battle().unwrap();
        lobby.submit_action(&alice, &req("shield", None)).unwrap();
        let battle = lobby.battle().unwrap();
        assert!(battle.with_engine(|e| e.player(&alice).unwrap().pending_action.is_some()));

        assert!(matches!(
            lobby.submit_action(&PlayerId::from("p_ghost"), &req("reload", None)),
            Err(LobbyError::Engine(EngineError::PlayerNotFound))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_counts_span_lobby() {
        let lobby = lobby();
        let alice = lobby.register("alice").unwrap();
        lobby.register("bob").unwrap();

        let status = lobby.set_ready(&alice).unwrap();
        assert_eq!(
            status,
            ReadyStatus {
                ready_count: 1,
                total_players: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_players_to_sandboxes() {
        let lobby = lobby();
        let alice = lobby.register("alice").unwrap();
        let bob = lobby.register("bob").unwrap();
        lobby.set_ready(&alice).unwrap();
        let battle = lobby.start_battle().unwrap();

        lobby.reset().unwrap();

        assert!(!battle.is_running());
        assert!(lobby.battle().is_none());
        assert!(lobby.sandboxes().has(&alice));
        assert!(lobby.sandboxes().has(&bob));
        assert!(lobby
            .players()
            .iter()
            .all(|p| p.mode == EngineMode::Sandbox && !p.ready && p.alive));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_player_is_idempotent() {
        let lobby = lobby();
        let alice = lobby.register("alice").unwrap();
        lobby.register("bob").unwrap();
        lobby.start_battle().unwrap();

        assert!(lobby.remove_player(&alice).is_some());
        assert!(lobby.remove_player(&alice).is_none());
        assert_eq!(lobby.players().len(), 1);
        assert!(matches!(
            lobby.state(&alice),
            Err(LobbyError::Engine(EngineError::PlayerNotFound))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_is_restricted_view() {
        let lobby = lobby();
        let alice = lobby.register("alice").unwrap();
        let snap = lobby.state(&alice).unwrap();
        assert_eq!(snap.me.id, alice);
        assert!(snap.nearby_players.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_battle_start_restores_sandboxes() {
        let lobby = lobby();
        let alice = lobby.register("alice").unwrap();
        let bob = lobby.register("bob").unwrap();

        // Two players answering to the same name cannot share a battle engine
        lobby.sandboxes().get(&bob).unwrap().with_engine_mut(|engine| {
            engine.player_mut(&bob).unwrap().username = "alice".to_string();
        });

        assert_eq!(
            lobby.start_battle().err(),
            Some(LobbyError::Engine(EngineError::UsernameTaken { player_id: alice.clone() }))
        );
        assert!(lobby.battle().is_none());
        assert_eq!(lobby.sandboxes().len(), 2);
        for id in [&alice, &bob] {
            let handle = lobby.sandboxes().get(id).unwrap();
            assert!(handle.is_running());
            assert!(handle.with_engine(|e| e.player(id).is_some()));
        }

        let players = lobby.players();
        assert_eq!(players.len(), 2);
        assert!(players.iter().all(|p| p.mode == EngineMode::Sandbox));
    }
}
