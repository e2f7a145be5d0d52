//! Per-player practice engines

use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::error::EngineError;
use crate::game::{EngineHandle, GameEngine, Player, PlayerId};

/// One private, independently scheduled engine per player.
///
/// Nothing is shared between sandboxes: each owns its arena copy, its
/// player and its projectiles.
pub struct SandboxManager {
    sandboxes: DashMap<PlayerId, EngineHandle>,
    tick_interval: Duration,
    seeds: Mutex<ChaCha8Rng>,
}

impl SandboxManager {
    pub fn new(tick_interval: Duration, seed: Option<u64>) -> Self {
        let seeds = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            sandboxes: DashMap::new(),
            tick_interval,
            seeds: Mutex::new(seeds),
        }
    }

    fn next_engine(&self) -> GameEngine {
        GameEngine::with_seed(self.seeds.lock().gen())
    }

    /// Create a running sandbox holding a freshly registered player.
    /// Must be called inside a tokio runtime.
    pub fn create_for_player(&self, username: &str) -> Result<(PlayerId, EngineHandle), EngineError> {
        let mut engine = self.next_engine();
        let player_id = engine.register_player(username)?.id.clone();
        let handle = self.install(player_id.clone(), engine);

        info!(player_id = %player_id, username = %username.trim(), "Sandbox created");
        Ok((player_id, handle))
    }

    /// Create a running sandbox around an existing player value. The
    /// player is reset and respawned; id and colour are kept.
    pub fn adopt(&self, player: Player) -> Result<EngineHandle, EngineError> {
        let player_id = player.id.clone();
        let mut engine = self.next_engine();
        engine.insert_player(player)?;
        engine.reset_to_lobby();

        info!(player_id = %player_id, "Sandbox restored");
        Ok(self.install(player_id, engine))
    }

    fn install(&self, player_id: PlayerId, engine: GameEngine) -> EngineHandle {
        let handle = EngineHandle::new(engine, self.tick_interval);
        handle.start_sandbox();

        if let Some(previous) = self.sandboxes.insert(player_id, handle.clone()) {
            previous.stop();
        }
        handle
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<EngineHandle> {
        self.sandboxes.get(player_id).map(|s| s.value().clone())
    }

    pub fn has(&self, player_id: &PlayerId) -> bool {
        self.sandboxes.contains_key(player_id)
    }

    /// Stop and drop a sandbox, handing back the player value.
    /// No-op for unknown ids.
    pub fn remove(&self, player_id: &PlayerId) -> Option<Player> {
        let (_, handle) = self.sandboxes.remove(player_id)?;
        handle.stop();
        info!(player_id = %player_id, "Sandbox removed");
        handle.with_engine_mut(|engine| engine.remove_player(player_id))
    }

    /// Copy of a sandboxed player's state
    pub fn player(&self, player_id: &PlayerId) -> Option<Player> {
        self.get(player_id)?
            .with_engine(|engine| engine.player(player_id).cloned())
    }

    pub fn len(&self) -> usize {
        self.sandboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sandboxes.is_empty()
    }

    /// Stop every sandbox
    pub fn shutdown(&self) {
        let handles: Vec<EngineHandle> = self.sandboxes.iter().map(|s| s.value().clone()).collect();
        for handle in &handles {
            handle.stop();
        }
        self.sandboxes.clear();
        info!(count = handles.len(), "Sandboxes stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Action, Aim, Direction, EngineMode};

    const PERIOD: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn test_sandboxes_are_isolated() {
        let manager = SandboxManager::new(PERIOD, Some(5));
        let (alice, alice_box) = manager.create_for_player("alice").unwrap();
        let (bob, bob_box) = manager.create_for_player("bob").unwrap();

        let bob_start = manager.player(&bob).unwrap().position();
        let alice_start = manager.player(&alice).unwrap().position();

        alice_box
            .with_engine_mut(|e| {
                e.queue_action(
                    &alice,
                    Action::Shoot {
                        aim: Aim::Direction(Direction::Right),
                    },
                )
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        let a = manager.player(&alice).unwrap();
        assert_eq!(a.ammo, a.max_ammo - 1);
        let b = manager.player(&bob).unwrap();
        assert_eq!(b.ammo, b.max_ammo);
        assert!(bob_box.with_engine(|e| e.projectiles().is_empty()));
        assert_eq!(manager.player(&bob).unwrap().position(), bob_start);
        assert_eq!(manager.player(&alice).unwrap().position(), alice_start);

        // Neither engine knows about the other player
        assert!(alice_box.with_engine(|e| e.player(&bob).is_none()));
        assert!(bob_box.with_engine(|e| e.player(&alice).is_none()));
        assert_eq!(alice_box.with_engine(|e| e.mode()), EngineMode::Sandbox);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_is_idempotent() {
        let manager = SandboxManager::new(PERIOD, Some(1));
        let (alice, handle) = manager.create_for_player("alice").unwrap();

        let removed = manager.remove(&alice).unwrap();
        assert_eq!(removed.username, "alice");
        assert!(!handle.is_running());
        assert!(!manager.has(&alice));

        assert!(manager.remove(&alice).is_none());
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_adopt_keeps_identity_and_resets_stats() {
        let manager = SandboxManager::new(PERIOD, Some(2));
        let (alice, _) = manager.create_for_player("alice").unwrap();
        let mut player = manager.remove(&alice).unwrap();
        let color = player.color.clone();
        player.take_damage(1000);

        let handle = manager.adopt(player).unwrap();
        let restored = manager.player(&alice).unwrap();

        assert!(handle.is_running());
        assert!(restored.alive);
        assert_eq!(restored.hp, restored.max_hp);
        assert_eq!(restored.color, color);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_username_creates_nothing() {
        let manager = SandboxManager::new(PERIOD, None);
        assert!(manager.create_for_player("  ").is_err());
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_everything() {
        let manager = SandboxManager::new(PERIOD, Some(3));
        let (_, a) = manager.create_for_player("alice").unwrap();
        let (_, b) = manager.create_for_player("bob").unwrap();

        manager.shutdown();

        assert!(!a.is_running());
        assert!(!b.is_running());
        assert_eq!(manager.len(), 0);
    }
}
