//! Authoritative engine: state machine and the per-tick algorithm
//!
//! A tick is a single run-to-completion step. The order is fixed:
//! actions, projectile advance, projectile vs player, projectile vs
//! geometry, cooldowns, energy regen, projectile cleanup, win check,
//! snapshot publish. Scheduling lives in [`super::scheduler`].

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::protocol::{ActionRequest, BattleEvent, DebugSnapshot, FullSnapshot, PlayerSnapshot};

use super::arena::Arena;
use super::combat::{ActionRejected, CombatSystem, HitResult, Projectile};
use super::constants::ability::{
    DASH_DISTANCE, DASH_ENERGY_COST, ENERGY_REGEN_INTERVAL, SHIELD_DURATION_TICKS,
    SHIELD_ENERGY_COST,
};
use super::constants::player::{COLORS, MOVE_SPEED};
use super::constants::projectile::SPAWN_GAP;
use super::constants::rules::{MAX_BATTLE_DURATION_TICKS, USERNAME_MAX_LEN};
use super::physics::PhysicsSystem;
use super::player::{Action, Aim, Player};
use super::snapshot::SnapshotBuilder;
use super::{PlayerId, ProjectileId};

/// Engine mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Free practice, no win evaluation
    Sandbox,
    /// Win evaluation active
    Battle,
    /// Terminal; winner fixed, ticking stopped
    Finished,
}

/// Invoked with a snapshot after every tick
pub type StateCallback = Arc<dyn Fn(&FullSnapshot) + Send + Sync>;

/// Outcome of a single tick
#[derive(Debug, Clone, Default)]
pub struct TickResult {
    pub tick: u64,
    /// Battle log entries appended during this tick
    pub events: Vec<BattleEvent>,
    /// Whether the engine is finished after this tick
    pub finished: bool,
}

/// Readiness counts after a `set_ready`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadyStatus {
    pub ready_count: usize,
    pub total_players: usize,
}

/// Trim and validate a username
pub fn validate_username(username: &str) -> Result<String, EngineError> {
    let trimmed = username.trim();
    if trimmed.is_empty() || trimmed.chars().count() > USERNAME_MAX_LEN {
        return Err(EngineError::InvalidUsername {
            max: USERNAME_MAX_LEN,
        });
    }
    Ok(trimmed.to_string())
}

/// One isolated simulation. Owns its arena, players and projectiles;
/// nothing here is shared with another engine.
pub struct GameEngine {
    arena: Arc<Arena>,
    /// Registration order is processing order
    players: Vec<Player>,
    projectiles: Vec<Projectile>,
    mode: EngineMode,
    tick_count: u64,
    ticking: bool,
    battle_log: Vec<BattleEvent>,
    winner: Option<PlayerId>,
    rng: ChaCha8Rng,
    on_state_update: Option<StateCallback>,
}

impl GameEngine {
    /// Engine on the standard arena with an entropy seed
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Reproducible engine: spawns, colours and ids derive from `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self::with_arena(Arena::new(), seed)
    }

    pub fn with_arena(arena: Arena, seed: u64) -> Self {
        Self {
            arena: Arc::new(arena),
            players: Vec::new(),
            projectiles: Vec::new(),
            mode: EngineMode::Sandbox,
            tick_count: 0,
            ticking: false,
            battle_log: Vec::new(),
            winner: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            on_state_update: None,
        }
    }

    pub fn set_state_callback(&mut self, callback: StateCallback) {
        self.on_state_update = Some(callback);
    }

    // ── Accessors ──────────────────────────────────

    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Whether this engine wants its scheduler running
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Players in registration order
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn battle_log(&self) -> &[BattleEvent] {
        &self.battle_log
    }

    pub fn winner(&self) -> Option<&Player> {
        self.winner.as_ref().and_then(|id| self.player(id))
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    fn index_of(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    // ── Player management ──────────────────────────

    /// Register a new player at a free spawn point
    pub fn register_player(&mut self, username: &str) -> Result<&Player, EngineError> {
        let username = validate_username(username)?;
        self.ensure_username_free(&username)?;

        let id = PlayerId::generate(&mut self.rng);
        let color = COLORS[self.rng.gen_range(0..COLORS.len())].to_string();
        let existing: Vec<(f64, f64)> = self.players.iter().map(Player::position).collect();
        let (x, y) = self.arena.spawn_point(&mut self.rng, &existing);

        let idx = self.players.len();
        self.players.push(Player::new(id, username, x, y, color));

        let player = &self.players[idx];
        debug!(player_id = %player.id, username = %player.username, x, y, "Player registered");
        Ok(player)
    }

    /// Move an existing player value into this engine (position kept)
    pub fn insert_player(&mut self, player: Player) -> Result<(), EngineError> {
        self.ensure_username_free(&player.username)?;
        self.players.push(player);
        Ok(())
    }

    fn ensure_username_free(&self, username: &str) -> Result<(), EngineError> {
        match self.players.iter().find(|p| p.username == username) {
            Some(existing) => Err(EngineError::UsernameTaken {
                player_id: existing.id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Remove a player and their projectiles. No-op for unknown ids.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        let idx = self.index_of(id)?;
        let player = self.players.remove(idx);
        self.projectiles.retain(|p| &p.owner_id != id);
        debug!(player_id = %id, "Player removed");
        Some(player)
    }

    /// Extract every player, leaving the engine empty
    pub fn drain_players(&mut self) -> Vec<Player> {
        self.projectiles.clear();
        std::mem::take(&mut self.players)
    }

    // ── Actions ────────────────────────────────────

    /// Validate and queue an action for the next tick.
    ///
    /// There is no queue: the newest submission replaces any intent that a
    /// tick has not consumed yet. Resource conditions (ammo, energy,
    /// cooldowns) are not checked here; those resolve silently in the tick.
    pub fn submit_action(
        &mut self,
        player_id: &PlayerId,
        request: &ActionRequest,
    ) -> Result<(), EngineError> {
        let idx = self.index_of(player_id).ok_or(EngineError::PlayerNotFound)?;
        if !self.players[idx].alive {
            return Err(EngineError::PlayerDead);
        }

        let action = Action::parse(request)?;
        self.players[idx].pending_action = Some(action);
        Ok(())
    }

    /// Typed variant of [`Self::submit_action`]
    pub fn queue_action(&mut self, player_id: &PlayerId, action: Action) -> Result<(), EngineError> {
        let player = self
            .player_mut(player_id)
            .ok_or(EngineError::PlayerNotFound)?;
        if !player.alive {
            return Err(EngineError::PlayerDead);
        }
        player.pending_action = Some(action);
        Ok(())
    }

    pub fn set_ready(&mut self, player_id: &PlayerId) -> Result<ReadyStatus, EngineError> {
        let player = self
            .player_mut(player_id)
            .ok_or(EngineError::PlayerNotFound)?;
        player.ready = true;

        Ok(ReadyStatus {
            ready_count: self.players.iter().filter(|p| p.ready).count(),
            total_players: self.players.len(),
        })
    }

    // ── Mode transitions ───────────────────────────

    /// Reset everyone, assign fresh spawns in registration order and enter battle
    pub fn start_battle(&mut self) -> Result<(), EngineError> {
        if self.players.is_empty() {
            return Err(EngineError::NoPlayers);
        }

        self.mode = EngineMode::Battle;
        self.tick_count = 0;
        self.winner = None;
        self.battle_log.clear();
        self.projectiles.clear();
        self.respawn_all();
        self.ticking = true;

        info!(player_count = self.players.len(), "Battle started");
        Ok(())
    }

    /// Enter sandbox mode without touching players
    pub fn start_sandbox(&mut self) {
        self.mode = EngineMode::Sandbox;
        self.ticking = true;
    }

    /// Halt and force the terminal mode
    pub fn stop_battle(&mut self) {
        self.ticking = false;
        self.mode = EngineMode::Finished;
    }

    /// Halt ticking without changing mode
    pub fn pause(&mut self) {
        self.ticking = false;
    }

    /// Back to a clean sandbox with every player reset and repositioned
    pub fn reset_to_lobby(&mut self) {
        self.ticking = false;
        self.mode = EngineMode::Sandbox;
        self.tick_count = 0;
        self.projectiles.clear();
        self.battle_log.clear();
        self.winner = None;
        self.respawn_all();
    }

    fn respawn_all(&mut self) {
        let mut placed: Vec<(f64, f64)> = Vec::with_capacity(self.players.len());
        for player in self.players.iter_mut() {
            let (x, y) = self.arena.spawn_point(&mut self.rng, &placed);
            player.reset(x, y);
            placed.push((x, y));
        }
    }

    // ── Tick ───────────────────────────────────────

    /// Run one simulation step. No-op once finished.
    pub fn tick(&mut self) -> TickResult {
        if self.mode == EngineMode::Finished {
            return TickResult {
                tick: self.tick_count,
                events: Vec::new(),
                finished: true,
            };
        }

        self.tick_count += 1;
        let log_start = self.battle_log.len();

        // 1. Resolve queued intents
        self.process_actions();

        // 2. Move projectiles
        self.move_projectiles();

        // 3. Projectile ↔ player
        self.check_projectile_collisions();

        // 4. Projectile ↔ geometry
        self.check_projectile_wall_collisions();

        // 5. Cooldowns
        for player in self.players.iter_mut() {
            player.tick_cooldowns();
        }

        // 6. Energy regen
        if self.tick_count % ENERGY_REGEN_INTERVAL == 0 {
            for player in self.players.iter_mut().filter(|p| p.alive) {
                player.regen_energy();
            }
        }

        // 7. Clean up dead projectiles
        self.projectiles.retain(|p| p.alive);

        // 8. Win condition
        if self.mode == EngineMode::Battle {
            self.check_win_condition();
        }

        // 9. Publish
        self.publish();

        TickResult {
            tick: self.tick_count,
            events: self.battle_log[log_start..].to_vec(),
            finished: self.mode == EngineMode::Finished,
        }
    }

    fn process_actions(&mut self) {
        for idx in 0..self.players.len() {
            if !self.players[idx].alive {
                continue;
            }
            let Some(action) = self.players[idx].pending_action.take() else {
                continue;
            };

            // A rejected action only affects its own player
            if let Err(reason) = self.resolve_action(idx, action) {
                let player = &self.players[idx];
                match reason {
                    ActionRejected::InvalidHeading => warn!(
                        player_id = %player.id,
                        action = %action.kind(),
                        "Dropped action with unusable heading"
                    ),
                    _ => debug!(
                        player_id = %player.id,
                        action = %action.kind(),
                        reason = %reason,
                        "Action had no effect"
                    ),
                }
            }
        }
    }

    fn resolve_action(&mut self, idx: usize, action: Action) -> Result<(), ActionRejected> {
        match action {
            Action::Move { aim } => self.handle_move(idx, aim),
            Action::Shoot { aim } => self.handle_shoot(idx, aim),
            Action::Reload => CombatSystem::reload(&mut self.players[idx]),
            Action::Shield => {
                let player = &mut self.players[idx];
                CombatSystem::spend_energy(player, SHIELD_ENERGY_COST)?;
                player.shield_ticks = SHIELD_DURATION_TICKS;
                Ok(())
            }
            Action::Dash { aim } => self.handle_dash(idx, aim),
        }
    }

    /// True if the player at `idx` could stand at (x, y)
    fn is_position_free(&self, idx: usize, x: f64, y: f64) -> bool {
        let me = &self.players[idx];
        if self.arena.is_blocked(x, y, me.radius) {
            return false;
        }

        !self.players.iter().enumerate().any(|(i, other)| {
            i != idx
                && other.alive
                && PhysicsSystem::circles_overlap(x, y, me.radius, other.x, other.y, other.radius)
        })
    }

    fn handle_move(&mut self, idx: usize, aim: Aim) -> Result<(), ActionRejected> {
        let (dx, dy) = aim.unit_vector().ok_or(ActionRejected::InvalidHeading)?;
        let player = &self.players[idx];
        let (x, y) = PhysicsSystem::step(player.x, player.y, dx, dy, MOVE_SPEED);

        // Whole step or nothing
        if !self.is_position_free(idx, x, y) {
            return Err(ActionRejected::Blocked);
        }

        let player = &mut self.players[idx];
        player.x = x;
        player.y = y;
        Ok(())
    }

    fn handle_shoot(&mut self, idx: usize, aim: Aim) -> Result<(), ActionRejected> {
        let (dx, dy) = aim.unit_vector().ok_or(ActionRejected::InvalidHeading)?;

        let shooter = &self.players[idx];
        let live = self
            .projectiles
            .iter()
            .filter(|p| p.alive && p.owner_id == shooter.id)
            .count();
        CombatSystem::can_shoot(shooter, live)?;

        let (x, y) = PhysicsSystem::step(shooter.x, shooter.y, dx, dy, shooter.radius + SPAWN_GAP);
        let owner_id = shooter.id.clone();
        let id = ProjectileId::generate(&mut self.rng);
        let projectile =
            Projectile::new(id, owner_id, x, y, dx, dy).ok_or(ActionRejected::InvalidHeading)?;

        self.players[idx].ammo -= 1;
        self.projectiles.push(projectile);
        Ok(())
    }

    fn handle_dash(&mut self, idx: usize, aim: Aim) -> Result<(), ActionRejected> {
        let (dx, dy) = aim.unit_vector().ok_or(ActionRejected::InvalidHeading)?;
        CombatSystem::spend_energy(&mut self.players[idx], DASH_ENERGY_COST)?;

        // Unit steps so a dash never skips through geometry
        for _ in 0..DASH_DISTANCE {
            let player = &self.players[idx];
            let (x, y) = PhysicsSystem::step(player.x, player.y, dx, dy, 1.0);
            if !self.is_position_free(idx, x, y) {
                break;
            }
            let player = &mut self.players[idx];
            player.x = x;
            player.y = y;
        }
        Ok(())
    }

    fn move_projectiles(&mut self) {
        for projectile in self.projectiles.iter_mut() {
            projectile.advance();
        }
    }

    fn check_projectile_collisions(&mut self) {
        for pi in 0..self.projectiles.len() {
            if !self.projectiles[pi].alive {
                continue;
            }

            // First living non-owner in registration order
            let projectile = &self.projectiles[pi];
            let target = self.players.iter().position(|p| {
                p.alive && p.id != projectile.owner_id && projectile.check_hit(p.x, p.y, p.radius)
            });

            if let Some(ti) = target {
                let hit = self.apply_hit(pi, ti);
                self.record_hit(hit);
            }
        }
    }

    fn apply_hit(&mut self, pi: usize, ti: usize) -> HitResult {
        let projectile = &mut self.projectiles[pi];
        projectile.destroy();
        let projectile_id = projectile.id.clone();
        let shooter_id = projectile.owner_id.clone();
        let damage = projectile.damage;

        let target = &mut self.players[ti];
        let target_shielded = target.is_shielded();
        let applied = target.take_damage(damage);
        let target_killed = !target.alive;
        let target_id = target.id.clone();

        if let Some(shooter) = self.player_mut(&shooter_id) {
            shooter.damage_dealt = shooter.damage_dealt.saturating_add(applied);
            if target_killed {
                shooter.kills += 1;
            }
        }

        HitResult {
            projectile_id,
            shooter_id,
            target_id,
            damage: applied,
            target_shielded,
            target_killed,
        }
    }

    fn record_hit(&mut self, hit: HitResult) {
        let tick = self.tick_count;
        debug!(
            tick,
            projectile_id = %hit.projectile_id,
            shooter_id = %hit.shooter_id,
            target_id = %hit.target_id,
            damage = hit.damage,
            "Projectile hit"
        );

        let killer = self.player(&hit.shooter_id).map(|p| p.username.clone());
        let victim = self
            .player(&hit.target_id)
            .map(|p| p.username.clone())
            .unwrap_or_default();

        self.battle_log.push(BattleEvent::Hit {
            tick,
            shooter: hit.shooter_id,
            target: hit.target_id,
            damage: hit.damage,
            shielded: hit.target_shielded,
        });

        if hit.target_killed {
            info!(tick, killer = ?killer, victim = %victim, "Player killed");
            self.battle_log.push(BattleEvent::Kill {
                tick,
                killer,
                victim,
            });
        }
    }

    fn check_projectile_wall_collisions(&mut self) {
        for projectile in self.projectiles.iter_mut().filter(|p| p.alive) {
            if self.arena.is_blocked(projectile.x, projectile.y, projectile.size) {
                projectile.destroy();
            }
        }
    }

    fn check_win_condition(&mut self) {
        if self.tick_count >= MAX_BATTLE_DURATION_TICKS {
            self.end_battle();
            return;
        }

        let alive = self.players.iter().filter(|p| p.alive).count();
        if alive <= 1 && self.players.len() > 1 {
            self.end_battle();
        }
    }

    fn end_battle(&mut self) {
        if self.mode != EngineMode::Battle {
            return;
        }

        self.ticking = false;
        self.mode = EngineMode::Finished;

        let winner = self
            .pick_winner()
            .map(|p| (p.id.clone(), p.username.clone()));
        let winner_name = winner
            .as_ref()
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| "none".to_string());
        self.winner = winner.map(|(id, _)| id);

        info!(tick = self.tick_count, winner = %winner_name, "Battle ended");
        self.battle_log.push(BattleEvent::GameOver {
            tick: self.tick_count,
            winner: winner_name,
        });
    }

    /// Sole survivor, otherwise highest hp with earliest registration
    /// breaking ties
    fn pick_winner(&self) -> Option<&Player> {
        let mut alive = self.players.iter().filter(|p| p.alive);
        if let (Some(sole), None) = (alive.next(), alive.next()) {
            return Some(sole);
        }

        self.players.iter().fold(None, |best: Option<&Player>, p| match best {
            Some(b) if b.hp >= p.hp => Some(b),
            _ => Some(p),
        })
    }

    fn publish(&self) {
        if let Some(callback) = &self.on_state_update {
            let snapshot = SnapshotBuilder::full(self);
            callback(&snapshot);
        }
    }

    // ── Snapshots ──────────────────────────────────

    pub fn full_snapshot(&self) -> FullSnapshot {
        SnapshotBuilder::full(self)
    }

    pub fn player_snapshot(&self, player_id: &PlayerId) -> Option<PlayerSnapshot> {
        SnapshotBuilder::for_player(self, player_id)
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        SnapshotBuilder::debug(self)
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}
