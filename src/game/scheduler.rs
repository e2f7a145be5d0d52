//! Periodic tick scheduling for a shared engine
//!
//! Each running engine gets one tokio task driving [`GameEngine::tick`] on
//! an interval. Ticks and external mutations serialize on the same lock, so
//! a tick never observes a half-applied action or mode change.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::protocol::{ActionRequest, DebugSnapshot, FullSnapshot, PlayerSnapshot};
use crate::util::time::Timer;

use super::engine::GameEngine;
use super::PlayerId;

struct Scheduled {
    engine: GameEngine,
    /// Bumped on every start/stop; a loop only ticks while its epoch is current
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<Scheduled>,
    period: Duration,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(task) = self.state.get_mut().task.take() {
            task.abort();
        }
    }
}

/// Cloneable handle to an engine and its tick loop.
///
/// The state callback runs under the engine lock; it must not call back
/// into the same handle.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<Shared>,
}

impl EngineHandle {
    pub fn new(engine: GameEngine, period: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Scheduled {
                    engine,
                    epoch: 0,
                    task: None,
                }),
                period,
            }),
        }
    }

    /// Read engine state under the lock
    pub fn with_engine<R>(&self, f: impl FnOnce(&GameEngine) -> R) -> R {
        f(&self.shared.state.lock().engine)
    }

    /// Mutate engine state under the lock
    pub fn with_engine_mut<R>(&self, f: impl FnOnce(&mut GameEngine) -> R) -> R {
        f(&mut self.shared.state.lock().engine)
    }

    pub fn submit_action(
        &self,
        player_id: &PlayerId,
        request: &ActionRequest,
    ) -> Result<(), EngineError> {
        self.with_engine_mut(|engine| engine.submit_action(player_id, request))
    }

    pub fn full_snapshot(&self) -> FullSnapshot {
        self.with_engine(GameEngine::full_snapshot)
    }

    pub fn player_snapshot(&self, player_id: &PlayerId) -> Option<PlayerSnapshot> {
        self.with_engine(|engine| engine.player_snapshot(player_id))
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        self.with_engine(GameEngine::debug_snapshot)
    }

    /// Enter battle and (re)start the tick loop. Must be called inside a
    /// tokio runtime.
    pub fn start_battle(&self) -> Result<(), EngineError> {
        let mut state = self.shared.state.lock();
        state.engine.start_battle()?;
        self.spawn_loop(&mut state);
        Ok(())
    }

    /// Enter sandbox and (re)start the tick loop. Must be called inside a
    /// tokio runtime.
    pub fn start_sandbox(&self) {
        let mut state = self.shared.state.lock();
        state.engine.start_sandbox();
        self.spawn_loop(&mut state);
    }

    /// Force the engine to finished and cancel its loop
    pub fn stop_battle(&self) {
        let mut state = self.shared.state.lock();
        state.engine.stop_battle();
        Self::cancel(&mut state);
    }

    /// Cancel the loop and reset the engine to a clean sandbox
    pub fn reset_to_lobby(&self) {
        let mut state = self.shared.state.lock();
        Self::cancel(&mut state);
        state.engine.reset_to_lobby();
    }

    /// Halt ticking without touching the engine's mode. No tick runs after
    /// this returns.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        state.engine.pause();
        Self::cancel(&mut state);
    }

    pub fn is_running(&self) -> bool {
        let state = self.shared.state.lock();
        state.engine.is_ticking() && state.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn cancel(state: &mut Scheduled) {
        state.epoch += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }

    fn spawn_loop(&self, state: &mut Scheduled) {
        Self::cancel(state);

        let epoch = state.epoch;
        let period = self.shared.period;
        let weak = Arc::downgrade(&self.shared);

        state.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !run_scheduled_tick(&weak, epoch, period) {
                    break;
                }
            }
            debug!(epoch, "Tick loop exited");
        }));
    }
}

/// One scheduled tick. Returns whether the loop should keep going.
fn run_scheduled_tick(shared: &Weak<Shared>, epoch: u64, period: Duration) -> bool {
    let Some(shared) = shared.upgrade() else {
        return false;
    };
    let mut state = shared.state.lock();
    if state.epoch != epoch || !state.engine.is_ticking() {
        return false;
    }

    let timer = Timer::new();
    let result = state.engine.tick();

    let elapsed = timer.elapsed_ms();
    if elapsed > period.as_millis() as u64 {
        warn!(tick = result.tick, elapsed_ms = elapsed, "Tick overran its interval");
    }

    !result.finished
}
