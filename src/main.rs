//! Arena server - runs a lobby with demo bots until shutdown
//!
//! Registers `DEMO_PLAYERS` bots, promotes them into a battle and drives
//! them with random actions. Finished battles are logged and a new one is
//! started from the lobby.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_core::app::AppState;
use arena_core::config::Config;
use arena_core::game::{EngineMode, PlayerId};
use arena_core::protocol::{ActionRequest, FullSnapshot};
use arena_core::util::time::{init_server_time, uptime_secs};

const BOT_ACTIONS: [&str; 5] = ["move", "move", "shoot", "reload", "dash"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level);
    init_server_time();

    info!(
        tick_ms = config.tick_interval.as_millis() as u64,
        seed = ?config.rng_seed,
        demo_players = config.demo_players,
        "Starting arena server"
    );

    let state = AppState::new(config);
    state.lobby.on_battle_update(Arc::new(log_snapshot));

    let mut bots = Vec::with_capacity(state.config.demo_players);
    for n in 1..=state.config.demo_players {
        bots.push(state.lobby.register(&format!("bot_{n}"))?);
    }

    if !bots.is_empty() {
        state.lobby.start_battle()?;
        tokio::spawn(drive_bots(state.clone(), bots));
    }

    shutdown_signal().await;

    state.lobby.shutdown();
    info!(uptime_secs = uptime_secs(), "Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

fn log_snapshot(snapshot: &FullSnapshot) {
    if snapshot.tick % 50 == 0 {
        let alive = snapshot.players.iter().filter(|p| p.alive).count();
        debug!(tick = snapshot.tick, alive, projectiles = snapshot.projectiles.len(), "Battle tick");
    }
    if let Some(winner) = &snapshot.winner {
        info!(tick = snapshot.tick, winner = %winner.username, kills = winner.kills, "Battle won");
        if let Ok(json) = serde_json::to_string(snapshot) {
            debug!(snapshot = %json, "Final battle state");
        }
    }
}

/// Submit a random action per bot each tick; restart finished battles
async fn drive_bots(state: AppState, bots: Vec<PlayerId>) {
    let mut rng = match state.config.rng_seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut ticker = interval(state.config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let finished = state
            .lobby
            .battle()
            .is_some_and(|battle| battle.with_engine(|e| e.mode() == EngineMode::Finished));
        if finished {
            if let Err(e) = state.lobby.reset().and_then(|_| state.lobby.start_battle().map(|_| ())) {
                warn!(error = %e, "Failed to restart battle");
                return;
            }
            continue;
        }

        for bot in &bots {
            let request = ActionRequest {
                action: BOT_ACTIONS.choose(&mut rng).unwrap_or(&"move").to_string(),
                direction: None,
                angle: Some(rng.gen_range(0.0..360.0)),
            };
            // Dead bots are rejected; that is expected
            if let Err(e) = state.lobby.submit_action(bot, &request) {
                debug!(player_id = %bot, error = %e, "Bot action rejected");
            }
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
