//! Lane Runner Demo
//!
//! Plays a headless session with a simple autopilot, verifies it replays to
//! the same state hash, then drives a short real-time session on tokio.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lane_runner::{
    TICK_RATE, VERSION,
    game::{
        character::Pose,
        collision::pose_clears,
        events::GameEventData,
        input::{CommandLog, InputCommand},
        session::{replay_session, RunSession},
        state::{GameState, Lane, PowerUpKind},
        tick::RunConfig,
    },
    runtime::{Engine, EngineConfig},
};

/// Headless demo length: two minutes of game time.
const DEMO_TICKS: u64 = 120 * TICK_RATE as u64;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::from_env().context("failed to load engine config")?;

    info!("Lane Runner Engine v{}", VERSION);
    info!("Tick Rate: {} Hz", config.tick_rate);

    let seed = config.seed.unwrap_or(12345);
    demo_session(&config.run, seed)?;
    demo_engine(config).await?;

    Ok(())
}

/// Play, record and replay a headless session.
fn demo_session(run_config: &RunConfig, seed: u64) -> Result<()> {
    info!("=== Starting Demo Session ===");
    info!("Session Seed: {}", seed);

    let mut session = RunSession::new(run_config.clone(), seed).context("invalid run config")?;
    session.start_game(None);

    let mut runs = 1;
    let mut ended = 0;
    let mut last_report = 0;

    while session.clock() < DEMO_TICKS {
        for command in autopilot(&session.snapshot(), run_config) {
            session.submit(command.into());
        }

        let Some(result) = session.step() else {
            // Run over: start the next one
            runs += 1;
            session.start_game(None);
            continue;
        };

        for event in &result.events {
            if event.is_run_end() {
                ended += 1;
            }
            match &event.data {
                GameEventData::LevelUp { level } => {
                    info!("Tick {}: level {}", event.tick, level);
                }
                GameEventData::PowerUpCollected { kind, refreshed, .. } => {
                    info!("Tick {}: picked up {:?}{}", event.tick, kind, if *refreshed { " (refreshed)" } else { "" });
                }
                GameEventData::ObstacleHit { kind, shielded: true, .. } => {
                    info!("Tick {}: shield absorbed {:?}", event.tick, kind);
                }
                GameEventData::RunEnded { score, coins, high_score, new_high_score, .. } => {
                    info!(
                        "Run {} over at tick {}: score {}, coins {}, high score {}{}",
                        runs, event.tick, score, coins, high_score,
                        if *new_high_score { " (new)" } else { "" }
                    );
                }
                _ => {}
            }
        }

        if session.clock() - last_report >= 600 {
            let state = session.snapshot();
            info!(
                "Clock {}: run tick {}, score {}, coins {}, speed {:.2}, {} obstacles ahead{}",
                session.clock(), state.tick, state.score, state.coins,
                state.scroll_speed_units(), state.obstacles.len(),
                if state.has_power_up(PowerUpKind::Shield) { ", shielded" } else { "" }
            );
            last_report = session.clock();
        }
    }

    // Print final results
    info!("=== Session Results ===");
    let hash = session.run().compute_hash();
    info!("Runs: {} ({} finished), High Score: {}", runs, ended, session.high_score());
    info!("Final State Hash: {}", hex::encode(hash));

    let log = session.into_log();
    let bytes = log.to_bytes()?;
    info!("Command log: {} entries, {} bytes, hash {}", log.len(), bytes.len(), hex::encode(log.compute_hash()));

    // Verify determinism by replaying the recording
    info!("=== Verifying Determinism ===");
    let restored = CommandLog::from_bytes(&bytes)?;
    let (replayed, _) = replay_session(run_config.clone(), restored.session_seed, &restored, u64::MAX)?;
    let replay_hash = replayed.run().compute_hash();

    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash != replay_hash {
        bail!("DETERMINISM FAILURE: Hashes differ!");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}

/// Drive a short real-time session through the tokio engine.
async fn demo_engine(config: EngineConfig) -> Result<()> {
    info!("=== Starting Live Engine ===");

    let run_config = config.run.clone();
    let engine = Engine::spawn(config)?;
    info!("Engine {} (seed {})", engine.id(), engine.session_seed());

    let updates = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&updates);
    engine.start_game(None, move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    })?;

    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    for _ in 0..60 {
        ticker.tick().await;
        let state = engine.latest();
        if !state.is_running {
            warn!("Run ended early at tick {}", state.tick);
            break;
        }
        for command in autopilot(&state, &run_config) {
            engine.commands().send(command.into())?;
        }
    }

    engine.pause_game()?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let state = engine.latest();
    info!(
        "Paused at tick {}: score {}, coins {}, {} snapshots delivered",
        state.tick, state.score, state.coins, updates.load(Ordering::Relaxed)
    );

    let log = engine.shutdown().await?;
    info!("Engine stopped, {} commands recorded", log.len());
    Ok(())
}

/// Dodge whatever is coming in the current lane.
fn autopilot(state: &GameState, config: &RunConfig) -> Vec<InputCommand> {
    let lookahead = config.track.obstacle_hit_window.saturating_mul(3);
    let threats = |lane: Lane| {
        state
            .obstacles
            .iter()
            .filter(move |o| o.lane == lane && o.position >= 0 && o.position <= lookahead)
            .map(|o| o.kind)
    };

    let lane = state.character_lane;
    if threats(lane).next().is_none() {
        return match (state.is_jumping, state.is_sliding) {
            (true, _) => vec![InputCommand::SetJumping(false)],
            (_, true) => vec![InputCommand::SetSliding(false)],
            _ => Vec::new(),
        };
    }

    if let Some(clear) = Lane::ALL.into_iter().find(|l| threats(*l).next().is_none()) {
        return vec![InputCommand::MoveLane(clear.get())];
    }

    // A shield absorbs one hit; save the pose change
    if state.has_power_up(PowerUpKind::Shield) {
        return Vec::new();
    }

    if threats(lane).all(|kind| pose_clears(Pose::Jumping, kind)) {
        vec![InputCommand::SetJumping(true)]
    } else if threats(lane).all(|kind| pose_clears(Pose::Sliding, kind)) {
        vec![InputCommand::SetSliding(true)]
    } else {
        Vec::new()
    }
}
