//! Engine Driver
//!
//! Runs a `RunSession` on a tokio task at a fixed tick rate. The task is the
//! only writer; collaborators talk to it through a cloneable `CommandSender`
//! and read snapshots from a watch channel or an update callback.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument, trace};
use uuid::Uuid;

use crate::core::rng::derive_session_seed;
use crate::game::input::{Command, CommandLog, CommandLogError, InputCommand};
use crate::game::session::RunSession;
use crate::game::state::{GameState, RunPhase};
use crate::game::tick::{ConfigError, RunConfig};
use crate::TICK_RATE;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Ticks per second
    pub tick_rate: u32,
    /// Session seed; random when unset
    pub seed: Option<u64>,
    /// Simulation tuning
    pub run: RunConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            seed: None,
            run: RunConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    ///
    /// * `LANE_RUNNER_TICK_RATE` - ticks per second
    /// * `LANE_RUNNER_SEED` - fixed session seed
    /// * `LANE_RUNNER_CONFIG` - path to a JSON `RunConfig`; missing fields keep their defaults
    pub fn from_env() -> Result<Self, EngineError> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("LANE_RUNNER_TICK_RATE") {
            config.tick_rate = value.trim().parse().map_err(|_| EngineError::InvalidEnv {
                name: "LANE_RUNNER_TICK_RATE",
                value,
            })?;
        }

        if let Ok(value) = std::env::var("LANE_RUNNER_SEED") {
            let seed = value.trim().parse().map_err(|_| EngineError::InvalidEnv {
                name: "LANE_RUNNER_SEED",
                value,
            })?;
            config.seed = Some(seed);
        }

        if let Ok(path) = std::env::var("LANE_RUNNER_CONFIG") {
            let text = std::fs::read_to_string(&path)?;
            config.run = serde_json::from_str(&text)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(EngineError::InvalidTickRate(self.tick_rate));
        }
        self.run.validate()?;
        Ok(())
    }

    /// Wall-clock time between ticks.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate.max(1) as u64)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The driver task is gone.
    #[error("engine has stopped")]
    Stopped,

    /// Tick rate outside 1..=1000 Hz.
    #[error("invalid tick rate: {0} Hz")]
    InvalidTickRate(u32),

    /// Unparseable environment variable.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// Invalid run configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Command log could not be encoded or decoded.
    #[error("command log error: {0}")]
    CommandLog(#[from] CommandLogError),

    /// The driver task panicked.
    #[error("engine task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// =============================================================================
// COMMAND SENDER
// =============================================================================

/// Callback invoked with every published snapshot.
pub type UpdateListener = Box<dyn FnMut(Arc<GameState>) + Send + 'static>;

/// Messages for the driver task.
enum Control {
    Command(Command),
    /// Start a run; the listener replaces the old one only if the run starts
    Start {
        high_score: Option<u32>,
        on_update: UpdateListener,
    },
    Shutdown,
}

/// Cloneable handle for submitting commands from any thread.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Control>,
}

impl CommandSender {
    /// Submit a command.
    pub fn send(&self, command: Command) -> Result<(), EngineError> {
        self.control(Control::Command(command))
    }

    fn control(&self, message: Control) -> Result<(), EngineError> {
        self.tx.send(message).map_err(|_| EngineError::Stopped)
    }

    /// Queue a lane change for the next tick.
    pub fn move_lane(&self, lane: u8) -> Result<(), EngineError> {
        self.send(InputCommand::MoveLane(lane).into())
    }

    /// Queue a jump start or stop for the next tick.
    pub fn set_jumping(&self, jumping: bool) -> Result<(), EngineError> {
        self.send(InputCommand::SetJumping(jumping).into())
    }

    /// Queue a slide start or stop for the next tick.
    pub fn set_sliding(&self, sliding: bool) -> Result<(), EngineError> {
        self.send(InputCommand::SetSliding(sliding).into())
    }

    /// Start a run without changing the update callback.
    pub fn start_game(&self, high_score: Option<u32>) -> Result<(), EngineError> {
        self.send(Command::Start { high_score })
    }

    /// Suspend ticking.
    pub fn pause_game(&self) -> Result<(), EngineError> {
        self.send(Command::Pause)
    }

    /// Continue a paused run.
    pub fn resume_game(&self) -> Result<(), EngineError> {
        self.send(Command::Resume)
    }

    /// Discard the run and return to idle.
    pub fn reset_game(&self) -> Result<(), EngineError> {
        self.send(Command::Reset)
    }

    /// End the current run.
    pub fn end_game(&self) -> Result<(), EngineError> {
        self.send(Command::End)
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// A running engine instance.
pub struct Engine {
    id: Uuid,
    session_seed: u64,
    sender: CommandSender,
    snapshots: watch::Receiver<Arc<GameState>>,
    task: JoinHandle<CommandLog>,
}

impl Engine {
    /// Spawn the driver task on the current tokio runtime.
    pub fn spawn(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let id = Uuid::new_v4();
        let session_seed = config
            .seed
            .unwrap_or_else(|| derive_session_seed(id.as_bytes()));
        let session = RunSession::new(config.run.clone(), session_seed)?;

        let (snapshot_tx, snapshots) = watch::channel(session.snapshot());
        let (tx, rx) = mpsc::unbounded_channel();
        let period = config.tick_duration();

        info!(engine = %id, session_seed, tick_rate = config.tick_rate, "Engine starting");
        let task = tokio::spawn(drive(id, session, rx, snapshot_tx, period));

        Ok(Self {
            id,
            session_seed,
            sender: CommandSender { tx },
            snapshots,
            task,
        })
    }

    /// Engine session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Seed every run of this engine derives from.
    pub fn session_seed(&self) -> u64 {
        self.session_seed
    }

    /// Handle for submitting commands from elsewhere.
    pub fn commands(&self) -> CommandSender {
        self.sender.clone()
    }

    /// Start a run and install `on_update`.
    ///
    /// If the run starts, the callback replaces any previous one and sees
    /// every snapshot from the start transition on. If the start is ignored
    /// (a run is already live), the current callback stays in place.
    pub fn start_game<F>(&self, high_score: Option<u32>, on_update: F) -> Result<(), EngineError>
    where
        F: FnMut(Arc<GameState>) + Send + 'static,
    {
        self.sender.control(Control::Start {
            high_score,
            on_update: Box::new(on_update),
        })
    }

    /// Queue a lane change for the next tick.
    pub fn move_lane(&self, lane: u8) -> Result<(), EngineError> {
        self.sender.move_lane(lane)
    }

    /// Queue a jump start or stop for the next tick.
    pub fn set_jumping(&self, jumping: bool) -> Result<(), EngineError> {
        self.sender.set_jumping(jumping)
    }

    /// Queue a slide start or stop for the next tick.
    pub fn set_sliding(&self, sliding: bool) -> Result<(), EngineError> {
        self.sender.set_sliding(sliding)
    }

    /// Suspend ticking.
    pub fn pause_game(&self) -> Result<(), EngineError> {
        self.sender.pause_game()
    }

    /// Continue a paused run.
    pub fn resume_game(&self) -> Result<(), EngineError> {
        self.sender.resume_game()
    }

    /// Discard the run and return to idle.
    pub fn reset_game(&self) -> Result<(), EngineError> {
        self.sender.reset_game()
    }

    /// End the current run.
    pub fn end_game(&self) -> Result<(), EngineError> {
        self.sender.end_game()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<GameState>> {
        self.snapshots.clone()
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> Arc<GameState> {
        self.snapshots.borrow().clone()
    }

    /// Stop the driver and return the session's command log.
    pub async fn shutdown(self) -> Result<CommandLog, EngineError> {
        // Already stopped if this fails; the join below reports how
        let _ = self.sender.control(Control::Shutdown);
        drop(self.sender);
        Ok(self.task.await?)
    }
}

// =============================================================================
// DRIVER TASK
// =============================================================================

#[instrument(skip_all, fields(engine = %id))]
async fn drive(
    id: Uuid,
    mut session: RunSession,
    mut control: mpsc::UnboundedReceiver<Control>,
    snapshots: watch::Sender<Arc<GameState>>,
    period: Duration,
) -> CommandLog {
    let mut listener: Option<UpdateListener> = None;
    // Exists only while the run is Running
    let mut ticker: Option<Interval> = None;

    loop {
        tokio::select! {
            message = control.recv() => match message {
                Some(Control::Command(command)) => {
                    if let Some(transition) = session.submit(command) {
                        info!(from = ?transition.from, to = ?transition.to, "Lifecycle transition");
                        publish(&session, &snapshots, &mut listener);
                    } else if command.is_lifecycle() {
                        debug!(?command, phase = ?session.phase(), "Lifecycle command ignored");
                    }
                }
                Some(Control::Start { high_score, on_update }) => {
                    match session.submit(Command::Start { high_score }) {
                        Some(transition) => {
                            trace!("Update listener installed");
                            listener = Some(on_update);
                            info!(from = ?transition.from, to = ?transition.to, "Lifecycle transition");
                            publish(&session, &snapshots, &mut listener);
                        }
                        None => debug!(phase = ?session.phase(), "Start ignored, keeping update listener"),
                    }
                }
                Some(Control::Shutdown) => {
                    debug!("Shutdown requested");
                    break;
                }
                None => {
                    debug!("All command senders dropped");
                    break;
                }
            },
            _ = next_tick(&mut ticker) => {
                if let Some(result) = session.step() {
                    for event in &result.events {
                        trace!(?event, "Game event");
                    }
                    if result.game_over {
                        let state = session.snapshot();
                        info!(score = state.score, coins = state.coins, high_score = state.high_score, "Game over");
                    }
                    publish(&session, &snapshots, &mut listener);
                }
            }
        }

        sync_ticker(&mut ticker, session.phase(), period);
    }

    // No tick can fire into a torn-down session
    drop(ticker);
    drop(listener);

    info!(clock = session.clock(), high_score = session.high_score(), "Engine stopped");
    session.into_log()
}

/// Wait for the next tick, or forever when not ticking.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Create the interval on entering Running, drop it on leaving.
fn sync_ticker(ticker: &mut Option<Interval>, phase: RunPhase, period: Duration) {
    match (phase == RunPhase::Running, ticker.is_some()) {
        (true, false) => {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            *ticker = Some(interval);
        }
        (false, true) => *ticker = None,
        _ => {}
    }
}

fn publish(
    session: &RunSession,
    snapshots: &watch::Sender<Arc<GameState>>,
    listener: &mut Option<UpdateListener>,
) {
    let snapshot = session.snapshot();
    trace_snapshot(&snapshot);

    snapshots.send_replace(Arc::clone(&snapshot));
    if let Some(on_update) = listener.as_mut() {
        on_update(snapshot);
    }
}

#[cfg(feature = "debug-tracing")]
fn trace_snapshot(snapshot: &GameState) {
    match serde_json::to_string(snapshot) {
        Ok(json) => trace!(snapshot = %json, "Publishing snapshot"),
        Err(e) => tracing::warn!("Failed to serialize snapshot: {}", e),
    }
}

#[cfg(not(feature = "debug-tracing"))]
fn trace_snapshot(_snapshot: &GameState) {}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tokio::time::sleep;

    use crate::game::session::replay_session;
    use crate::game::state::Lane;

    fn seeded(seed: u64) -> EngineConfig {
        EngineConfig {
            seed: Some(seed),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());

        let config = EngineConfig {
            tick_rate: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidTickRate(0))));

        let mut config = EngineConfig::default();
        config.run.spawn.power_up_interval = 0;
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_tick_duration() {
        assert_eq!(EngineConfig::default().tick_duration(), Duration::from_micros(16_666));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_engine_does_not_tick() {
        let engine = Engine::spawn(seeded(1)).unwrap();

        sleep(Duration::from_secs(2)).await;

        let state = engine.latest();
        assert_eq!(state.phase, RunPhase::Idle);
        assert_eq!(state.tick, 0);
        engine.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_ticks_and_notifies() {
        let engine = Engine::spawn(seeded(2)).unwrap();
        let updates = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&updates);
        engine
            .start_game(None, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        sleep(Duration::from_millis(500)).await;

        let state = engine.latest();
        assert!(state.is_running);
        assert!(state.tick > 0);
        // Start transition plus one snapshot per tick
        assert_eq!(updates.load(Ordering::SeqCst), state.tick as usize + 1);

        engine.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_start_keeps_listener() {
        let engine = Engine::spawn(seeded(8)).unwrap();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        engine
            .start_game(None, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        sleep(Duration::from_millis(200)).await;

        // Run already live: the start is ignored and the callback kept
        let counter = Arc::clone(&second);
        engine
            .start_game(Some(99), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let before = first.load(Ordering::SeqCst);
        sleep(Duration::from_millis(200)).await;

        assert!(first.load(Ordering::SeqCst) > before);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert_eq!(engine.latest().high_score, 0);

        // A run that actually starts installs the new callback
        engine.end_game().unwrap();
        let counter = Arc::clone(&second);
        engine
            .start_game(None, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        sleep(Duration::from_millis(200)).await;

        let stale = first.load(Ordering::SeqCst);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(first.load(Ordering::SeqCst), stale);
        assert!(second.load(Ordering::SeqCst) > 0);

        engine.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_snapshot() {
        let engine = Engine::spawn(seeded(3)).unwrap();
        let mut rx = engine.subscribe();

        engine.start_game(None, |_| {}).unwrap();
        sleep(Duration::from_millis(300)).await;

        engine.pause_game().unwrap();
        let paused = rx.wait_for(|s| s.is_paused).await.unwrap().clone();

        sleep(Duration::from_secs(5)).await;
        assert_eq!(*engine.latest(), *paused);

        engine.resume_game().unwrap();
        sleep(Duration::from_millis(300)).await;

        let resumed = engine.latest();
        assert!(!resumed.is_paused);
        assert!(resumed.tick > paused.tick);

        engine.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_from_cloned_sender() {
        let engine = Engine::spawn(seeded(4)).unwrap();
        let mut rx = engine.subscribe();
        let sender = engine.commands();

        engine.start_game(None, |_| {}).unwrap();
        sender.move_lane(0).unwrap();
        sender.set_sliding(true).unwrap();

        let state = rx
            .wait_for(|s| s.character_lane == Lane::LEFT)
            .await
            .unwrap()
            .clone();
        assert!(state.is_sliding);

        engine.shutdown().await.unwrap();
        assert!(matches!(sender.end_game(), Err(EngineError::Stopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_log_replays() {
        let engine = Engine::spawn(seeded(5)).unwrap();
        let mut rx = engine.subscribe();

        engine.start_game(Some(7), |_| {}).unwrap();
        sleep(Duration::from_millis(400)).await;
        engine.move_lane(2).unwrap();
        sleep(Duration::from_millis(400)).await;
        engine.pause_game().unwrap();
        let last = rx.wait_for(|s| s.is_paused).await.unwrap().clone();

        let log = engine.shutdown().await.unwrap();
        assert_eq!(log.session_seed, 5);
        assert_eq!(log.len(), 3);

        let (replayed, _) = replay_session(RunConfig::default(), log.session_seed, &log, u64::MAX).unwrap();
        assert_eq!(*replayed.snapshot(), *last);
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_command_stress() {
        let engine = Engine::spawn(seeded(6)).unwrap();
        let rx = engine.subscribe();
        let violated = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&violated);
        engine
            .start_game(None, move |state| {
                let bad = state.character_lane.get() > 2
                    || (state.is_jumping && state.is_sliding)
                    || (state.is_paused && !state.is_running);
                if bad {
                    flag.store(true, Ordering::SeqCst);
                }
            })
            .unwrap();

        let mut workers = Vec::new();
        for worker in 0..4u64 {
            let sender = engine.commands();
            workers.push(tokio::spawn(async move {
                let mut rng = StdRng::seed_from_u64(worker);
                for _ in 0..100 {
                    sleep(Duration::from_millis(rng.gen_range(1..40))).await;
                    let command = match rng.gen_range(0..20) {
                        0 => Command::Pause,
                        1 => Command::Resume,
                        2 => Command::Start { high_score: None },
                        3 => Command::Reset,
                        4 => Command::End,
                        5..=10 => InputCommand::MoveLane(rng.gen_range(0..4)).into(),
                        11..=15 => InputCommand::SetJumping(rng.gen()).into(),
                        _ => InputCommand::SetSliding(rng.gen()).into(),
                    };
                    sender.send(command).unwrap();
                }
            }));
        }
        for worker in workers {
            worker.await.unwrap();
        }

        let log = engine.shutdown().await.unwrap();
        assert!(!violated.load(Ordering::SeqCst));

        let last = rx.borrow().clone();
        let (replayed, _) = replay_session(RunConfig::default(), log.session_seed, &log, u64::MAX).unwrap();
        assert_eq!(*replayed.snapshot(), *last);
    }
}
