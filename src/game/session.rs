//! Run Session
//!
//! The game loop state machine. Owns the authoritative run, the command
//! queue and the command log, and publishes a fresh snapshot after every
//! committed tick and lifecycle transition.
//!
//! ```text
//!            start                 pause
//!   Idle ───────────▶ Running ◀─────────▶ Paused
//!    ▲                  │      resume       │
//!    │ reset            │ crash / end       │ end
//!    │                  ▼                   │
//!    └──────────────  GameOver ◀────────────┘
//!                       │ start
//!                       └───────▶ Running
//! ```
//!
//! Nothing here touches a clock or a thread: the runtime decides when
//! `step` is called.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::core::rng::derive_run_seed;
use crate::game::events::{EndCause, GameEvent};
use crate::game::input::{Command, CommandLog, CommandQueue, InputCommand};
use crate::game::state::{GameState, RunPhase, RunState};
use crate::game::tick::{end_run, tick, ConfigError, RunConfig, TickResult};

/// A lifecycle change that took effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Phase before the command
    pub from: RunPhase,
    /// Phase after the command
    pub to: RunPhase,
}

/// One player's session: consecutive runs sharing a high score.
pub struct RunSession {
    config: RunConfig,
    session_seed: u64,
    /// Runs started so far
    run_index: u32,
    phase: RunPhase,
    run: RunState,
    queue: CommandQueue,
    log: CommandLog,
    /// Ticks executed across all runs
    clock: u64,
    snapshot: Arc<GameState>,
}

impl RunSession {
    /// Create an idle session.
    pub fn new(config: RunConfig, session_seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;

        let run = RunState::new(derive_run_seed(session_seed, 0), 0);
        let snapshot = Arc::new(GameState::capture(&run, RunPhase::Idle));

        Ok(Self {
            config,
            session_seed,
            run_index: 0,
            phase: RunPhase::Idle,
            run,
            queue: CommandQueue::new(),
            log: CommandLog::new(session_seed),
            clock: 0,
            snapshot,
        })
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Record and apply a command.
    ///
    /// Gameplay commands are queued for the next tick. Lifecycle commands take
    /// effect immediately and return the transition, or `None` when the
    /// command is not valid in the current phase.
    pub fn submit(&mut self, command: Command) -> Option<Transition> {
        self.log.record(self.clock, command);

        let from = self.phase;
        let applied = match command {
            Command::Input(input) => {
                self.enqueue(input);
                return None;
            }
            Command::Start { high_score } => self.apply_start(high_score),
            Command::Pause => self.apply_phase(RunPhase::Running, RunPhase::Paused),
            Command::Resume => self.apply_phase(RunPhase::Paused, RunPhase::Running),
            Command::End => self.apply_end(),
            Command::Reset => self.apply_reset(),
        };

        if !applied {
            trace!(?command, phase = ?from, "Ignoring command");
            return None;
        }

        self.publish();
        debug!(?from, to = ?self.phase, clock = self.clock, "Run transition");
        Some(Transition { from, to: self.phase })
    }

    /// Start a new run, handing in a persisted high score.
    pub fn start_game(&mut self, high_score: Option<u32>) -> Option<Transition> {
        self.submit(Command::Start { high_score })
    }

    /// Suspend ticking.
    pub fn pause_game(&mut self) -> Option<Transition> {
        self.submit(Command::Pause)
    }

    /// Continue a paused run.
    pub fn resume_game(&mut self) -> Option<Transition> {
        self.submit(Command::Resume)
    }

    /// End the current run.
    pub fn end_game(&mut self) -> Option<Transition> {
        self.submit(Command::End)
    }

    /// Discard the run and return to idle.
    pub fn reset_game(&mut self) -> Option<Transition> {
        self.submit(Command::Reset)
    }

    /// Queue a lane change.
    pub fn move_lane(&mut self, lane: u8) {
        self.submit(InputCommand::MoveLane(lane).into());
    }

    /// Queue a jump start or stop.
    pub fn set_jumping(&mut self, jumping: bool) {
        self.submit(InputCommand::SetJumping(jumping).into());
    }

    /// Queue a slide start or stop.
    pub fn set_sliding(&mut self, sliding: bool) {
        self.submit(InputCommand::SetSliding(sliding).into());
    }

    fn enqueue(&mut self, input: InputCommand) {
        if self.phase.is_running() {
            self.queue.push(input);
        } else {
            trace!(?input, phase = ?self.phase, "Ignoring input outside a run");
        }
    }

    fn apply_start(&mut self, high_score: Option<u32>) -> bool {
        if !matches!(self.phase, RunPhase::Idle | RunPhase::GameOver) {
            return false;
        }

        let best = self.run.ledger.high_score.max(high_score.unwrap_or(0));
        let seed = derive_run_seed(self.session_seed, self.run_index);
        self.run_index += 1;

        self.run = RunState::new(seed, best);
        self.queue.clear();
        self.phase = RunPhase::Running;
        true
    }

    fn apply_phase(&mut self, from: RunPhase, to: RunPhase) -> bool {
        if self.phase != from {
            return false;
        }
        self.phase = to;
        true
    }

    fn apply_end(&mut self) -> bool {
        if !self.phase.is_running() {
            return false;
        }

        end_run(&mut self.run, EndCause::Ended);
        for event in self.run.take_events() {
            debug!(?event, "Run ended");
        }
        self.phase = RunPhase::GameOver;
        true
    }

    fn apply_reset(&mut self) -> bool {
        let best = self.run.ledger.high_score;
        let seed = derive_run_seed(self.session_seed, self.run_index);

        self.run = RunState::new(seed, best);
        self.queue.clear();
        self.phase = RunPhase::Idle;
        true
    }

    // =========================================================================
    // TICKING
    // =========================================================================

    /// Run one tick if the session is running.
    ///
    /// The tick runs on a scratch copy of the run, which replaces the
    /// authoritative run only once the tick has completed.
    pub fn step(&mut self) -> Option<TickResult> {
        if self.phase != RunPhase::Running {
            return None;
        }

        let inputs = self.queue.drain();
        let mut scratch = self.run.clone();
        let result = tick(&mut scratch, &inputs, &self.config);

        self.run = scratch;
        self.clock += 1;

        if result.game_over {
            self.phase = RunPhase::GameOver;
            debug!(
                tick = self.run.tick,
                score = self.run.ledger.score,
                high_score = self.run.ledger.high_score,
                "Run over"
            );
        }

        self.publish();
        Some(result)
    }

    fn publish(&mut self) {
        self.snapshot = Arc::new(GameState::capture(&self.run, self.phase));
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<GameState> {
        Arc::clone(&self.snapshot)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Ticks executed across all runs.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Session seed.
    pub fn session_seed(&self) -> u64 {
        self.session_seed
    }

    /// Best score of the session.
    pub fn high_score(&self) -> u32 {
        self.run.ledger.high_score
    }

    /// Authoritative state of the current run.
    pub fn run(&self) -> &RunState {
        &self.run
    }

    /// Run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Commands recorded so far.
    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    /// Number of gameplay commands waiting for the next tick.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Close the session and hand back its recording.
    pub fn into_log(mut self) -> CommandLog {
        self.log.finalize(self.clock);
        self.log
    }
}

/// Replay a recorded session.
///
/// Commands are re-submitted at the session clock they were recorded at,
/// ticking in between, until the recording (or `max_ticks`) runs out.
pub fn replay_session(
    config: RunConfig,
    seed: u64,
    log: &CommandLog,
    max_ticks: u64,
) -> Result<(RunSession, Vec<GameEvent>), ConfigError> {
    let mut session = RunSession::new(config, seed)?;
    let mut all_events = Vec::new();
    let end = log.end_tick.min(max_ticks);

    loop {
        // The clock visits every value, so each entry comes up exactly once
        let clock = session.clock();
        for entry in log.commands_at(clock) {
            session.submit(entry.command);
        }

        if clock >= end {
            break;
        }

        match session.step() {
            Some(result) => all_events.extend(result.events),
            // Not running and nothing left to resume it at this clock
            None => break,
        }
    }

    Ok((session, all_events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;
    use crate::game::state::{Lane, ObstacleKind};

    fn session() -> RunSession {
        RunSession::new(RunConfig::default(), 2024).unwrap()
    }

    #[test]
    fn test_starts_idle() {
        let mut session = session();
        assert_eq!(session.phase(), RunPhase::Idle);
        assert!(session.step().is_none());
        assert_eq!(session.clock(), 0);
        assert!(!session.snapshot().is_running);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = RunConfig::default();
        config.spawn.obstacle_interval = 0;
        assert!(RunSession::new(config, 1).is_err());
    }

    #[test]
    fn test_start_and_step() {
        let mut session = session();
        let transition = session.start_game(None);
        assert_eq!(transition, Some(Transition { from: RunPhase::Idle, to: RunPhase::Running }));

        session.move_lane(0);
        assert_eq!(session.queued(), 1);
        assert_eq!(session.snapshot().character_lane, Lane::CENTER, "moves wait for a tick");

        let result = session.step();
        assert!(result.is_some());
        assert_eq!(session.clock(), 1);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.character_lane, Lane::LEFT);
        assert!(snapshot.is_running && !snapshot.is_paused);
    }

    #[test]
    fn test_pause_holds_state_and_queue() {
        let mut session = session();
        session.start_game(None);
        session.step();

        session.pause_game();
        session.set_jumping(true);
        let before = session.snapshot();

        for _ in 0..10 {
            assert!(session.step().is_none());
        }

        let after = session.snapshot();
        assert_eq!(after.tick, before.tick);
        assert_eq!(after.distance, before.distance);
        assert!(after.is_paused && after.is_running);
        assert!(!after.is_jumping);
        assert_eq!(session.queued(), 1);

        session.resume_game();
        session.step();
        assert!(session.snapshot().is_jumping);
    }

    #[test]
    fn test_invalid_transitions_ignored() {
        let mut session = session();
        assert!(session.pause_game().is_none());
        assert!(session.resume_game().is_none());
        assert!(session.end_game().is_none());

        session.start_game(None);
        assert!(session.start_game(None).is_none());
        assert!(session.resume_game().is_none());
        assert_eq!(session.phase(), RunPhase::Running);
    }

    #[test]
    fn test_input_outside_run_ignored() {
        let mut session = session();
        session.move_lane(2);
        assert_eq!(session.queued(), 0);
        assert_eq!(session.log().len(), 1, "ignored commands are still recorded");
    }

    #[test]
    fn test_end_game_updates_high_score() {
        let mut session = session();
        session.start_game(None);
        for _ in 0..50 {
            session.step();
        }
        assert_eq!(session.snapshot().score, 10);

        let transition = session.end_game();
        assert_eq!(transition.map(|t| t.to), Some(RunPhase::GameOver));
        assert_eq!(session.high_score(), 10);

        let snapshot = session.snapshot();
        assert!(!snapshot.is_running);
        assert_eq!(snapshot.high_score, 10);
        assert!(session.step().is_none());
    }

    #[test]
    fn test_crash_is_game_over() {
        let mut session = session();
        session.start_game(Some(3));
        session.run.spawn_obstacle(Lane::CENTER, ObstacleKind::StaticBlock);
        session.run.obstacles[0].position = to_fixed(40.0);

        let result = session.step().unwrap();

        assert!(result.game_over);
        assert_eq!(session.phase(), RunPhase::GameOver);
        assert_eq!(session.snapshot().phase, RunPhase::GameOver);
        assert_eq!(session.high_score(), 3);
    }

    #[test]
    fn test_restart_keeps_high_score_and_reseeds() {
        let mut session = session();
        session.start_game(None);
        let first_seed = session.run().rng_seed;
        for _ in 0..100 {
            session.step();
        }
        session.end_game();

        session.start_game(None);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.coins, 0);
        assert_eq!(snapshot.tick, 0);
        assert_eq!(snapshot.high_score, 20);
        assert_ne!(session.run().rng_seed, first_seed);
    }

    #[test]
    fn test_start_raises_high_score() {
        let mut session = session();
        session.start_game(Some(250));
        assert_eq!(session.high_score(), 250);

        session.end_game();
        session.start_game(Some(100));
        assert_eq!(session.high_score(), 250);
    }

    #[test]
    fn test_reset_clears_run() {
        let mut session = session();
        session.start_game(Some(42));
        for _ in 0..130 {
            session.step();
        }
        session.pause_game();
        session.move_lane(0);

        let transition = session.reset_game();
        assert_eq!(transition, Some(Transition { from: RunPhase::Paused, to: RunPhase::Idle }));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, RunPhase::Idle);
        assert_eq!(snapshot.score, 0);
        assert!(snapshot.obstacles.is_empty());
        assert_eq!(snapshot.high_score, 42);
        assert_eq!(session.queued(), 0);
    }

    #[test]
    fn test_replay_matches_live_session() {
        let mut live = session();
        live.start_game(Some(5));
        for t in 0..900u32 {
            match t % 61 {
                0 => live.move_lane((t % 3) as u8),
                20 => live.set_sliding(true),
                35 => live.set_sliding(false),
                _ => {}
            }
            if t == 300 {
                live.pause_game();
            }
            if t == 320 {
                live.resume_game();
            }
            if live.step().is_none() && live.phase() == RunPhase::GameOver {
                live.start_game(None);
            }
        }

        let live_hash = live.run().compute_hash();
        let live_clock = live.clock();
        let live_phase = live.phase();
        let live_entries = live.log().entries().to_vec();
        let log = live.into_log();

        let bytes = log.to_bytes().unwrap();
        let restored = CommandLog::from_bytes(&bytes).unwrap();

        let (replayed, _) = replay_session(RunConfig::default(), restored.session_seed, &restored, u64::MAX).unwrap();

        assert_eq!(replayed.clock(), live_clock);
        assert_eq!(replayed.phase(), live_phase);
        assert_eq!(replayed.run().compute_hash(), live_hash);
        assert_eq!(replayed.log().entries(), live_entries.as_slice());
    }

    #[test]
    fn test_replay_stops_at_max_ticks() {
        let mut live = session();
        live.start_game(None);
        for _ in 0..200 {
            live.step();
        }
        let log = live.into_log();

        let (replayed, _) = replay_session(RunConfig::default(), log.session_seed, &log, 50).unwrap();
        assert_eq!(replayed.clock(), 50);
    }
}
