//! Commands, Command Queue and Command Log
//!
//! Collaborators never touch the run directly. Gameplay commands are queued
//! and drained once per tick; every command is also recorded, timestamped
//! with the session clock, so a session can be replayed exactly.

use std::collections::VecDeque;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::{StateHash, StateHasher};

// =============================================================================
// COMMAND TYPES
// =============================================================================

/// Gameplay command, applied at the start of the next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputCommand {
    /// Move to a lane (0-2). Out-of-range and same-lane targets are ignored.
    MoveLane(u8),
    /// Start or stop a jump
    SetJumping(bool),
    /// Start or stop a slide
    SetSliding(bool),
}

/// Anything a collaborator can ask of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Queued for the next tick
    Input(InputCommand),
    /// Start a new run, optionally handing in a persisted high score
    Start {
        /// Persisted best score
        high_score: Option<u32>,
    },
    /// Suspend ticking
    Pause,
    /// Continue ticking
    Resume,
    /// Back to idle, clearing the run
    Reset,
    /// End the current run
    End,
}

impl Command {
    /// Lifecycle commands apply immediately; gameplay commands wait for a tick.
    #[inline]
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, Command::Input(_))
    }
}

impl From<InputCommand> for Command {
    fn from(input: InputCommand) -> Self {
        Command::Input(input)
    }
}

// =============================================================================
// COMMAND QUEUE
// =============================================================================

/// Single-consumer FIFO of gameplay commands.
#[derive(Clone, Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<InputCommand>,
}

impl CommandQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command for the next tick.
    pub fn push(&mut self, command: InputCommand) {
        self.pending.push_back(command);
    }

    /// Take every queued command, oldest first.
    pub fn drain(&mut self) -> Vec<InputCommand> {
        self.pending.drain(..).collect()
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// =============================================================================
// COMMAND LOG
// =============================================================================

/// Command log errors.
#[derive(Debug, Error)]
pub enum CommandLogError {
    /// Serialization failed
    #[error("failed to encode command log: {0}")]
    Encode(#[source] bincode::Error),

    /// Bytes are not a command log
    #[error("failed to decode command log: {0}")]
    Decode(#[source] bincode::Error),

    /// Recorded by an incompatible format version
    #[error("unsupported command log version {0}")]
    UnsupportedVersion(u16),
}

/// One recorded command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// Session clock (ticks executed so far) when the command was submitted
    pub tick: u64,
    /// The command
    pub command: Command,
}

/// Complete command recording of one session.
///
/// Entries are appended in submission order, so timestamps never decrease.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLog {
    /// Format version
    pub version: u16,

    /// Session seed every run seed derives from
    pub session_seed: u64,

    /// Session clock when recording stopped
    pub end_tick: u64,

    entries: Vec<CommandEntry>,
}

impl CommandLog {
    /// Current format version
    pub const VERSION: u16 = 1;

    /// Create an empty log for a session.
    pub fn new(session_seed: u64) -> Self {
        Self {
            version: Self::VERSION,
            session_seed,
            end_tick: 0,
            entries: Vec::with_capacity(256),
        }
    }

    /// Record a command at the given session clock.
    pub fn record(&mut self, tick: u64, command: Command) {
        debug_assert!(self.entries.last().map_or(true, |e| e.tick <= tick));
        self.end_tick = self.end_tick.max(tick);
        self.entries.push(CommandEntry { tick, command });
    }

    /// Mark the session clock at the end of recording.
    pub fn finalize(&mut self, end_tick: u64) {
        self.end_tick = self.end_tick.max(end_tick);
    }

    /// All entries, in submission order.
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the log empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries submitted while the session clock read `tick`.
    ///
    /// Uses binary search over the ordered timestamps.
    pub fn commands_at(&self, tick: u64) -> &[CommandEntry] {
        let start = self.entries.partition_point(|e| e.tick < tick);
        let end = self.entries.partition_point(|e| e.tick <= tick);
        &self.entries[start..end]
    }

    /// Serialize with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CommandLogError> {
        bincode::serialize(self).map_err(CommandLogError::Encode)
    }

    /// Deserialize with bincode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CommandLogError> {
        let log: CommandLog = bincode::deserialize(bytes).map_err(CommandLogError::Decode)?;
        if log.version != Self::VERSION {
            return Err(CommandLogError::UnsupportedVersion(log.version));
        }
        Ok(log)
    }

    /// Hash of the recording, for comparing sessions.
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_command_log();
        hasher.update_u64(self.session_seed);
        hasher.update_u64(self.end_tick);

        for entry in &self.entries {
            hasher.update_u64(entry.tick);
            match entry.command {
                Command::Input(InputCommand::MoveLane(lane)) => {
                    hasher.update_u8(0);
                    hasher.update_u8(lane);
                }
                Command::Input(InputCommand::SetJumping(on)) => {
                    hasher.update_u8(1);
                    hasher.update_bool(on);
                }
                Command::Input(InputCommand::SetSliding(on)) => {
                    hasher.update_u8(2);
                    hasher.update_bool(on);
                }
                Command::Start { high_score } => {
                    hasher.update_u8(3);
                    hasher.update_bool(high_score.is_some());
                    hasher.update_u32(high_score.unwrap_or(0));
                }
                Command::Pause => hasher.update_u8(4),
                Command::Resume => hasher.update_u8(5),
                Command::Reset => hasher.update_u8(6),
                Command::End => hasher.update_u8(7),
            }
        }

        hasher.finalize()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = CommandQueue::new();
        queue.push(InputCommand::MoveLane(0));
        queue.push(InputCommand::SetJumping(true));
        queue.push(InputCommand::MoveLane(2));

        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.drain(),
            vec![
                InputCommand::MoveLane(0),
                InputCommand::SetJumping(true),
                InputCommand::MoveLane(2),
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_clear() {
        let mut queue = CommandQueue::new();
        queue.push(InputCommand::SetSliding(true));
        queue.clear();
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_lifecycle_classification() {
        assert!(!Command::Input(InputCommand::MoveLane(1)).is_lifecycle());
        assert!(Command::Pause.is_lifecycle());
        assert!(Command::Start { high_score: None }.is_lifecycle());
    }

    #[test]
    fn test_commands_at() {
        let mut log = CommandLog::new(1);
        log.record(0, Command::Start { high_score: None });
        log.record(0, InputCommand::MoveLane(2).into());
        log.record(10, InputCommand::SetJumping(true).into());
        log.record(30, Command::Pause);

        assert_eq!(log.commands_at(0).len(), 2);
        assert_eq!(log.commands_at(0)[1].command, Command::Input(InputCommand::MoveLane(2)));
        assert!(log.commands_at(5).is_empty());
        assert_eq!(log.commands_at(10).len(), 1);
        assert_eq!(log.commands_at(30)[0].command, Command::Pause);
        assert!(log.commands_at(31).is_empty());
        assert_eq!(log.end_tick, 30);
    }

    #[test]
    fn test_log_bytes() {
        let mut log = CommandLog::new(0xDEAD_BEEF);
        log.record(0, Command::Start { high_score: Some(120) });
        log.record(4, InputCommand::SetSliding(true).into());
        log.record(9, Command::End);
        log.finalize(12);

        let bytes = log.to_bytes().unwrap();
        let decoded = CommandLog::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, log);
        assert_eq!(decoded.compute_hash(), log.compute_hash());
    }

    #[test]
    fn test_log_rejects_garbage() {
        assert!(matches!(
            CommandLog::from_bytes(&[1, 2, 3]),
            Err(CommandLogError::Decode(_))
        ));

        let mut log = CommandLog::new(1);
        log.version = 99;
        let bytes = log.to_bytes().unwrap();
        assert!(matches!(
            CommandLog::from_bytes(&bytes),
            Err(CommandLogError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_hash_distinguishes_commands() {
        let mut a = CommandLog::new(1);
        let mut b = CommandLog::new(1);
        a.record(3, InputCommand::SetJumping(true).into());
        b.record(3, InputCommand::SetSliding(true).into());

        assert_ne!(a.compute_hash(), b.compute_hash());
    }
}
