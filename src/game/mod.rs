//! Game Logic Module
//!
//! All game simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `state`: Lanes, track entities, run state, snapshots
//! - `character`: Lane and pose state machine
//! - `spawner`: Obstacle rows, coins, power-ups
//! - `advance`: Scrolling, moving-block drift, magnet pull, difficulty
//! - `collision`: Hit and pickup checks
//! - `effects`: Power-up activation and countdown
//! - `score`: Score, coins and high score
//! - `input`: Commands, command queue, command log
//! - `tick`: Authoritative simulation step
//! - `session`: Run lifecycle state machine and replay
//! - `events`: Game events for logging and replay comparison

pub mod state;
pub mod character;
pub mod spawner;
pub mod advance;
pub mod collision;
pub mod effects;
pub mod score;
pub mod input;
pub mod tick;
pub mod session;
pub mod events;

// Re-export key types
pub use state::{GameState, Lane, RunPhase, RunState, ObstacleKind, PowerUpKind};
pub use input::{Command, CommandLog, InputCommand};
pub use tick::{RunConfig, TickResult};
pub use session::{RunSession, replay_session};
pub use events::GameEvent;
