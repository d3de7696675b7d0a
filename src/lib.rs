//! # Lane Runner Engine
//!
//! Deterministic, tick-driven simulation core for a three-lane endless runner.
//! Rendering, input mapping and high-score persistence live with the caller;
//! the engine takes commands and publishes immutable `GameState` snapshots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LANE RUNNER ENGINE                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── state.rs    - Lanes, entities, run state, snapshots     │
//! │  ├── character.rs- Lane and pose state machine               │
//! │  ├── spawner.rs  - Obstacle rows, coins, power-ups           │
//! │  ├── advance.rs  - Scrolling, drift, magnet, difficulty      │
//! │  ├── collision.rs- Hit and pickup checks                     │
//! │  ├── effects.rs  - Power-up durations                        │
//! │  ├── score.rs    - Score and coin ledger                     │
//! │  ├── input.rs    - Commands, queue, command log              │
//! │  ├── tick.rs     - Authoritative simulation step             │
//! │  └── session.rs  - Run lifecycle and replay                  │
//! │                                                              │
//! │  runtime/        - Real-time driver (non-deterministic)      │
//! │  └── driver.rs   - tokio tick loop, commands, snapshots      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tick Order
//!
//! Input → Spawn → Advance → Collide → Effects → Score → Commit
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given the same session seed and command log, a replayed session
//! reaches the **identical state hash** on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod runtime;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::rng::DeterministicRng;
pub use game::input::{Command, CommandLog, InputCommand};
pub use game::session::{replay_session, RunSession};
pub use game::state::{GameState, Lane, RunPhase};
pub use game::tick::RunConfig;
pub use runtime::{CommandSender, Engine, EngineConfig, EngineError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
