//! Runtime Module
//!
//! Drives a session in real time on tokio. Everything non-deterministic
//! (wall clock, channels, callbacks) lives here, outside `game/`.

pub mod driver;

pub use driver::{CommandSender, Engine, EngineConfig, EngineError, UpdateListener};
