//! Game Events
//!
//! Events generated during simulation, for logging and replay comparison.
//! Snapshots stay the only thing collaborators must consume; events are a
//! convenience for HUD effects and diagnostics.

use serde::{Serialize, Deserialize};

use crate::game::state::{Lane, ObstacleKind, PowerUpKind};

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndCause {
    /// Unshielded obstacle hit
    Collision,
    /// Explicit `end_game`
    Ended,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Character ran into an obstacle
    ObstacleHit {
        obstacle_id: u32,
        kind: ObstacleKind,
        lane: Lane,
        /// A shield absorbed the hit
        shielded: bool,
    },

    /// Coin picked up
    CoinCollected {
        coin_id: u32,
        value: u32,
        total_coins: u32,
    },

    /// Power-up picked up
    PowerUpCollected {
        power_up_id: u32,
        kind: PowerUpKind,
        /// An effect of the same kind was already running
        refreshed: bool,
    },

    /// Timed effect ran out
    PowerUpExpired {
        kind: PowerUpKind,
    },

    /// Distance reached a new difficulty level
    LevelUp {
        level: u32,
    },

    /// Run is over
    RunEnded {
        cause: EndCause,
        score: u32,
        coins: u32,
        high_score: u32,
        new_high_score: bool,
    },
}

/// A game event with timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Run tick when the event occurred
    pub tick: u32,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Create obstacle hit event.
    pub fn obstacle_hit(tick: u32, obstacle_id: u32, kind: ObstacleKind, lane: Lane, shielded: bool) -> Self {
        Self::new(
            tick,
            GameEventData::ObstacleHit {
                obstacle_id,
                kind,
                lane,
                shielded,
            },
        )
    }

    /// Create coin collected event.
    pub fn coin_collected(tick: u32, coin_id: u32, value: u32, total_coins: u32) -> Self {
        Self::new(
            tick,
            GameEventData::CoinCollected {
                coin_id,
                value,
                total_coins,
            },
        )
    }

    /// Create power-up collected event.
    pub fn power_up_collected(tick: u32, power_up_id: u32, kind: PowerUpKind, refreshed: bool) -> Self {
        Self::new(
            tick,
            GameEventData::PowerUpCollected {
                power_up_id,
                kind,
                refreshed,
            },
        )
    }

    /// Create power-up expired event.
    pub fn power_up_expired(tick: u32, kind: PowerUpKind) -> Self {
        Self::new(tick, GameEventData::PowerUpExpired { kind })
    }

    /// Create level up event.
    pub fn level_up(tick: u32, level: u32) -> Self {
        Self::new(tick, GameEventData::LevelUp { level })
    }

    /// Create run ended event.
    pub fn run_ended(
        tick: u32,
        cause: EndCause,
        score: u32,
        coins: u32,
        high_score: u32,
        new_high_score: bool,
    ) -> Self {
        Self::new(
            tick,
            GameEventData::RunEnded {
                cause,
                score,
                coins,
                high_score,
                new_high_score,
            },
        )
    }

    /// Is this the terminal event of a run?
    pub fn is_run_end(&self) -> bool {
        matches!(self.data, GameEventData::RunEnded { .. })
    }
}
