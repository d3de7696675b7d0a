//! Track Spawning
//!
//! Deterministic spawning of obstacle rows, coins and power-ups at the far
//! end of the track. Every choice goes through the run's RNG, so the same
//! seed always produces the same track.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, OBSTACLE_HIT_WINDOW, TRACK_LENGTH};
use crate::core::rng::DeterministicRng;
use crate::game::state::{Coin, Lane, ObstacleKind, PowerUpKind, RunState};

/// Configuration for track spawning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Ticks between obstacle rows at level 0
    pub obstacle_interval: u32,
    /// Floor for the obstacle interval at high levels
    pub min_obstacle_interval: u32,
    /// Interval reduction per difficulty level
    pub obstacle_interval_step: u32,
    /// Most obstacles in one row (1 or 2)
    pub max_row_obstacles: u8,
    /// Ticks between coins
    pub coin_interval: u32,
    /// Chance (percent) that a coin is gold
    pub gold_coin_percent: u32,
    /// Ticks between power-ups
    pub power_up_interval: u32,
    /// Obstacles closer than this share a row
    pub row_window: Fixed,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            obstacle_interval: 120,     // Every 2 seconds
            min_obstacle_interval: 45,
            obstacle_interval_step: 8,
            max_row_obstacles: 2,
            coin_interval: 60,          // Every second
            gold_coin_percent: 10,
            power_up_interval: 600,     // Every 10 seconds
            row_window: OBSTACLE_HIT_WINDOW,
        }
    }
}

impl SpawnConfig {
    /// Obstacle interval at a difficulty level.
    pub fn obstacle_interval_at(&self, level: u32) -> u32 {
        let reduction = level.saturating_mul(self.obstacle_interval_step);
        self.obstacle_interval
            .saturating_sub(reduction)
            .max(self.min_obstacle_interval)
    }
}

/// Spawn whatever is due this tick: an obstacle row, then a coin, then a power-up.
pub fn maybe_spawn(state: &mut RunState, config: &SpawnConfig) {
    let tick = state.tick;

    let interval = config.obstacle_interval_at(state.level);
    if tick.saturating_sub(state.last_obstacle_tick) >= interval {
        spawn_obstacle_row(state, config);
        state.last_obstacle_tick = tick;
    }

    if config.coin_interval > 0 && tick % config.coin_interval == 0 {
        spawn_coin(state, config);
    }

    if config.power_up_interval > 0 && tick % config.power_up_interval == 0 {
        spawn_power_up(state, config);
    }
}

/// Spawn one obstacle row. Returns how many obstacles were placed.
pub fn spawn_obstacle_row(state: &mut RunState, config: &SpawnConfig) -> usize {
    let mut row = roll_row(&mut state.rng, config.max_row_obstacles);

    let blocked = state.blocked_lanes_near(TRACK_LENGTH, config.row_window.saturating_mul(2), None);
    enforce_open_lane(blocked, &mut row);

    for &(lane, kind) in &row {
        state.spawn_obstacle(lane, kind);
    }
    row.len()
}

/// Roll the contents of a row: distinct lanes, weighted kinds.
///
/// A row with a moving block holds only that block.
fn roll_row(rng: &mut DeterministicRng, max_row_obstacles: u8) -> Vec<(Lane, ObstacleKind)> {
    let mut lanes = Lane::ALL;
    rng.shuffle(&mut lanes);

    let first = random_obstacle_kind(rng);
    if first == ObstacleKind::MovingBlock {
        return vec![(lanes[0], first)];
    }

    let max = (max_row_obstacles as usize).clamp(1, Lane::COUNT - 1);
    let count = 1 + rng.next_int(max as u32) as usize;

    let mut row = Vec::with_capacity(count);
    row.push((lanes[0], first));
    for &lane in lanes.iter().take(count).skip(1) {
        row.push((lane, random_fixed_kind(rng)));
    }
    row
}

/// Weighted obstacle kind: StaticBlock 50%, Spikes 30%, MovingBlock 20%.
fn random_obstacle_kind(rng: &mut DeterministicRng) -> ObstacleKind {
    let roll = rng.next_int(100);

    if roll < 50 {
        ObstacleKind::StaticBlock
    } else if roll < 80 {
        ObstacleKind::Spikes
    } else {
        ObstacleKind::MovingBlock
    }
}

/// Same weights without the moving block.
fn random_fixed_kind(rng: &mut DeterministicRng) -> ObstacleKind {
    if rng.next_int(80) < 50 {
        ObstacleKind::StaticBlock
    } else {
        ObstacleKind::Spikes
    }
}

/// Drop row entries that would close the last open lane.
///
/// `blocked` marks lanes already holding an obstacle near the spawn point.
/// Returns the number of dropped entries.
pub fn enforce_open_lane(mut blocked: [bool; Lane::COUNT], row: &mut Vec<(Lane, ObstacleKind)>) -> usize {
    let before = row.len();
    row.retain(|&(lane, _)| {
        if blocked[lane.index()] {
            return true;
        }
        let open = blocked.iter().filter(|b| !**b).count();
        if open <= 1 {
            return false;
        }
        blocked[lane.index()] = true;
        true
    });
    before - row.len()
}

/// Lanes free of obstacles at the spawn point.
fn open_lanes(state: &RunState, config: &SpawnConfig) -> Vec<Lane> {
    let blocked = state.blocked_lanes_near(TRACK_LENGTH, config.row_window, None);
    Lane::ALL
        .into_iter()
        .filter(|lane| !blocked[lane.index()])
        .collect()
}

/// Spawn a coin in an open lane.
fn spawn_coin(state: &mut RunState, config: &SpawnConfig) -> Option<u32> {
    let lanes = open_lanes(state, config);
    let lane = *state.rng.choose(&lanes)?;

    let value = if state.rng.chance(config.gold_coin_percent) {
        Coin::GOLD_VALUE
    } else {
        Coin::VALUE
    };

    Some(state.spawn_coin(lane, value))
}

/// Spawn a uniformly chosen power-up in an open lane.
fn spawn_power_up(state: &mut RunState, config: &SpawnConfig) -> Option<u32> {
    let lanes = open_lanes(state, config);
    let lane = *state.rng.choose(&lanes)?;
    let kind = *state.rng.choose(&PowerUpKind::ALL)?;

    Some(state.spawn_power_up(lane, kind))
}
