//! Authoritative Simulation Tick
//!
//! One discrete step of a run. Must be 100% deterministic: the same state,
//! inputs and config always produce the same next state.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::fixed::Fixed;
use crate::game::advance::{advance_entities, scroll_speed, update_level, TrackConfig};
use crate::game::collision::{check_coin_pickups, check_obstacle_hits, check_power_up_pickups};
use crate::game::effects::{self, EffectConfig};
use crate::game::events::{EndCause, GameEvent};
use crate::game::input::InputCommand;
use crate::game::spawner::{maybe_spawn, SpawnConfig};
use crate::game::state::RunState;

/// Invalid tuning values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An interval or period of zero ticks
    #[error("{0} must be at least one tick")]
    ZeroInterval(&'static str),

    /// A speed, distance or window that must be positive
    #[error("{0} must be positive")]
    NonPositive(&'static str),

    /// Row size outside 1..=2
    #[error("max_row_obstacles must be 1 or 2, got {0}")]
    RowSize(u8),

    /// Percentage above 100
    #[error("{0} must be a percentage (0-100)")]
    Percent(&'static str),

    /// Rows narrower than the obstacle hit window
    #[error("row_window must cover obstacle_hit_window")]
    RowWindow,

    /// Top scroll speed could jump an entity over a collision window
    #[error("top scroll speed {speed} exceeds the narrowest collision window {window}")]
    SpeedExceedsWindow {
        /// Fastest per-tick scroll (fixed-point)
        speed: Fixed,
        /// Narrower of the hit and pickup windows (fixed-point)
        window: Fixed,
    },
}

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the run is over after this tick
    pub game_over: bool,
}

/// Configuration for run simulation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Speeds, difficulty and collision windows
    pub track: TrackConfig,
    /// Spawn cadence and row rules
    pub spawn: SpawnConfig,
    /// Power-up durations
    pub effects: EffectConfig,
}

impl RunConfig {
    /// Check the tuning values before a session uses them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let spawn = &self.spawn;
        let track = &self.track;

        for (name, value) in [
            ("obstacle_interval", spawn.obstacle_interval),
            ("min_obstacle_interval", spawn.min_obstacle_interval),
            ("coin_interval", spawn.coin_interval),
            ("power_up_interval", spawn.power_up_interval),
            ("moving_block_period", track.moving_block_period),
            ("magnet_ticks", self.effects.magnet_ticks),
            ("speed_boost_ticks", self.effects.speed_boost_ticks),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroInterval(name));
            }
        }

        for (name, value) in [
            ("base_scroll_speed", track.base_scroll_speed),
            ("speed_boost_multiplier", track.speed_boost_multiplier),
            ("level_distance", track.level_distance),
            ("obstacle_hit_window", track.obstacle_hit_window),
            ("pickup_window", track.pickup_window),
            ("row_window", spawn.row_window),
        ] {
            if value <= 0 {
                return Err(ConfigError::NonPositive(name));
            }
        }

        if track.speed_step < 0 {
            return Err(ConfigError::NonPositive("speed_step"));
        }

        if !(1..=2).contains(&spawn.max_row_obstacles) {
            return Err(ConfigError::RowSize(spawn.max_row_obstacles));
        }

        if spawn.gold_coin_percent > 100 {
            return Err(ConfigError::Percent("gold_coin_percent"));
        }

        if spawn.row_window < track.obstacle_hit_window {
            return Err(ConfigError::RowWindow);
        }

        // Every entity must land inside each window for at least one tick
        let window = track.obstacle_hit_window.min(track.pickup_window);
        let plain = scroll_speed(track.max_level, false, track);
        let boosted = scroll_speed(track.max_level, true, track);
        if boosted <= 0 {
            return Err(ConfigError::NonPositive("boosted scroll speed"));
        }
        let speed = plain.max(boosted);
        if speed > window {
            return Err(ConfigError::SpeedExceedsWindow { speed, window });
        }

        Ok(())
    }

    /// Window within which obstacles may never block all three lanes.
    #[inline]
    pub fn open_lane_window(&self) -> Fixed {
        self.spawn.row_window.saturating_mul(2)
    }
}

/// Run one simulation tick.
///
/// # Arguments
///
/// * `state` - The run state (will be mutated)
/// * `inputs` - Gameplay commands drained for this tick, oldest first
/// * `config` - Run configuration
///
/// # Order
///
/// Input → Spawn → Advance → Collide → Effects → Score.
/// A crash ends the tick after the collision step.
pub fn tick(state: &mut RunState, inputs: &[InputCommand], config: &RunConfig) -> TickResult {
    let mut result = TickResult::default();

    if !state.alive {
        result.game_over = true;
        return result;
    }

    // 0. Advance tick counter
    state.tick += 1;

    // 1. Apply queued commands
    apply_inputs(state, inputs);

    // 2. Spawn new entities at the far end
    maybe_spawn(state, &config.spawn);

    // 3. Scroll, drift, magnet pull
    let moved = advance_entities(state, &config.track, config.open_lane_window());

    // 4. Resolve collisions
    if process_obstacle_hits(state, config) {
        result.game_over = true;
        result.events = state.take_events();
        return result;
    }
    process_coin_pickups(state, config);
    process_power_up_pickups(state, config);

    // 5. Count down effects
    process_effects(state);

    // 6. Distance, score and difficulty
    process_score(state, config, moved);

    result.events = state.take_events();
    result
}

/// Apply gameplay commands in submission order.
fn apply_inputs(state: &mut RunState, inputs: &[InputCommand]) {
    let character = &mut state.character;

    for command in inputs {
        match *command {
            InputCommand::MoveLane(lane) => character.move_lane(lane),
            InputCommand::SetJumping(on) => character.set_jumping(on),
            InputCommand::SetSliding(on) => character.set_sliding(on),
        };
    }
}

/// Resolve obstacle hits. Returns true when the run ended.
fn process_obstacle_hits(state: &mut RunState, config: &RunConfig) -> bool {
    let hits = check_obstacle_hits(state, config.track.obstacle_hit_window);

    for obstacle_id in hits {
        let Some(idx) = state.obstacles.iter().position(|o| o.id == obstacle_id) else {
            continue;
        };
        let obstacle = state.obstacles[idx];

        if effects::consume_shield(&mut state.active_power_ups) {
            state.obstacles.remove(idx);
            let event = GameEvent::obstacle_hit(state.tick, obstacle.id, obstacle.kind, obstacle.lane, true);
            state.push_event(event);
            continue;
        }

        let event = GameEvent::obstacle_hit(state.tick, obstacle.id, obstacle.kind, obstacle.lane, false);
        state.push_event(event);
        end_run(state, EndCause::Collision);
        return true;
    }

    false
}

/// Collect coins in reach.
fn process_coin_pickups(state: &mut RunState, config: &RunConfig) {
    let pickups = check_coin_pickups(state, config.track.pickup_window);

    for coin_id in pickups {
        let Some(idx) = state.coins.iter().position(|c| c.id == coin_id) else {
            continue;
        };
        let coin = state.coins.remove(idx);
        let total = state.ledger.add_coins(coin.value);
        state.push_event(GameEvent::coin_collected(state.tick, coin.id, coin.value, total));
    }
}

/// Collect power-ups in reach and activate them.
fn process_power_up_pickups(state: &mut RunState, config: &RunConfig) {
    let pickups = check_power_up_pickups(state, config.track.pickup_window);

    for power_up_id in pickups {
        let Some(idx) = state.power_ups.iter().position(|p| p.id == power_up_id) else {
            continue;
        };
        let power_up = state.power_ups.remove(idx);
        let refreshed = effects::activate(&mut state.active_power_ups, power_up.kind, &config.effects);
        state.push_event(GameEvent::power_up_collected(state.tick, power_up.id, power_up.kind, refreshed));
    }
}

/// Count down timed effects.
fn process_effects(state: &mut RunState) {
    for kind in effects::tick_effects(&mut state.active_power_ups) {
        state.push_event(GameEvent::power_up_expired(state.tick, kind));
    }
}

/// Credit distance and raise the difficulty level.
fn process_score(state: &mut RunState, config: &RunConfig, moved: Fixed) {
    state.ledger.record_distance(moved);

    if let Some(level) = update_level(state, &config.track) {
        state.push_event(GameEvent::level_up(state.tick, level));
    }
}

/// End the run and fold its score into the high score.
///
/// Does nothing if the run already ended.
pub fn end_run(state: &mut RunState, cause: EndCause) {
    if !state.alive {
        return;
    }
    state.alive = false;

    let new_high_score = state.ledger.settle_high_score();
    let ledger = state.ledger;
    state.push_event(GameEvent::run_ended(
        state.tick,
        cause,
        ledger.score,
        ledger.coins,
        ledger.high_score,
        new_high_score,
    ));
}
