//! Entity Advancement
//!
//! Scrolls every track entity toward the character, drifts moving blocks,
//! applies the magnet pull and retires whatever has passed the character.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{
    Fixed, BASE_SCROLL_SPEED, SPEED_STEP, SPEED_BOOST_MULTIPLIER,
    OBSTACLE_HIT_WINDOW, PICKUP_WINDOW, MAGNET_RADIUS, DRIFT_FREEZE_DISTANCE,
    LEVEL_DISTANCE, fixed_mul, within_window,
};
use crate::game::state::{Lane, ObstacleKind, PowerUpKind, RunState, TrackEntity};

/// Track tuning: speeds, difficulty and distances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Scroll speed at level 0 (units per tick)
    pub base_scroll_speed: Fixed,
    /// Scroll speed gained per level
    pub speed_step: Fixed,
    /// Multiplier while SpeedBoost is active
    pub speed_boost_multiplier: Fixed,
    /// Distance between difficulty levels
    pub level_distance: Fixed,
    /// Highest difficulty level
    pub max_level: u32,
    /// Ticks between lane shifts of a moving block
    pub moving_block_period: u32,
    /// Moving blocks closer than this stop drifting
    pub drift_freeze_distance: Fixed,
    /// Magnet pull radius
    pub magnet_radius: Fixed,
    /// Obstacles hit when `0 <= position <= obstacle_hit_window`
    pub obstacle_hit_window: Fixed,
    /// Coins and power-ups picked up when `0 <= position <= pickup_window`
    pub pickup_window: Fixed,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            base_scroll_speed: BASE_SCROLL_SPEED,
            speed_step: SPEED_STEP,
            speed_boost_multiplier: SPEED_BOOST_MULTIPLIER,
            level_distance: LEVEL_DISTANCE,
            max_level: 10,
            moving_block_period: 40,
            drift_freeze_distance: DRIFT_FREEZE_DISTANCE,
            magnet_radius: MAGNET_RADIUS,
            obstacle_hit_window: OBSTACLE_HIT_WINDOW,
            pickup_window: PICKUP_WINDOW,
        }
    }
}

/// Scroll speed for a level, with or without the speed boost.
pub fn scroll_speed(level: u32, boosted: bool, config: &TrackConfig) -> Fixed {
    let level = level.min(i32::MAX as u32) as i32;
    let speed = config
        .base_scroll_speed
        .saturating_add(level.saturating_mul(config.speed_step));

    if boosted {
        fixed_mul(speed, config.speed_boost_multiplier)
    } else {
        speed
    }
}

/// Advance all entities by one tick.
///
/// `open_lane_window` is the distance within which obstacles count as one
/// row; drifting never closes the last open lane inside it.
///
/// Returns the distance scrolled.
pub fn advance_entities(state: &mut RunState, config: &TrackConfig, open_lane_window: Fixed) -> Fixed {
    let speed = scroll_speed(state.level, state.has_effect(PowerUpKind::SpeedBoost), config);
    state.scroll_speed = speed;

    for obstacle in state.obstacles.iter_mut() {
        scroll(obstacle, speed);
        obstacle.age_ticks = obstacle.age_ticks.saturating_add(1);
    }
    for coin in state.coins.iter_mut() {
        scroll(coin, speed);
    }
    for power_up in state.power_ups.iter_mut() {
        scroll(power_up, speed);
    }

    drift_moving_blocks(state, config, open_lane_window);

    if state.has_effect(PowerUpKind::Magnet) {
        apply_magnet(state, config);
    }

    // Passed the character without contact
    state.obstacles.retain(|o| o.position >= 0);
    state.coins.retain(|c| c.position >= 0);
    state.power_ups.retain(|p| p.position >= 0);

    speed
}

fn scroll<E: TrackEntity>(entity: &mut E, speed: Fixed) {
    let position = entity.position_mut();
    *position = position.saturating_sub(speed);
}

/// Shift due moving blocks one lane along their drift direction.
fn drift_moving_blocks(state: &mut RunState, config: &TrackConfig, window: Fixed) {
    if config.moving_block_period == 0 {
        return;
    }

    for idx in 0..state.obstacles.len() {
        let obstacle = state.obstacles[idx];
        if obstacle.kind != ObstacleKind::MovingBlock
            || obstacle.drift == 0
            || obstacle.age_ticks % config.moving_block_period != 0
            || obstacle.position <= config.drift_freeze_distance
        {
            continue;
        }

        if let Some((lane, drift)) = drift_target(state, idx, window) {
            let obstacle = &mut state.obstacles[idx];
            obstacle.lane = lane;
            obstacle.drift = drift;
        }
    }
}

/// Next lane for a moving block: forward, else bounce back, else stay put.
fn drift_target(state: &RunState, idx: usize, window: Fixed) -> Option<(Lane, i8)> {
    let obstacle = &state.obstacles[idx];
    let blocked = state.blocked_lanes_near(obstacle.position, window, Some(obstacle.id));

    for drift in [obstacle.drift, -obstacle.drift] {
        let Some(target) = obstacle.lane.shifted(drift) else {
            continue;
        };
        let mut after = blocked;
        after[target.index()] = true;
        if after.contains(&false) {
            return Some((target, drift));
        }
    }
    None
}

/// Pull coins within the magnet radius into the character's lane.
fn apply_magnet(state: &mut RunState, config: &TrackConfig) {
    let lane = state.character.lane;
    for coin in state.coins.iter_mut() {
        if within_window(coin.position, config.magnet_radius) {
            coin.lane = lane;
        }
    }
}

/// Difficulty level for the distance travelled so far.
pub fn level_for_distance(distance: u64, config: &TrackConfig) -> u32 {
    if config.level_distance <= 0 {
        return 0;
    }
    let level = distance / config.level_distance as u64;
    level.min(config.max_level as u64) as u32
}

/// Raise the level to match the ledger's distance.
///
/// Returns the new level when it changed.
pub fn update_level(state: &mut RunState, config: &TrackConfig) -> Option<u32> {
    let level = level_for_distance(state.ledger.distance, config);
    if level > state.level {
        state.level = level;
        Some(level)
    } else {
        None
    }
}
