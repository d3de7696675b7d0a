//! Collision Detection
//!
//! Pure, deterministic checks of the character against track entities.
//! Resolution (shield use, run end, pickups) happens in the tick.
//!
//! ## Avoidability
//!
//! ```text
//! ┌─────────────┬──────────┬─────────┬─────────┐
//! │ Kind / Pose │ Grounded │ Jumping │ Sliding │
//! ├─────────────┼──────────┼─────────┼─────────┤
//! │ StaticBlock │   hit    │  clear  │  clear  │
//! │ Spikes      │   hit    │  clear  │   hit   │
//! │ MovingBlock │   hit    │   hit   │   hit   │
//! └─────────────┴──────────┴─────────┴─────────┘
//! ```

use crate::core::fixed::{Fixed, within_window};
use crate::game::character::{Character, Pose};
use crate::game::state::{ObstacleKind, RunState, TrackEntity};

/// Does `pose` clear an obstacle of `kind`?
#[inline]
pub fn pose_clears(pose: Pose, kind: ObstacleKind) -> bool {
    match (kind, pose) {
        (ObstacleKind::StaticBlock, Pose::Jumping | Pose::Sliding) => true,
        (ObstacleKind::Spikes, Pose::Jumping) => true,
        _ => false,
    }
}

/// Is `entity` in the character's lane and inside `window`?
#[inline]
pub fn in_reach<E: TrackEntity>(character: &Character, entity: &E, window: Fixed) -> bool {
    entity.lane() == character.lane && within_window(entity.position(), window)
}

/// Obstacles the character runs into this tick, in track order.
pub fn check_obstacle_hits(state: &RunState, window: Fixed) -> Vec<u32> {
    let character = &state.character;
    state
        .obstacles
        .iter()
        .filter(|o| in_reach(character, *o, window) && !pose_clears(character.pose, o.kind))
        .map(|o| o.id)
        .collect()
}

/// Coins the character picks up this tick. Pose does not matter.
pub fn check_coin_pickups(state: &RunState, window: Fixed) -> Vec<u32> {
    state
        .coins
        .iter()
        .filter(|c| in_reach(&state.character, *c, window))
        .map(|c| c.id)
        .collect()
}

/// Power-ups the character picks up this tick. Pose does not matter.
pub fn check_power_up_pickups(state: &RunState, window: Fixed) -> Vec<u32> {
    state
        .power_ups
        .iter()
        .filter(|p| in_reach(&state.character, *p, window))
        .map(|p| p.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, OBSTACLE_HIT_WINDOW, PICKUP_WINDOW};
    use crate::game::state::{Coin, Lane, PowerUpKind};

    #[test]
    fn test_avoidability_table() {
        use ObstacleKind::*;
        use Pose::*;

        assert!(!pose_clears(Grounded, StaticBlock));
        assert!(pose_clears(Jumping, StaticBlock));
        assert!(pose_clears(Sliding, StaticBlock));

        assert!(!pose_clears(Grounded, Spikes));
        assert!(pose_clears(Jumping, Spikes));
        assert!(!pose_clears(Sliding, Spikes));

        assert!(!pose_clears(Grounded, MovingBlock));
        assert!(!pose_clears(Jumping, MovingBlock));
        assert!(!pose_clears(Sliding, MovingBlock));
    }

    #[test]
    fn test_obstacle_window() {
        let mut state = RunState::new(1, 0);
        state.spawn_obstacle(Lane::CENTER, ObstacleKind::Spikes);

        state.obstacles[0].position = OBSTACLE_HIT_WINDOW + 1;
        assert!(check_obstacle_hits(&state, OBSTACLE_HIT_WINDOW).is_empty());

        state.obstacles[0].position = OBSTACLE_HIT_WINDOW;
        assert_eq!(check_obstacle_hits(&state, OBSTACLE_HIT_WINDOW), vec![0]);

        state.obstacles[0].position = 0;
        assert_eq!(check_obstacle_hits(&state, OBSTACLE_HIT_WINDOW), vec![0]);
    }

    #[test]
    fn test_other_lane_is_safe() {
        let mut state = RunState::new(1, 0);
        state.spawn_obstacle(Lane::LEFT, ObstacleKind::MovingBlock);
        state.obstacles[0].position = to_fixed(10.0);

        assert!(check_obstacle_hits(&state, OBSTACLE_HIT_WINDOW).is_empty());
    }

    #[test]
    fn test_jump_clears_spikes() {
        let mut state = RunState::new(1, 0);
        state.spawn_obstacle(Lane::CENTER, ObstacleKind::Spikes);
        state.obstacles[0].position = to_fixed(10.0);

        state.character.set_jumping(true);
        assert!(check_obstacle_hits(&state, OBSTACLE_HIT_WINDOW).is_empty());

        state.character.set_sliding(true);
        assert_eq!(check_obstacle_hits(&state, OBSTACLE_HIT_WINDOW), vec![0]);
    }

    #[test]
    fn test_pickups_ignore_pose() {
        let mut state = RunState::new(1, 0);
        state.spawn_coin(Lane::CENTER, Coin::VALUE);
        state.spawn_power_up(Lane::CENTER, PowerUpKind::Shield);
        state.spawn_coin(Lane::RIGHT, Coin::VALUE);
        state.coins[0].position = to_fixed(5.0);
        state.power_ups[0].position = PICKUP_WINDOW;
        state.coins[1].position = to_fixed(5.0);

        state.character.set_sliding(true);

        assert_eq!(check_coin_pickups(&state, PICKUP_WINDOW), vec![0]);
        assert_eq!(check_power_up_pickups(&state, PICKUP_WINDOW), vec![1]);
    }
}
