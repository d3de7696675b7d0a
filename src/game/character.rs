//! Character State Machine
//!
//! Lane position and the transient vertical pose. Transitions only happen
//! through external commands; the engine owns no pose timers. The
//! collaborator that sets a jump or slide is also the one that clears it.

use serde::{Serialize, Deserialize};

use crate::game::state::Lane;

/// Vertical pose of the character.
///
/// The pose selects the hitbox the collision resolver checks obstacles against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum Pose {
    /// Running on the ground
    #[default]
    Grounded = 0,
    /// In the air, clears ground hazards
    Jumping = 1,
    /// Ducking under, clears mid-height barriers
    Sliding = 2,
}

/// The runner: which lane it occupies and how it is posed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Current lane
    pub lane: Lane,
    /// Current pose (jumping and sliding are exclusive by construction)
    pub pose: Pose,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            lane: Lane::CENTER,
            pose: Pose::Grounded,
        }
    }
}

impl Character {
    /// Move to `target`.
    ///
    /// Returns false (and changes nothing) when the target is not a lane or
    /// is the lane the character already occupies.
    pub fn move_lane(&mut self, target: u8) -> bool {
        match Lane::new(target) {
            Some(lane) if lane != self.lane => {
                self.lane = lane;
                true
            }
            _ => false,
        }
    }

    /// Start or stop a jump. Starting a jump ends a slide.
    pub fn set_jumping(&mut self, jumping: bool) -> bool {
        self.set_pose(Pose::Jumping, jumping)
    }

    /// Start or stop a slide. Starting a slide ends a jump.
    pub fn set_sliding(&mut self, sliding: bool) -> bool {
        self.set_pose(Pose::Sliding, sliding)
    }

    fn set_pose(&mut self, pose: Pose, active: bool) -> bool {
        match (active, self.pose == pose) {
            // Already in that pose / not in the pose being cleared
            (true, true) | (false, false) => false,
            (true, false) => {
                self.pose = pose;
                true
            }
            (false, true) => {
                self.pose = Pose::Grounded;
                true
            }
        }
    }

    /// Is the character mid-jump?
    #[inline]
    pub fn is_jumping(&self) -> bool {
        self.pose == Pose::Jumping
    }

    /// Is the character mid-slide?
    #[inline]
    pub fn is_sliding(&self) -> bool {
        self.pose == Pose::Sliding
    }
}
