//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for the track simulation.
//! Entity positions, scroll speeds and windows are all `Fixed`; floats only
//! appear when converting for display.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The track is 1000 units long, so every position fits comfortably.
//! Cumulative distance does not: the ledger keeps it in a `u64` of raw units.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

// =============================================================================
// TRACK CONSTANTS (All as integer literals - NO float conversion!)
// =============================================================================

/// Spawn distance: 1000.0 = 1000 * 65536
pub const TRACK_LENGTH: Fixed = 65_536_000;

/// Base scroll speed: 2.0 units per tick
pub const BASE_SCROLL_SPEED: Fixed = 131_072;

/// Scroll speed gained per difficulty level: 0.25 units per tick
pub const SPEED_STEP: Fixed = 16_384;

/// Speed boost multiplier: 1.5x
pub const SPEED_BOOST_MULTIPLIER: Fixed = 98_304;

/// Obstacle collision window: 50.0 units in front of the character
pub const OBSTACLE_HIT_WINDOW: Fixed = 3_276_800;

/// Coin / power-up pickup window: 30.0 units
pub const PICKUP_WINDOW: Fixed = 1_966_080;

/// Magnet pull radius: 200.0 units
pub const MAGNET_RADIUS: Fixed = 13_107_200;

/// Moving blocks stop drifting inside 150.0 units
pub const DRIFT_FREEZE_DISTANCE: Fixed = 9_830_400;

/// Distance per difficulty level: 2000.0 units
pub const LEVEL_DISTANCE: Fixed = 131_072_000;

/// Distance worth one point of score: 10.0 units
pub const SCORE_DISTANCE: Fixed = 655_360;

// =============================================================================
// CORE OPERATIONS (All deterministic)
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time or initialization. NEVER in tick loop.
///
/// # Example
/// ```
/// use lane_runner::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float for display/rendering.
///
/// # Warning
/// Only use for visual output. NEVER use result in game logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Check whether `value` lies in the closed range `[0, window]`.
#[inline]
pub fn within_window(value: Fixed, window: Fixed) -> bool {
    value >= 0 && value <= window
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(FIXED_SCALE, 16);
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(1.0), FIXED_ONE);
        assert_eq!(to_fixed(0.5), FIXED_HALF);
        assert_eq!(to_fixed(-1.0), -FIXED_ONE);
    }

    #[test]
    fn test_fixed_mul() {
        assert_eq!(fixed_mul(to_fixed(2.0), to_fixed(3.0)), to_fixed(6.0));
        assert_eq!(fixed_mul(FIXED_HALF, FIXED_HALF), to_fixed(0.25));
        assert_eq!(fixed_mul(to_fixed(-2.0), to_fixed(3.0)), to_fixed(-6.0));
    }

    #[test]
    fn test_track_constants() {
        assert_eq!(TRACK_LENGTH, 1000 * FIXED_ONE);
        assert_eq!(BASE_SCROLL_SPEED, to_fixed(2.0));
        assert_eq!(SPEED_STEP, to_fixed(0.25));
        assert_eq!(SPEED_BOOST_MULTIPLIER, to_fixed(1.5));
        assert_eq!(OBSTACLE_HIT_WINDOW, to_fixed(50.0));
        assert_eq!(PICKUP_WINDOW, to_fixed(30.0));
        assert_eq!(MAGNET_RADIUS, to_fixed(200.0));
        assert_eq!(DRIFT_FREEZE_DISTANCE, to_fixed(150.0));
        assert_eq!(LEVEL_DISTANCE, to_fixed(2000.0));
        assert_eq!(SCORE_DISTANCE, to_fixed(10.0));
    }

    #[test]
    fn test_boosted_speed() {
        assert_eq!(fixed_mul(BASE_SCROLL_SPEED, SPEED_BOOST_MULTIPLIER), to_fixed(3.0));
    }

    #[test]
    fn test_within_window() {
        assert!(within_window(0, PICKUP_WINDOW));
        assert!(within_window(PICKUP_WINDOW, PICKUP_WINDOW));
        assert!(!within_window(PICKUP_WINDOW + 1, PICKUP_WINDOW));
        assert!(!within_window(-1, PICKUP_WINDOW));
    }

    #[test]
    fn test_abs_and_float() {
        assert_eq!(fixed_abs(to_fixed(-3.0)), to_fixed(3.0));
        assert!((to_float(to_fixed(1.5)) - 1.5).abs() < f32::EPSILON);
    }
}
