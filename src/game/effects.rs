//! Power-Up Effect Tracker
//!
//! Activation, countdown and expiry of collected power-ups.
//! Kinds stack with each other; a repeat pickup refreshes instead of duplicating.

use serde::{Serialize, Deserialize};

use crate::game::state::PowerUpKind;

/// Durations for timed power-ups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// Magnet duration in ticks
    pub magnet_ticks: u32,
    /// Speed boost duration in ticks
    pub speed_boost_ticks: u32,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            magnet_ticks: 300,      // 5 seconds
            speed_boost_ticks: 300, // 5 seconds
        }
    }
}

impl EffectConfig {
    /// Duration for a kind; `None` means "until consumed".
    pub fn duration(&self, kind: PowerUpKind) -> Option<u32> {
        match kind {
            PowerUpKind::Magnet => Some(self.magnet_ticks),
            PowerUpKind::SpeedBoost => Some(self.speed_boost_ticks),
            PowerUpKind::Shield => None,
        }
    }
}

/// A power-up currently affecting the character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePowerUp {
    /// Which power-up
    pub kind: PowerUpKind,
    /// Ticks left; `None` for effects without a countdown (shield)
    pub remaining_ticks: Option<u32>,
}

impl ActivePowerUp {
    /// Fresh effect with its configured duration.
    pub fn new(kind: PowerUpKind, config: &EffectConfig) -> Self {
        Self {
            kind,
            remaining_ticks: config.duration(kind),
        }
    }

    /// Has the countdown run out?
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.remaining_ticks == Some(0)
    }
}

/// Activate `kind`, or refresh it if already active.
///
/// Returns true when an existing effect was refreshed.
pub fn activate(active: &mut Vec<ActivePowerUp>, kind: PowerUpKind, config: &EffectConfig) -> bool {
    if let Some(existing) = active.iter_mut().find(|e| e.kind == kind) {
        existing.remaining_ticks = config.duration(kind);
        return true;
    }
    active.push(ActivePowerUp::new(kind, config));
    false
}

/// Is an effect of `kind` active?
#[inline]
pub fn is_active(active: &[ActivePowerUp], kind: PowerUpKind) -> bool {
    active.iter().any(|e| e.kind == kind)
}

/// Use up the shield, if there is one.
pub fn consume_shield(active: &mut Vec<ActivePowerUp>) -> bool {
    match active.iter().position(|e| e.kind == PowerUpKind::Shield) {
        Some(idx) => {
            active.remove(idx);
            true
        }
        None => false,
    }
}

/// Count down timed effects and drop the ones that ran out.
///
/// Returns the kinds that expired this tick, in activation order.
pub fn tick_effects(active: &mut Vec<ActivePowerUp>) -> Vec<PowerUpKind> {
    for effect in active.iter_mut() {
        if let Some(ticks) = effect.remaining_ticks.as_mut() {
            *ticks = ticks.saturating_sub(1);
        }
    }

    let mut expired = Vec::new();
    active.retain(|effect| {
        if effect.is_expired() {
            expired.push(effect.kind);
            false
        } else {
            true
        }
    });
    expired
}
