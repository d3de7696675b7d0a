//! Score and Economy Ledger
//!
//! Score follows distance travelled; coins are a separate purse.
//! The high score survives across runs of a session.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE, SCORE_DISTANCE};

/// Running totals for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLedger {
    /// Points earned this run
    pub score: u32,
    /// Coins collected this run
    pub coins: u32,
    /// Best score of the session
    pub high_score: u32,
    /// Distance travelled this run, in raw fixed-point units
    pub distance: u64,
}

impl ScoreLedger {
    /// Fresh ledger carrying the session's best score.
    pub fn new(high_score: u32) -> Self {
        Self {
            high_score,
            ..Self::default()
        }
    }

    /// Credit distance scrolled this tick and recompute the score.
    pub fn record_distance(&mut self, moved: Fixed) {
        if moved <= 0 {
            return;
        }
        self.distance = self.distance.saturating_add(moved as u64);
        let points = self.distance / SCORE_DISTANCE as u64;
        self.score = points.min(u32::MAX as u64) as u32;
    }

    /// Add a collected coin. Returns the new purse.
    pub fn add_coins(&mut self, value: u32) -> u32 {
        self.coins = self.coins.saturating_add(value);
        self.coins
    }

    /// Fold this run's score into the high score.
    ///
    /// Returns true when the run set a new record.
    pub fn settle_high_score(&mut self) -> bool {
        if self.score > self.high_score {
            self.high_score = self.score;
            true
        } else {
            false
        }
    }

    /// Whole track units travelled.
    pub fn distance_units(&self) -> u64 {
        self.distance / FIXED_ONE as u64
    }
}
