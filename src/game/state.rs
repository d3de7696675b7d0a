//! Game State Definitions
//!
//! Lanes, track entities, the loop-owned `RunState` and the immutable
//! `GameState` snapshot handed to renderers.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, TRACK_LENGTH, fixed_abs, to_float};
use crate::core::rng::DeterministicRng;
use crate::core::hash::{StateHash, compute_state_hash};
use crate::game::character::Character;
use crate::game::effects::{self, ActivePowerUp};
use crate::game::events::GameEvent;
use crate::game::score::ScoreLedger;

// =============================================================================
// LANE
// =============================================================================

/// Rejected lane index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("lane {0} is outside 0..=2")]
pub struct InvalidLane(pub u8);

/// One of the three tracks (0 = left, 1 = center, 2 = right).
///
/// Can only hold a valid lane; deserializing an out-of-range value fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Lane(u8);

impl Lane {
    /// Number of lanes
    pub const COUNT: usize = 3;
    /// Left lane
    pub const LEFT: Lane = Lane(0);
    /// Center lane
    pub const CENTER: Lane = Lane(1);
    /// Right lane
    pub const RIGHT: Lane = Lane(2);
    /// All lanes, left to right
    pub const ALL: [Lane; 3] = [Lane::LEFT, Lane::CENTER, Lane::RIGHT];

    /// Create from index (0-2).
    pub const fn new(index: u8) -> Option<Lane> {
        if (index as usize) < Self::COUNT {
            Some(Lane(index))
        } else {
            None
        }
    }

    /// Lane number (0-2).
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Lane as an array index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Neighbouring lane `delta` steps away, if it exists.
    pub fn shifted(self, delta: i8) -> Option<Lane> {
        let target = self.0 as i16 + delta as i16;
        if target < 0 {
            return None;
        }
        Lane::new(target as u8)
    }
}

impl TryFrom<u8> for Lane {
    type Error = InvalidLane;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Lane::new(value).ok_or(InvalidLane(value))
    }
}

impl From<Lane> for u8 {
    fn from(lane: Lane) -> u8 {
        lane.0
    }
}

// =============================================================================
// TRACK ENTITIES
// =============================================================================

/// Common shape of everything that scrolls toward the character.
pub trait TrackEntity {
    /// Lane the entity occupies
    fn lane(&self) -> Lane;
    /// Distance to the character
    fn position(&self) -> Fixed;
    /// Mutable distance, for the scroll step
    fn position_mut(&mut self) -> &mut Fixed;
}

/// Type of obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObstacleKind {
    /// Mid-height barrier: jump over or slide under
    StaticBlock = 0,
    /// Full-height block that drifts between lanes: dodge sideways
    MovingBlock = 1,
    /// Ground hazard: jump over
    Spikes = 2,
}

impl ObstacleKind {
    /// Get from index.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(ObstacleKind::StaticBlock),
            1 => Some(ObstacleKind::MovingBlock),
            2 => Some(ObstacleKind::Spikes),
            _ => None,
        }
    }
}

/// An obstacle on the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Unique entity ID (monotonic counter per run)
    pub id: u32,
    /// Current lane
    pub lane: Lane,
    /// Distance to the character
    pub position: Fixed,
    /// Type of obstacle
    pub kind: ObstacleKind,
    /// Lane drift direction (-1, 0, +1); only moving blocks drift
    pub drift: i8,
    /// Ticks since spawn
    pub age_ticks: u32,
}

impl Obstacle {
    /// Create a new obstacle.
    pub fn new(id: u32, lane: Lane, position: Fixed, kind: ObstacleKind) -> Self {
        let drift = if kind == ObstacleKind::MovingBlock { 1 } else { 0 };
        Self {
            id,
            lane,
            position,
            kind,
            drift,
            age_ticks: 0,
        }
    }
}

impl TrackEntity for Obstacle {
    fn lane(&self) -> Lane {
        self.lane
    }
    fn position(&self) -> Fixed {
        self.position
    }
    fn position_mut(&mut self) -> &mut Fixed {
        &mut self.position
    }
}

/// A coin on the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Unique entity ID
    pub id: u32,
    /// Current lane
    pub lane: Lane,
    /// Distance to the character
    pub position: Fixed,
    /// Coins awarded on pickup
    pub value: u32,
}

impl Coin {
    /// Regular coin value
    pub const VALUE: u32 = 1;
    /// Gold coin value
    pub const GOLD_VALUE: u32 = 5;

    /// Create a new coin.
    pub fn new(id: u32, lane: Lane, position: Fixed, value: u32) -> Self {
        Self { id, lane, position, value }
    }
}

impl TrackEntity for Coin {
    fn lane(&self) -> Lane {
        self.lane
    }
    fn position(&self) -> Fixed {
        self.position
    }
    fn position_mut(&mut self) -> &mut Fixed {
        &mut self.position
    }
}

/// Type of power-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PowerUpKind {
    /// Pulls nearby coins into the character's lane
    Magnet = 0,
    /// Absorbs the next obstacle hit
    Shield = 1,
    /// Scrolls the track faster
    SpeedBoost = 2,
}

impl PowerUpKind {
    /// All kinds, in index order.
    pub const ALL: [PowerUpKind; 3] = [PowerUpKind::Magnet, PowerUpKind::Shield, PowerUpKind::SpeedBoost];
}

/// An uncollected power-up on the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUp {
    /// Unique entity ID
    pub id: u32,
    /// Current lane
    pub lane: Lane,
    /// Distance to the character
    pub position: Fixed,
    /// Type of power-up
    pub kind: PowerUpKind,
}

impl PowerUp {
    /// Create a new power-up.
    pub fn new(id: u32, lane: Lane, position: Fixed, kind: PowerUpKind) -> Self {
        Self { id, lane, position, kind }
    }
}

impl TrackEntity for PowerUp {
    fn lane(&self) -> Lane {
        self.lane
    }
    fn position(&self) -> Fixed {
        self.position
    }
    fn position_mut(&mut self) -> &mut Fixed {
        &mut self.position
    }
}

// =============================================================================
// RUN PHASE
// =============================================================================

/// Lifecycle of the game loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum RunPhase {
    /// Before the first start, or after a reset
    #[default]
    Idle,
    /// Ticks are advancing
    Running,
    /// Alive, but no ticks fire
    Paused,
    /// Run over (collision or explicit end)
    GameOver,
}

impl RunPhase {
    /// A paused run is still alive.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, RunPhase::Running | RunPhase::Paused)
    }

    /// Is the loop suspended?
    #[inline]
    pub fn is_paused(self) -> bool {
        self == RunPhase::Paused
    }
}

// =============================================================================
// RUN STATE
// =============================================================================

/// Authoritative state of one run, owned by the game loop.
///
/// Each tick mutates a scratch clone; the loop swaps it in once the tick
/// has completed, so no partial tick is ever observable.
#[derive(Clone, Debug)]
pub struct RunState {
    /// Ticks executed this run
    pub tick: u32,

    /// RNG seed (for verification)
    pub rng_seed: u64,

    /// Deterministic RNG state
    pub rng: DeterministicRng,

    /// The runner
    pub character: Character,

    /// Obstacles on the track, in spawn order
    pub obstacles: Vec<Obstacle>,

    /// Coins on the track, in spawn order
    pub coins: Vec<Coin>,

    /// Uncollected power-ups on the track, in spawn order
    pub power_ups: Vec<PowerUp>,

    /// Effects currently applied to the character
    pub active_power_ups: Vec<ActivePowerUp>,

    /// Score, coins and high score
    pub ledger: ScoreLedger,

    /// Difficulty level reached
    pub level: u32,

    /// Scroll speed of the last tick
    pub scroll_speed: Fixed,

    /// False once the run has ended
    pub alive: bool,

    /// Next entity ID (monotonic counter)
    pub next_entity_id: u32,

    /// Tick of the last obstacle row
    pub last_obstacle_tick: u32,

    /// Events generated this tick (cleared each tick)
    pub pending_events: Vec<GameEvent>,
}

impl RunState {
    /// Create a new run.
    pub fn new(rng_seed: u64, high_score: u32) -> Self {
        Self {
            tick: 0,
            rng_seed,
            rng: DeterministicRng::new(rng_seed),
            character: Character::default(),
            obstacles: Vec::new(),
            coins: Vec::new(),
            power_ups: Vec::new(),
            active_power_ups: Vec::new(),
            ledger: ScoreLedger::new(high_score),
            level: 0,
            scroll_speed: 0,
            alive: true,
            next_entity_id: 0,
            last_obstacle_tick: 0,
            pending_events: Vec::new(),
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Spawn an obstacle at the far end of the track.
    pub fn spawn_obstacle(&mut self, lane: Lane, kind: ObstacleKind) -> u32 {
        let id = self.next_id();
        self.obstacles.push(Obstacle::new(id, lane, TRACK_LENGTH, kind));
        id
    }

    /// Spawn a coin at the far end of the track.
    pub fn spawn_coin(&mut self, lane: Lane, value: u32) -> u32 {
        let id = self.next_id();
        self.coins.push(Coin::new(id, lane, TRACK_LENGTH, value));
        id
    }

    /// Spawn a power-up at the far end of the track.
    pub fn spawn_power_up(&mut self, lane: Lane, kind: PowerUpKind) -> u32 {
        let id = self.next_id();
        self.power_ups.push(PowerUp::new(id, lane, TRACK_LENGTH, kind));
        id
    }

    /// Lanes holding an obstacle within `window` of `position`,
    /// ignoring the obstacle `except` (if any).
    pub fn blocked_lanes_near(&self, position: Fixed, window: Fixed, except: Option<u32>) -> [bool; Lane::COUNT] {
        let mut blocked = [false; Lane::COUNT];
        for obstacle in &self.obstacles {
            if Some(obstacle.id) == except {
                continue;
            }
            if fixed_abs(obstacle.position.wrapping_sub(position)) <= window {
                blocked[obstacle.lane.index()] = true;
            }
        }
        blocked
    }

    /// Is an effect of `kind` active?
    #[inline]
    pub fn has_effect(&self, kind: PowerUpKind) -> bool {
        effects::is_active(&self.active_power_ups, kind)
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |hasher| {
            hasher.update_u8(self.character.lane.get());
            hasher.update_u8(self.character.pose as u8);

            for obstacle in &self.obstacles {
                hasher.update_u32(obstacle.id);
                hasher.update_u8(obstacle.lane.get());
                hasher.update_fixed(obstacle.position);
                hasher.update_u8(obstacle.kind as u8);
                hasher.update_u8(obstacle.drift as u8);
                hasher.update_u32(obstacle.age_ticks);
            }

            for coin in &self.coins {
                hasher.update_u32(coin.id);
                hasher.update_u8(coin.lane.get());
                hasher.update_fixed(coin.position);
                hasher.update_u32(coin.value);
            }

            for power_up in &self.power_ups {
                hasher.update_u32(power_up.id);
                hasher.update_u8(power_up.lane.get());
                hasher.update_fixed(power_up.position);
                hasher.update_u8(power_up.kind as u8);
            }

            for effect in &self.active_power_ups {
                hasher.update_u8(effect.kind as u8);
                hasher.update_u32(effect.remaining_ticks.unwrap_or(u32::MAX));
            }

            let [s0, s1] = self.rng.state();
            hasher.update_u64(s0);
            hasher.update_u64(s1);
            hasher.update_u32(self.next_entity_id);
            hasher.update_u32(self.last_obstacle_tick);

            hasher.update_u32(self.ledger.score);
            hasher.update_u32(self.ledger.coins);
            hasher.update_u32(self.ledger.high_score);
            hasher.update_u64(self.ledger.distance);
            hasher.update_u32(self.level);
            hasher.update_fixed(self.scroll_speed);
            hasher.update_bool(self.alive);
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Immutable view of the game published after every commit.
///
/// Shared as `Arc<GameState>`; nothing mutates a snapshot once published.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Loop lifecycle phase
    pub phase: RunPhase,
    /// Alive (running or paused)
    pub is_running: bool,
    /// Suspended
    pub is_paused: bool,
    /// Ticks executed this run
    pub tick: u32,
    /// Points this run
    pub score: u32,
    /// Coins this run
    pub coins: u32,
    /// Best score this session
    pub high_score: u32,
    /// Whole track units travelled this run
    pub distance: u64,
    /// Difficulty level
    pub level: u32,
    /// Scroll speed of the last tick
    pub scroll_speed: Fixed,
    /// Character lane
    pub character_lane: Lane,
    /// Mid-jump
    pub is_jumping: bool,
    /// Mid-slide
    pub is_sliding: bool,
    /// Obstacles on the track
    pub obstacles: Vec<Obstacle>,
    /// Coins on the track
    pub coins_list: Vec<Coin>,
    /// Uncollected power-ups on the track
    pub power_ups: Vec<PowerUp>,
    /// Effects currently applied to the character
    pub active_power_ups: Vec<ActivePowerUp>,
}

impl GameState {
    /// Capture a snapshot of `run` in the given phase.
    pub fn capture(run: &RunState, phase: RunPhase) -> Self {
        Self {
            phase,
            is_running: phase.is_running(),
            is_paused: phase.is_paused(),
            tick: run.tick,
            score: run.ledger.score,
            coins: run.ledger.coins,
            high_score: run.ledger.high_score,
            distance: run.ledger.distance_units(),
            level: run.level,
            scroll_speed: run.scroll_speed,
            character_lane: run.character.lane,
            is_jumping: run.character.is_jumping(),
            is_sliding: run.character.is_sliding(),
            obstacles: run.obstacles.clone(),
            coins_list: run.coins.clone(),
            power_ups: run.power_ups.clone(),
            active_power_ups: run.active_power_ups.clone(),
        }
    }

    /// Is an effect of `kind` active?
    pub fn has_power_up(&self, kind: PowerUpKind) -> bool {
        effects::is_active(&self.active_power_ups, kind)
    }

    /// Scroll speed in track units per tick, for display.
    pub fn scroll_speed_units(&self) -> f32 {
        to_float(self.scroll_speed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
