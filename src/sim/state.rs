//! Game state and core simulation types

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::spatial::BoundedRegion;
use crate::consts::*;
use crate::lane_center_x;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Run ended (crash or quit)
    GameOver,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Last life lost
    Crashed,
    /// Player quit mid-run
    Quit,
}

/// Things that happened during a tick, for the caller to react to
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Enemy contact cost a life
    Crash { lives_left: u8 },
    /// Enemy contact absorbed by a shield
    ShieldAbsorbed,
    PowerUpCollected(PowerUpKind),
    LevelUp(u32),
    GameOver { score: u64, reason: EndReason },
}

/// An entity handle stored in the spatial index
///
/// Indices point into `GameState::enemies` / `GameState::powerups` and are
/// only valid for the tick the index was built in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Enemy(usize),
    PowerUp(usize),
}

/// The player's car
#[derive(Debug, Clone)]
pub struct Player {
    pub lane: usize,
    pub pos: Vec2,
    /// X position the car is easing toward
    pub target_x: f32,
}

impl Default for Player {
    fn default() -> Self {
        let x = lane_center_x(START_LANE);
        Self {
            lane: START_LANE,
            pos: Vec2::new(x, PLAYER_Y),
            target_x: x,
        }
    }
}

impl Player {
    /// Move one lane left (`-1`) or right (`+1`), clamped to the road
    pub fn change_lane(&mut self, delta: i32) {
        let lane = (self.lane as i32 + delta).clamp(0, NUM_LANES as i32 - 1) as usize;
        if lane != self.lane {
            self.lane = lane;
            self.target_x = lane_center_x(lane);
        }
    }

    /// Ease toward the target lane
    pub fn update(&mut self) {
        self.pos.x += (self.target_x - self.pos.x) * PLAYER_STEER_SMOOTHING;
    }

    pub fn bounds(&self) -> BoundedRegion {
        BoundedRegion::centered(self.pos, Vec2::new(CAR_WIDTH, CAR_HEIGHT))
    }
}

/// Oncoming traffic
#[derive(Debug, Clone)]
pub struct Car {
    pub id: u32,
    pub lane: usize,
    pub pos: Vec2,
    /// Pixels per tick, downward
    pub speed: f32,
}

impl Car {
    pub fn bounds(&self) -> BoundedRegion {
        BoundedRegion::centered(self.pos, Vec2::new(CAR_WIDTH, CAR_HEIGHT))
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpKind {
    Shield,
    SlowMotion,
    ScoreMultiplier,
    ExtraLife,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::Shield,
        PowerUpKind::SlowMotion,
        PowerUpKind::ScoreMultiplier,
        PowerUpKind::ExtraLife,
    ];

    /// How long the effect lasts once collected (`None` = instant)
    pub fn duration_ticks(&self) -> Option<u32> {
        match self {
            PowerUpKind::Shield => Some(350),
            PowerUpKind::SlowMotion => Some(250),
            PowerUpKind::ScoreMultiplier => Some(300),
            PowerUpKind::ExtraLife => None,
        }
    }
}

/// A pickup falling down the road
#[derive(Debug, Clone)]
pub struct PowerUp {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub collected: bool,
}

impl PowerUp {
    /// Fall speed in pixels per tick
    pub const FALL_SPEED: f32 = 2.5;

    pub fn bounds(&self) -> BoundedRegion {
        BoundedRegion::centered(self.pos, Vec2::splat(POWERUP_SIZE))
    }
}

/// A collected power-up that is still in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePowerUp {
    pub kind: PowerUpKind,
    pub ticks_remaining: u32,
}

/// Running score for the current run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreKeeper {
    pub current: u64,
    pub streak: u32,
    pub max_streak: u32,
    pub multiplier: u64,
}

impl Default for ScoreKeeper {
    fn default() -> Self {
        Self {
            current: 0,
            streak: 0,
            max_streak: 0,
            multiplier: 1,
        }
    }
}

impl ScoreKeeper {
    /// Add points (scaled by the multiplier) and extend the streak
    pub fn add(&mut self, points: u64) {
        self.current += points * self.multiplier;
        self.streak += 1;
        self.max_streak = self.max_streak.max(self.streak);
    }

    pub fn reset_streak(&mut self) {
        self.streak = 0;
    }

    /// Start a new run; the best streak survives
    pub fn reset(&mut self) {
        self.current = 0;
        self.streak = 0;
        self.multiplier = 1;
    }
}

/// Complete game state for one run
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// All gameplay randomness comes from here
    pub rng: Pcg32,
    /// Simulation tick counter
    pub tick: u64,
    pub phase: GamePhase,
    pub lives: u8,
    pub level: u32,
    pub player: Player,
    pub enemies: Vec<Car>,
    pub powerups: Vec<PowerUp>,
    pub active: Vec<ActivePowerUp>,
    pub score: ScoreKeeper,
    /// Ticks left before enemy contact counts again
    pub invincibility_ticks: u32,
    /// Events raised since the caller last drained them
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Create a new game state with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tick: 0,
            phase: GamePhase::Playing,
            lives: START_LIVES,
            level: 1,
            player: Player::default(),
            enemies: Vec::new(),
            powerups: Vec::new(),
            active: Vec::new(),
            score: ScoreKeeper::default(),
            invincibility_ticks: 0,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Reset for a new run with a fresh seed, keeping the best streak
    pub fn reset(&mut self, seed: u64) {
        let score = self.score.clone();
        *self = Self::new(seed);
        self.score = score;
        self.score.reset();
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn has_effect(&self, kind: PowerUpKind) -> bool {
        self.active.iter().any(|a| a.kind == kind)
    }

    /// Remove one instance of an active effect. Returns whether one existed.
    pub fn consume_effect(&mut self, kind: PowerUpKind) -> bool {
        match self.active.iter().position(|a| a.kind == kind) {
            Some(i) => {
                self.active.remove(i);
                true
            }
            None => false,
        }
    }

    /// Level implied by the current score
    pub fn level_for_score(score: u64) -> u32 {
        let level = 1 + score / LEVEL_SCORE_INTERVAL;
        level.min(MAX_LEVEL as u64) as u32
    }

    /// Take the events raised so far
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
