//! Traffic Racer - headless core of a lane-dodging arcade racer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spatial index, tick scheduler, game rules)
//! - `highscores`: Bounded top-K score tracking
//! - `jobs`: Single-worker background job queue
//! - `persistence`: Score file load/save
//! - `settings`: JSON configuration
//! - `session`: Ties the above together for one play session

pub mod error;
pub mod highscores;
pub mod jobs;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod sim;

pub use error::{Error, Result};
pub use highscores::TopKTracker;
pub use jobs::BackgroundJobQueue;
pub use session::Session;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// World extent in pixels
    pub const SCREEN_WIDTH: f32 = 1000.0;
    pub const SCREEN_HEIGHT: f32 = 650.0;

    /// Road geometry (road is centred in the world)
    pub const ROAD_WIDTH: f32 = 600.0;
    pub const ROAD_X: f32 = (SCREEN_WIDTH - ROAD_WIDTH) / 2.0;
    pub const LANE_WIDTH: f32 = 120.0;
    pub const NUM_LANES: usize = 5;

    /// Car footprint (player and traffic)
    pub const CAR_WIDTH: f32 = 60.0;
    pub const CAR_HEIGHT: f32 = 100.0;
    /// Power-up pickup footprint
    pub const POWERUP_SIZE: f32 = 40.0;

    /// Player rides this far above the bottom edge
    pub const PLAYER_Y: f32 = SCREEN_HEIGHT - 150.0;
    /// Fraction of the remaining distance the player closes each tick
    pub const PLAYER_STEER_SMOOTHING: f32 = 0.15;
    pub const START_LANE: usize = 2;
    pub const START_LIVES: u8 = 3;

    /// Level rises every this many points
    pub const LEVEL_SCORE_INTERVAL: u64 = 150;
    pub const MAX_LEVEL: u32 = 100;

    /// Ticks of immunity after any enemy contact
    pub const INVINCIBILITY_TICKS: u32 = 80;
}

/// X coordinate of a lane's centre line
#[inline]
pub fn lane_center_x(lane: usize) -> f32 {
    use consts::{LANE_WIDTH, ROAD_X};
    ROAD_X + LANE_WIDTH / 2.0 + lane as f32 * LANE_WIDTH
}
