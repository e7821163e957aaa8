//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only (one `tick` call = one simulation step)
//! - Seeded RNG only
//! - Timed work goes through the tick-keyed scheduler
//! - No rendering or platform dependencies

pub mod collision;
pub mod scheduler;
pub mod spatial;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::WORLD_BOUNDS;
pub use scheduler::{Action, EventScheduler};
pub use spatial::{BoundedRegion, DEFAULT_NODE_CAPACITY, IndexedItem, SpatialIndex};
pub use spawn::schedule_spawners;
pub use state::{
    ActivePowerUp, Car, EndReason, EntityRef, GameEvent, GamePhase, GameState, Player, PowerUp,
    PowerUpKind, ScoreKeeper,
};
pub use tick::{Steer, TickInput, TickScratch, tick};
