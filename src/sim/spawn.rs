//! Spawn timers
//!
//! Enemy and power-up spawning are self-rescheduling scheduler actions: each
//! firing spawns (if a lane is free) and schedules the next firing with a
//! freshly rolled interval. The closures capture only their own due tick;
//! everything else comes from the scheduler and game state they are handed.

use glam::Vec2;
use rand::Rng;

use super::scheduler::EventScheduler;
use super::state::{Car, GameState, PowerUp, PowerUpKind};
use crate::consts::NUM_LANES;
use crate::lane_center_x;

/// First enemy spawn, in ticks after a reset
pub const FIRST_ENEMY_TICK: u64 = 20;
/// First power-up spawn, in ticks after a reset
pub const FIRST_POWERUP_TICK: u64 = 350;

/// Enemies enter this far above the top edge
const ENEMY_SPAWN_Y: f32 = -120.0;
const POWERUP_SPAWN_Y: f32 = -80.0;

/// A lane is busy if an enemy is still above this line in it
const LANE_BUSY_Y: f32 = 200.0;
/// Enemies above this line in a neighbouring lane make a lane unsafe
const NEIGHBOUR_BUSY_Y: f32 = 330.0;
/// Power-ups avoid lanes with an enemy above this line
const POWERUP_BLOCK_Y: f32 = 320.0;

const MIN_ENEMY_INTERVAL: f32 = 7.0;

/// Schedule both spawners relative to `now`
pub fn schedule_spawners(scheduler: &EventScheduler<GameState>, now: u64) {
    schedule_enemy_spawn(scheduler, now + FIRST_ENEMY_TICK);
    schedule_powerup_spawn(scheduler, now + FIRST_POWERUP_TICK);
}

/// Spawn an enemy at `at`, then keep respawning on a level-dependent timer
pub fn schedule_enemy_spawn(scheduler: &EventScheduler<GameState>, at: u64) {
    scheduler.schedule_at(at, move |scheduler, state| {
        if let Some(lane) = choose_enemy_lane(state) {
            spawn_enemy(state, lane);
        }
        let next = enemy_spawn_interval(state.level, &mut state.rng);
        schedule_enemy_spawn(scheduler, at + next);
    });
}

/// Spawn a power-up at `at`, then keep respawning every 500-799 ticks
pub fn schedule_powerup_spawn(scheduler: &EventScheduler<GameState>, at: u64) {
    scheduler.schedule_at(at, move |scheduler, state| {
        if let Some(lane) = choose_powerup_lane(state) {
            spawn_powerup(state, lane);
        }
        let next = 500 + state.rng.random_range(0..300u64);
        schedule_powerup_spawn(scheduler, at + next);
    });
}

/// Ticks until the next enemy spawn: shrinks with level, never below 7
pub fn enemy_spawn_interval<R: Rng>(level: u32, rng: &mut R) -> u64 {
    let base = 85.0 - level as f32 * 0.65;
    let jitter = rng.random_range(-10..10) as f32;
    (base + jitter).max(MIN_ENEMY_INTERVAL) as u64
}

/// Pick a lane for a new enemy
///
/// Lanes with an enemy still near the top are out. Among the rest, prefer
/// lanes whose neighbours are also clear so the player always has an exit.
pub fn choose_enemy_lane(state: &mut GameState) -> Option<usize> {
    let candidates: Vec<usize> = (0..NUM_LANES)
        .filter(|&lane| {
            !state
                .enemies
                .iter()
                .any(|e| e.lane == lane && e.pos.y < LANE_BUSY_Y)
        })
        .collect();

    let safe: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&lane| {
            !state
                .enemies
                .iter()
                .any(|e| e.pos.y < NEIGHBOUR_BUSY_Y && e.lane.abs_diff(lane) == 1)
        })
        .collect();

    let pool = if safe.is_empty() { &candidates } else { &safe };
    if pool.is_empty() {
        return None;
    }
    Some(pool[state.rng.random_range(0..pool.len())])
}

/// Pick a lane for a new power-up: any lane without an enemy near the top
pub fn choose_powerup_lane(state: &mut GameState) -> Option<usize> {
    let free: Vec<usize> = (0..NUM_LANES)
        .filter(|&lane| {
            !state
                .enemies
                .iter()
                .any(|e| e.lane == lane && e.pos.y < POWERUP_BLOCK_Y)
        })
        .collect();
    if free.is_empty() {
        return None;
    }
    Some(free[state.rng.random_range(0..free.len())])
}

pub fn spawn_enemy(state: &mut GameState, lane: usize) {
    if lane >= NUM_LANES {
        return;
    }
    let speed =
        2.2 + (state.level as f32).powf(1.15) * 0.16 + state.rng.random_range(0..100) as f32 / 100.0;
    let id = state.next_entity_id();
    state.enemies.push(Car {
        id,
        lane,
        pos: Vec2::new(lane_center_x(lane), ENEMY_SPAWN_Y),
        speed,
    });
    log::trace!("Spawned enemy {id} in lane {lane} at speed {speed:.2}");
}

pub fn spawn_powerup(state: &mut GameState, lane: usize) {
    if lane >= NUM_LANES {
        return;
    }
    let kind = PowerUpKind::ALL[state.rng.random_range(0..PowerUpKind::ALL.len())];
    let id = state.next_entity_id();
    state.powerups.push(PowerUp {
        id,
        kind,
        pos: Vec2::new(lane_center_x(lane), POWERUP_SPAWN_Y),
        collected: false,
    });
    log::trace!("Spawned {kind:?} power-up {id} in lane {lane}");
}
