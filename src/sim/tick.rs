//! Fixed-step simulation tick
//!
//! One call advances the run by exactly one tick. Order within a tick:
//! scheduler pump, steering, level, movement, index rebuild, collisions,
//! effect timers, then the tick counter and time-based score.

use super::collision::{age_powerups, rebuild_index, resolve_player_collisions};
use super::scheduler::EventScheduler;
use super::spatial::{IndexedItem, SpatialIndex};
use super::state::{EndReason, EntityRef, GameEvent, GamePhase, GameState, PowerUp, PowerUpKind};
use crate::consts::*;

/// Enemies are dropped once they are this far below the bottom edge
const ENEMY_DESPAWN_MARGIN: f32 = 150.0;
const POWERUP_DESPAWN_MARGIN: f32 = 120.0;

/// Time-based scoring
const SURVIVAL_POINTS: u64 = 10;
const SURVIVAL_INTERVAL: u64 = 25;
const MILESTONE_POINTS: u64 = 150;
const MILESTONE_INTERVAL: u64 = 350;

/// How far ahead (pixels above the player) the autopilot looks for traffic
const AUTOPILOT_LOOKAHEAD: f32 = 320.0;

/// Lane change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steer {
    Left,
    Right,
}

impl Steer {
    fn delta(self) -> i32 {
        match self {
            Steer::Left => -1,
            Steer::Right => 1,
        }
    }
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub steer: Option<Steer>,
    /// Pause toggle
    pub pause: bool,
    /// End the run now
    pub quit: bool,
    /// Let the built-in driver pick lanes (demo/headless runs)
    pub autopilot: bool,
}

/// Per-run scratch that survives between ticks: the spatial index and the
/// candidate buffer
#[derive(Debug)]
pub struct TickScratch {
    pub index: SpatialIndex<EntityRef>,
    candidates: Vec<IndexedItem<EntityRef>>,
}

impl TickScratch {
    pub fn new(index: SpatialIndex<EntityRef>) -> Self {
        Self {
            index,
            candidates: Vec::new(),
        }
    }
}

/// Advance the game state by one tick
pub fn tick(
    state: &mut GameState,
    scheduler: &EventScheduler<GameState>,
    scratch: &mut TickScratch,
    input: &TickInput,
) {
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            GamePhase::GameOver => {}
        }
    }

    if input.quit && state.phase != GamePhase::GameOver {
        state.phase = GamePhase::GameOver;
        state.events.push(GameEvent::GameOver {
            score: state.score.current,
            reason: EndReason::Quit,
        });
        return;
    }

    if state.phase != GamePhase::Playing {
        return;
    }

    scheduler.process(state.tick, state);

    let steer = if input.autopilot {
        autopilot_steer(state)
    } else {
        input.steer
    };
    if let Some(steer) = steer {
        state.player.change_lane(steer.delta());
    }
    state.player.update();

    let level = GameState::level_for_score(state.score.current);
    if level != state.level {
        log::debug!("Level {} -> {} at tick {}", state.level, level, state.tick);
        state.level = level;
        state.events.push(GameEvent::LevelUp(level));
    }

    move_entities(state);

    rebuild_index(state, &mut scratch.index);
    resolve_player_collisions(state, &scratch.index, &mut scratch.candidates);
    age_powerups(state);

    state.tick += 1;
    if state.tick % SURVIVAL_INTERVAL == 0 {
        state.score.add(SURVIVAL_POINTS);
    }
    if state.tick % MILESTONE_INTERVAL == 0 {
        state.score.add(MILESTONE_POINTS);
    }
}

fn move_entities(state: &mut GameState) {
    let speed_scale = if state.has_effect(PowerUpKind::SlowMotion) {
        0.5
    } else {
        1.0
    };
    for enemy in &mut state.enemies {
        enemy.pos.y += enemy.speed * speed_scale;
    }
    state
        .enemies
        .retain(|e| e.pos.y <= SCREEN_HEIGHT + ENEMY_DESPAWN_MARGIN);

    for powerup in &mut state.powerups {
        powerup.pos.y += PowerUp::FALL_SPEED;
    }
    state
        .powerups
        .retain(|p| !p.collected && p.pos.y <= SCREEN_HEIGHT + POWERUP_DESPAWN_MARGIN);
}

/// Dodge toward the nearest clear lane when traffic is closing in
fn autopilot_steer(state: &GameState) -> Option<Steer> {
    let player = &state.player;
    // Still easing into the last lane change
    if (player.pos.x - player.target_x).abs() > LANE_WIDTH * 0.25 {
        return None;
    }

    let threatened = |lane: usize| {
        state.enemies.iter().any(|e| {
            e.lane == lane
                && e.pos.y < player.pos.y + CAR_HEIGHT
                && e.pos.y > player.pos.y - AUTOPILOT_LOOKAHEAD
        })
    };
    if !threatened(player.lane) {
        return None;
    }

    let left = player.lane.checked_sub(1).filter(|&l| !threatened(l));
    let right = Some(player.lane + 1).filter(|&l| l < NUM_LANES && !threatened(l));
    match (left, right) {
        (Some(_), Some(_)) if player.lane >= NUM_LANES / 2 => Some(Steer::Left),
        (Some(_), Some(_)) => Some(Steer::Right),
        (Some(_), None) => Some(Steer::Left),
        (None, Some(_)) => Some(Steer::Right),
        (None, None) => None,
    }
}
