//! Player collision handling
//!
//! Candidates come from the per-tick spatial index. Because a straddling
//! entity can come back more than once, enemy handling stops at the first
//! hit and power-ups are marked collected before their effect is applied.

use super::spatial::{BoundedRegion, IndexedItem, SpatialIndex};
use super::state::{
    ActivePowerUp, EndReason, EntityRef, GameEvent, GamePhase, GameState, PowerUpKind,
};
use crate::consts::{INVINCIBILITY_TICKS, SCREEN_HEIGHT, SCREEN_WIDTH, START_LIVES};

/// Points awarded by an extra-life pickup
pub const EXTRA_LIFE_BONUS: u64 = 50;

/// Region the collision index covers. Lane geometry and despawn lines are
/// laid out on the same screen, so the index must not be smaller.
pub const WORLD_BOUNDS: BoundedRegion = BoundedRegion::new(0.0, 0.0, SCREEN_WIDTH, SCREEN_HEIGHT);

/// Rebuild the index from the live entities of this tick
pub fn rebuild_index(state: &GameState, index: &mut SpatialIndex<EntityRef>) {
    index.clear();
    for (i, enemy) in state.enemies.iter().enumerate() {
        index.insert(IndexedItem::new(enemy.bounds(), EntityRef::Enemy(i)));
    }
    for (i, powerup) in state.powerups.iter().enumerate() {
        index.insert(IndexedItem::new(powerup.bounds(), EntityRef::PowerUp(i)));
    }
}

/// Resolve the player's contacts against the index built this tick
///
/// `candidates` is scratch space reused between ticks.
pub fn resolve_player_collisions(
    state: &mut GameState,
    index: &SpatialIndex<EntityRef>,
    candidates: &mut Vec<IndexedItem<EntityRef>>,
) {
    if state.invincibility_ticks > 0 {
        state.invincibility_ticks -= 1;
        return;
    }

    candidates.clear();
    index.query_into(&state.player.bounds(), candidates);

    let hit_enemy = candidates
        .iter()
        .any(|it| matches!(it.entity, EntityRef::Enemy(_)));
    if hit_enemy {
        hit_by_enemy(state);
    }

    for item in candidates.iter() {
        let EntityRef::PowerUp(i) = item.entity else {
            continue;
        };
        let Some(powerup) = state.powerups.get_mut(i) else {
            continue;
        };
        if powerup.collected {
            continue;
        }
        powerup.collected = true;
        let kind = powerup.kind;
        apply_powerup(state, kind);
    }
}

fn hit_by_enemy(state: &mut GameState) {
    if state.consume_effect(PowerUpKind::Shield) {
        log::debug!("Shield absorbed a hit at tick {}", state.tick);
        state.events.push(GameEvent::ShieldAbsorbed);
    } else {
        state.lives = state.lives.saturating_sub(1);
        state.score.reset_streak();
        log::debug!("Crash at tick {}, {} lives left", state.tick, state.lives);
        state.events.push(GameEvent::Crash {
            lives_left: state.lives,
        });
        if state.lives == 0 {
            state.phase = GamePhase::GameOver;
            state.events.push(GameEvent::GameOver {
                score: state.score.current,
                reason: EndReason::Crashed,
            });
        }
    }
    state.invincibility_ticks = INVINCIBILITY_TICKS;
}

fn apply_powerup(state: &mut GameState, kind: PowerUpKind) {
    log::debug!("Collected {kind:?} at tick {}", state.tick);
    match kind.duration_ticks() {
        Some(ticks_remaining) => {
            state.active.push(ActivePowerUp {
                kind,
                ticks_remaining,
            });
            if kind == PowerUpKind::ScoreMultiplier {
                state.score.multiplier = 2;
            }
        }
        None => {
            if state.lives < START_LIVES {
                state.lives += 1;
            }
            state.score.add(EXTRA_LIFE_BONUS);
        }
    }
    state.events.push(GameEvent::PowerUpCollected(kind));
}

/// Count down active effects and drop the expired ones
pub fn age_powerups(state: &mut GameState) {
    for active in &mut state.active {
        active.ticks_remaining = active.ticks_remaining.saturating_sub(1);
    }
    state.active.retain(|a| a.ticks_remaining > 0);
    if !state.has_effect(PowerUpKind::ScoreMultiplier) {
        state.score.multiplier = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Car, PowerUp};

    fn world_index() -> SpatialIndex<EntityRef> {
        SpatialIndex::with_capacity(WORLD_BOUNDS, 1)
    }

    fn enemy_on_player(state: &mut GameState) {
        let id = state.next_entity_id();
        state.enemies.push(Car {
            id,
            lane: state.player.lane,
            pos: state.player.pos,
            speed: 0.0,
        });
    }

    fn powerup_on_player(state: &mut GameState, kind: PowerUpKind) {
        let id = state.next_entity_id();
        state.powerups.push(PowerUp {
            id,
            kind,
            pos: state.player.pos,
            collected: false,
        });
    }

    fn resolve(state: &mut GameState) {
        let mut index = world_index();
        rebuild_index(state, &mut index);
        let mut scratch = Vec::new();
        resolve_player_collisions(state, &index, &mut scratch);
    }

    #[test]
    fn test_crash_costs_life_and_grants_invincibility() {
        let mut state = GameState::new(1);
        state.score.add(10);
        enemy_on_player(&mut state);
        resolve(&mut state);

        assert_eq!(state.lives, 2);
        assert_eq!(state.score.streak, 0);
        assert_eq!(state.invincibility_ticks, INVINCIBILITY_TICKS);
        assert_eq!(state.drain_events(), vec![GameEvent::Crash { lives_left: 2 }]);

        // Still overlapping, but immune
        resolve(&mut state);
        assert_eq!(state.lives, 2);
        assert_eq!(state.invincibility_ticks, INVINCIBILITY_TICKS - 1);
    }

    #[test]
    fn test_shield_absorbs_hit() {
        let mut state = GameState::new(1);
        state.active.push(ActivePowerUp {
            kind: PowerUpKind::Shield,
            ticks_remaining: 10,
        });
        enemy_on_player(&mut state);
        resolve(&mut state);

        assert_eq!(state.lives, START_LIVES);
        assert!(!state.has_effect(PowerUpKind::Shield));
        assert_eq!(state.drain_events(), vec![GameEvent::ShieldAbsorbed]);
    }

    #[test]
    fn test_last_life_ends_run() {
        let mut state = GameState::new(1);
        state.lives = 1;
        enemy_on_player(&mut state);
        resolve(&mut state);

        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.drain_events().contains(&GameEvent::GameOver {
            score: 0,
            reason: EndReason::Crashed,
        }));
    }

    #[test]
    fn test_straddling_powerup_applies_once() {
        let mut state = GameState::new(1);
        // Fill the root so the pickup lands in several quadrants
        state.player.pos = glam::Vec2::new(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0);
        powerup_on_player(&mut state, PowerUpKind::ExtraLife);
        powerup_on_player(&mut state, PowerUpKind::ExtraLife);
        state.lives = 1;

        resolve(&mut state);
        assert_eq!(state.lives, 3);
        assert_eq!(state.score.current, 2 * EXTRA_LIFE_BONUS);
        assert!(state.powerups.iter().all(|p| p.collected));
    }

    #[test]
    fn test_multiplier_expires() {
        let mut state = GameState::new(1);
        powerup_on_player(&mut state, PowerUpKind::ScoreMultiplier);
        resolve(&mut state);
        assert_eq!(state.score.multiplier, 2);

        for _ in 0..299 {
            age_powerups(&mut state);
        }
        assert_eq!(state.score.multiplier, 2);
        age_powerups(&mut state);
        assert_eq!(state.score.multiplier, 1);
        assert!(state.active.is_empty());
    }
}
