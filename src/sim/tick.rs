//! Per-frame simulation tick
//!
//! Entities move, collisions resolve, and the effect machine reacts, in
//! that order. Randomness comes only from the injected generator.

use glam::Vec2;
use rand::Rng;

use super::collision::{CollisionEvents, detect_and_resolve};
use super::effects::EffectEvents;
use super::state::{BulletKind, GamePhase, GameState};
use super::store::{JoystickInput, KeyState};
use crate::consts::*;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Held keyboard keys
    pub keys: KeyState,
    /// Virtual joystick
    pub joystick: JoystickInput,
    /// Shoot button held (auto-fires on a cooldown)
    pub fire_held: bool,
    /// Fire key pressed since the last tick (fires immediately)
    pub fire_pressed: bool,
    /// Wall clock in milliseconds
    pub now_ms: f64,
}

/// What happened during a tick
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Player displacement this tick
    pub displacement: Vec2,
    /// Kinds of the shots fired this tick
    pub shots: Vec<BulletKind>,
    pub enemy_spawned: bool,
    pub collisions: CollisionEvents,
    pub effects: EffectEvents,
    /// The last life was lost this tick
    pub game_over: bool,
}

/// Advance the game state by one frame
pub fn tick<R: Rng + ?Sized>(state: &mut GameState, input: &TickInput, rng: &mut R) -> TickEvents {
    let mut events = TickEvents::default();
    if state.phase != GamePhase::Playing {
        return events;
    }
    state.time_ticks += 1;

    events.displacement = state
        .store
        .apply_movement_input(input.joystick, input.keys);

    // Keyboard presses fire at once; the shoot button repeats on a cooldown
    let (split_left, split_right) = input.keys.split();
    if input.fire_pressed {
        events
            .shots
            .push(state.store.fire(split_left, split_right, rng));
    }
    state.store.fire_cooldown = state.store.fire_cooldown.saturating_sub(1);
    if input.fire_held && state.store.fire_cooldown == 0 {
        events
            .shots
            .push(state.store.fire(split_left, split_right, rng));
        state.store.fire_cooldown = FIRE_COOLDOWN_TICKS;
    }

    events.enemy_spawned = state.store.tick(rng);

    let store = &mut state.store;
    events.collisions = detect_and_resolve(&store.player, &mut store.bullets, &mut store.enemies);
    state.score += events.collisions.points;
    for _ in 0..events.collisions.player_hits {
        if state.lose_life() {
            events.game_over = true;
            log::info!("Game over - final score {}", state.score);
        }
    }
    if events.collisions.player_hits > 0 && !events.game_over {
        log::info!("Player hit, {} lives left", state.lives);
    }

    let canvas_height = state.store.canvas.height;
    events.effects = state.effects.advance(
        &state.store.player,
        events.collisions.crystal_hits,
        input.now_ms,
        canvas_height,
        rng,
    );

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PerformanceTier;
    use crate::sim::state::{CanvasSize, Enemy, EnemyKind};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn playing_state(tier: PerformanceTier) -> GameState {
        let mut state = GameState::new(CanvasSize::new(400.0, 600.0), tier);
        state.start();
        state
    }

    fn enemy_on_player(state: &GameState) -> Enemy {
        Enemy {
            pos: state.store.player.pos,
            size: glam::Vec2::new(ENEMY_WIDTH, ENEMY_HEIGHT),
            active: true,
            kind: EnemyKind::Mineral,
            color: 0,
            shape: 0,
            speed: 0.0,
            glow_phase: 0.0,
        }
    }

    #[test]
    fn test_tick_requires_playing() {
        let mut state = GameState::new(CanvasSize::default(), PerformanceTier::High);
        let mut rng = Pcg32::seed_from_u64(1);
        let events = tick(&mut state, &TickInput::default(), &mut rng);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(events.displacement, Vec2::ZERO);
    }

    #[test]
    fn test_arrow_right_stays_on_canvas() {
        let mut state = playing_state(PerformanceTier::High);
        let mut rng = Pcg32::seed_from_u64(1);
        let input = TickInput {
            keys: KeyState {
                right: true,
                ..Default::default()
            },
            ..Default::default()
        };

        tick(&mut state, &input, &mut rng);
        assert_eq!(state.store.player.pos.x, 190.0);
        for _ in 0..200 {
            tick(&mut state, &input, &mut rng);
            if state.is_over() {
                break;
            }
            assert!(state.store.player.pos.x <= 370.0);
        }
    }

    #[test]
    fn test_fire_button_cooldown() {
        let mut state = playing_state(PerformanceTier::High);
        let mut rng = Pcg32::seed_from_u64(1);
        let input = TickInput {
            fire_held: true,
            ..Default::default()
        };

        let mut shots = 0;
        for _ in 0..30 {
            shots += tick(&mut state, &input, &mut rng).shots.len();
        }
        // Ticks 1, 11, 21
        assert_eq!(shots, 3);
        assert_eq!(state.store.shot_count, 3);
    }

    #[test]
    fn test_fire_press_with_arrow_splits() {
        let mut state = playing_state(PerformanceTier::High);
        let mut rng = Pcg32::seed_from_u64(1);
        let input = TickInput {
            keys: KeyState {
                left: true,
                fire: true,
                ..Default::default()
            },
            fire_pressed: true,
            ..Default::default()
        };
        let events = tick(&mut state, &input, &mut rng);
        assert_eq!(events.shots, vec![BulletKind::Note]);
        assert_eq!(state.store.bullets.len(), 3);
    }

    #[test]
    fn test_player_hits_until_game_over() {
        let mut state = playing_state(PerformanceTier::Medium);
        let mut rng = Pcg32::seed_from_u64(4);

        for expected in (0..5).rev() {
            let enemy = enemy_on_player(&state);
            state.store.enemies.push(enemy);
            let events = tick(&mut state, &TickInput::default(), &mut rng);
            assert_eq!(events.collisions.player_hits, 1);
            assert_eq!(state.lives, expected);
            assert_eq!(events.game_over, expected == 0);
        }
        assert!(state.is_over());

        // Nothing moves once the game is over
        let ticks = state.time_ticks;
        tick(&mut state, &TickInput::default(), &mut rng);
        assert_eq!(state.time_ticks, ticks);
        assert_eq!(state.lives, 0);
    }

    #[test]
    fn test_bullet_hit_scores() {
        let mut state = playing_state(PerformanceTier::High);
        let mut rng = Pcg32::seed_from_u64(8);
        let mut enemy = enemy_on_player(&state);
        enemy.pos.y -= 100.0;
        enemy.kind = EnemyKind::Crystal;
        state.store.enemies.push(enemy);

        let input = TickInput {
            fire_pressed: true,
            ..Default::default()
        };
        let mut total = CollisionEvents::default();
        tick(&mut state, &input, &mut rng);
        for _ in 0..20 {
            let events = tick(&mut state, &TickInput::default(), &mut rng);
            total.points += events.collisions.points;
            total.crystal_hits += events.collisions.crystal_hits;
        }
        assert_eq!(total.points, 10);
        assert_eq!(total.crystal_hits, 1);
        assert_eq!(state.score, 10);
        assert_eq!(state.effects.hit_streak.count, 1);
    }

    #[test]
    fn test_determinism() {
        let inputs = [
            TickInput {
                keys: KeyState {
                    up: true,
                    ..Default::default()
                },
                fire_held: true,
                now_ms: 16.0,
                ..Default::default()
            },
            TickInput {
                joystick: JoystickInput::new(0.7, -0.3),
                now_ms: 32.0,
                ..Default::default()
            },
            TickInput::default(),
        ];

        let mut a = playing_state(PerformanceTier::High);
        let mut b = playing_state(PerformanceTier::High);
        let mut rng_a = Pcg32::seed_from_u64(99999);
        let mut rng_b = Pcg32::seed_from_u64(99999);
        for _ in 0..100 {
            for input in &inputs {
                tick(&mut a, input, &mut rng_a);
                tick(&mut b, input, &mut rng_b);
            }
        }

        assert_eq!(a.time_ticks, b.time_ticks);
        assert_eq!(a.score, b.score);
        assert_eq!(a.store.enemies.len(), b.store.enemies.len());
        assert_eq!(a.store.player.pos, b.store.player.pos);
    }
}
