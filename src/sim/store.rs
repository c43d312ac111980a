//! Entity store: the player, bullets and enemies
//!
//! Owns every gameplay entity and the frame-count timers that drive them
//! (enemy spawn timer, fire cooldown, persistent shot counter).

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{Bullet, BulletKind, CanvasSize, Enemy, EnemyKind, Player, pick_color};
use crate::consts::*;

/// Held keyboard keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    /// Space bar held (combined with an arrow it splits the shot)
    pub fire: bool,
}

impl KeyState {
    /// Split direction when an arrow and the fire key are held together.
    /// Left takes precedence when both arrows are down.
    pub fn split(&self) -> (bool, bool) {
        let left = self.fire && self.left;
        let right = self.fire && self.right && !left;
        (left, right)
    }
}

/// Virtual joystick state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JoystickInput {
    /// Direction, each component in [-1, 1]
    pub vector: Vec2,
    /// Whether a touch is currently driving the stick
    pub active: bool,
}

impl JoystickInput {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            vector: Vec2::new(x, y),
            active: true,
        }
    }

    /// Direction with non-finite components zeroed and the rest clamped
    pub fn clamped(&self) -> Vec2 {
        let clean = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Vec2::new(clean(self.vector.x), clean(self.vector.y))
    }
}

/// All gameplay entities
#[derive(Debug, Clone)]
pub struct EntityStore {
    pub canvas: CanvasSize,
    pub player: Player,
    pub bullets: Vec<Bullet>,
    pub enemies: Vec<Enemy>,
    /// Ticks since the last enemy spawn
    pub spawn_timer: u32,
    /// Shots fired this session (every third is a heart)
    pub shot_count: u32,
    /// Ticks before the shoot button may fire again
    pub fire_cooldown: u32,
}

impl EntityStore {
    pub fn new(canvas: CanvasSize) -> Self {
        Self {
            canvas,
            player: Player::spawn(canvas),
            bullets: Vec::new(),
            enemies: Vec::new(),
            spawn_timer: 0,
            shot_count: 0,
            fire_cooldown: 0,
        }
    }

    /// Clear every entity and timer for a fresh session
    pub fn reset(&mut self) {
        *self = Self::new(self.canvas);
    }

    /// (Re)place the player for a canvas
    pub fn spawn_player(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
        self.player = Player::spawn(canvas);
    }

    /// Move the player from keyboard and joystick input.
    ///
    /// Keyboard and joystick contributions add up; the result is clamped to
    /// the canvas. Returns the actual displacement this tick.
    pub fn apply_movement_input(&mut self, joystick: JoystickInput, keys: KeyState) -> Vec2 {
        let before = self.player.pos;
        let speed = self.player.speed;

        let mut delta = Vec2::ZERO;
        if keys.left {
            delta.x -= speed;
        }
        if keys.right {
            delta.x += speed;
        }
        if keys.up {
            delta.y -= speed;
        }
        if keys.down {
            delta.y += speed;
        }
        if joystick.active {
            delta += joystick.clamped() * speed * JOYSTICK_SPEED_FACTOR;
        }

        let max = Vec2::new(
            (self.canvas.width - self.player.size.x).max(0.0),
            (self.canvas.height - self.player.size.y).max(0.0),
        );
        self.player.pos = (self.player.pos + delta).clamp(Vec2::ZERO, max);
        self.player.pos - before
    }

    /// Fire one straight bullet, or a three-bullet split cone when a split
    /// direction is held. Returns the kind fired.
    pub fn fire<R: Rng + ?Sized>(
        &mut self,
        split_left: bool,
        split_right: bool,
        rng: &mut R,
    ) -> BulletKind {
        self.shot_count += 1;
        let kind = BulletKind::for_shot(self.shot_count);
        let size = kind.size();
        let origin = Vec2::new(
            self.player.pos.x + self.player.size.x / 2.0 - size.x / 2.0,
            self.player.pos.y,
        );

        if split_left || split_right {
            let direction = if split_left { -1.0 } else { 1.0 };
            let min_angle = SPLIT_MIN_ANGLE_DEG.to_radians();
            let max_angle = SPLIT_MAX_ANGLE_DEG.to_radians();
            for _ in 0..SPLIT_BULLET_COUNT {
                let speed = rng.random_range(SPLIT_MIN_SPEED..SPLIT_MAX_SPEED);
                let angle = rng.random_range(min_angle..max_angle);
                self.bullets.push(Bullet {
                    pos: origin,
                    size,
                    active: true,
                    kind,
                    color: pick_color(rng, kind.palette()),
                    speed,
                    velocity: Some(Vec2::new(
                        angle.sin() * speed * direction,
                        -angle.cos() * speed,
                    )),
                });
            }
            log::debug!(
                "Split shot #{} ({:?}) {}",
                self.shot_count,
                kind,
                if split_left { "left" } else { "right" }
            );
        } else {
            self.bullets.push(Bullet {
                pos: origin,
                size,
                active: true,
                kind,
                color: pick_color(rng, kind.palette()),
                speed: STRAIGHT_BULLET_SPEED,
                velocity: None,
            });
            log::debug!("Shot #{} ({:?})", self.shot_count, kind);
        }

        kind
    }

    /// Advance bullets and enemies one tick, prune the dead, and run the
    /// spawn timer. Returns true when an enemy spawned.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let canvas = self.canvas;

        for bullet in &mut self.bullets {
            bullet.pos += bullet.step();
        }
        self.bullets.retain(|b| {
            b.active
                && b.pos.y > -b.size.y
                && b.pos.y < canvas.height + b.size.y
                && b.pos.x > -b.size.x
                && b.pos.x < canvas.width + b.size.x
        });

        for enemy in &mut self.enemies {
            enemy.pos.y += enemy.speed;
            if enemy.kind == EnemyKind::Crystal {
                enemy.glow_phase += CRYSTAL_PHASE_STEP;
            }
        }
        self.enemies.retain(|e| e.active && e.pos.y < canvas.height);

        self.spawn_timer += 1;
        if self.spawn_timer >= ENEMY_SPAWN_INTERVAL {
            self.spawn_timer = 0;
            self.spawn_enemy(rng);
            return true;
        }
        false
    }

    fn spawn_enemy<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let kind = if rng.random_bool(CRYSTAL_CHANCE) {
            EnemyKind::Crystal
        } else {
            EnemyKind::Mineral
        };
        let color = pick_color(rng, kind.palette());
        let shape = rng.random_range(0..ENEMY_SHAPE_COUNT);
        let x_range = (self.canvas.width - ENEMY_SPAWN_MARGIN).max(0.0);
        let x = rng.random::<f32>() * x_range;
        let speed = rng.random_range(ENEMY_MIN_SPEED..ENEMY_MAX_SPEED);
        let glow_phase = match kind {
            EnemyKind::Crystal => rng.random::<f32>() * std::f32::consts::TAU,
            EnemyKind::Mineral => 0.0,
        };

        self.enemies.push(Enemy {
            pos: Vec2::new(x, ENEMY_SPAWN_Y),
            size: Vec2::new(ENEMY_WIDTH, ENEMY_HEIGHT),
            active: true,
            kind,
            color,
            shape,
            speed,
            glow_phase,
        });
        log::debug!("Spawned {:?} (shape {}) at x={:.1}", kind, shape, x);
    }
}
