//! Collision detection and response
//!
//! Everything on the stage is an axis-aligned box, so the whole engine is
//! an interval-overlap test plus the bookkeeping of who hit whom.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{Bullet, Enemy, EnemyKind, Player};
use crate::consts::HIT_SCORE;

/// Axis-aligned rectangle (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self { pos, size }
    }

    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }
}

/// Two rectangles intersect iff both axis intervals overlap.
///
/// Inequalities are strict, so boxes that only share an edge do not
/// collide.
#[inline]
pub fn collides(a: &Rect, b: &Rect) -> bool {
    a.pos.x < b.right() && a.right() > b.pos.x && a.pos.y < b.bottom() && a.bottom() > b.pos.y
}

/// Outcome of one collision pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionEvents {
    /// Score gained this pass
    pub points: u64,
    /// Bullet-enemy hits
    pub enemy_hits: u32,
    /// Bullet hits on crystal enemies
    pub crystal_hits: u32,
    /// Enemies that reached the player
    pub player_hits: u32,
}

impl CollisionEvents {
    pub fn is_empty(&self) -> bool {
        self.enemy_hits == 0 && self.player_hits == 0
    }
}

/// Resolve every bullet-enemy and enemy-player overlap for this tick.
///
/// Bullets are tested against enemies in insertion order; a bullet is
/// deactivated by its first hit, so it can never score twice. Enemies
/// destroyed by bullets no longer threaten the player in the same pass.
pub fn detect_and_resolve(
    player: &Player,
    bullets: &mut [Bullet],
    enemies: &mut [Enemy],
) -> CollisionEvents {
    let mut events = CollisionEvents::default();

    for bullet in bullets.iter_mut() {
        for enemy in enemies.iter_mut() {
            if bullet.active && enemy.active && collides(&bullet.bounds(), &enemy.bounds()) {
                bullet.active = false;
                enemy.active = false;
                events.points += HIT_SCORE;
                events.enemy_hits += 1;
                if enemy.kind == EnemyKind::Crystal {
                    events.crystal_hits += 1;
                }
            }
        }
    }

    let player_bounds = player.bounds();
    for enemy in enemies.iter_mut() {
        if enemy.active && collides(&player_bounds, &enemy.bounds()) {
            enemy.active = false;
            events.player_hits += 1;
        }
    }

    events
}
