//! Game state and core simulation types

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::effects::Effects;
use super::store::EntityStore;
use crate::consts::*;
use crate::settings::PerformanceTier;

/// 0xRRGGBB color
pub type Color = u32;

/// Heart bullet palette (pinks and reds)
pub const HEART_COLORS: [Color; 10] = [
    0xFF1493, 0xFF69B4, 0xFF6B9D, 0xFFB6C1, 0xFFC0CB, 0xFF1744, 0xE91E63, 0xC2185B, 0xF50057,
    0xFF4081,
];

/// Note bullet palette (blues and violets)
pub const NOTE_COLORS: [Color; 10] = [
    0x8A2BE2, 0x9370DB, 0x9932CC, 0xBA55D3, 0xDA70D6, 0x6A5ACD, 0x7B68EE, 0x6495ED, 0x4169E1,
    0x00CED1,
];

/// Crystal palette (bright, translucent)
pub const CRYSTAL_COLORS: [Color; 10] = [
    0x00FFFF, 0x00E5FF, 0x00BCD4, 0xFF00FF, 0xE040FB, 0x7C4DFF, 0x00E676, 0x76FF03, 0xFFEA00,
    0xFFC400,
];

/// Mineral palette (earth and slate tones)
pub const MINERAL_COLORS: [Color; 12] = [
    0x8D6E63, 0xA1887F, 0x795548, 0x6D4C41, 0x5D4037, 0x757575, 0x616161, 0x9E9E9E, 0x78909C,
    0x546E7A, 0xB0BEC5, 0x90A4AE,
];

/// Pick a color uniformly from a palette
pub fn pick_color<R: Rng + ?Sized>(rng: &mut R, palette: &[Color]) -> Color {
    palette[rng.random_range(0..palette.len())]
}

/// Pixel dimensions of the playfield
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the first `start_game`
    Ready,
    /// Active gameplay
    Playing,
    /// Loop suspended by the host
    Paused,
    /// Lives exhausted
    GameOver,
}

/// The player's guitar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    /// Pixels per tick
    pub speed: f32,
}

impl Player {
    /// Place the player centered near the bottom edge
    pub fn spawn(canvas: CanvasSize) -> Self {
        let size = Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT);
        Self {
            pos: Vec2::new(
                canvas.width / 2.0 - size.x / 2.0,
                canvas.height - size.y - PLAYER_BOTTOM_MARGIN,
            ),
            size,
            speed: PLAYER_SPEED,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size / 2.0
    }

    /// Bottom-center point, where trail motes are emitted
    pub fn tail(&self) -> Vec2 {
        Vec2::new(self.pos.x + self.size.x / 2.0, self.pos.y + self.size.y)
    }
}

/// Bullet types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BulletKind {
    #[default]
    Note,
    Heart,
}

impl BulletKind {
    /// Every third shot of the session is a heart
    pub fn for_shot(shot_count: u32) -> Self {
        if shot_count > 0 && shot_count % HEART_SHOT_PERIOD == 0 {
            BulletKind::Heart
        } else {
            BulletKind::Note
        }
    }

    pub fn size(&self) -> Vec2 {
        match self {
            BulletKind::Note => Vec2::new(15.0, 20.0),
            BulletKind::Heart => Vec2::new(20.0, 20.0),
        }
    }

    pub fn palette(&self) -> &'static [Color] {
        match self {
            BulletKind::Note => &NOTE_COLORS,
            BulletKind::Heart => &HEART_COLORS,
        }
    }
}

/// A bullet entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub pos: Vec2,
    pub size: Vec2,
    pub active: bool,
    pub kind: BulletKind,
    pub color: Color,
    /// Scalar speed (straight shots travel up at this rate)
    pub speed: f32,
    /// Explicit velocity for split shots
    pub velocity: Option<Vec2>,
}

impl Bullet {
    /// Per-tick displacement
    pub fn step(&self) -> Vec2 {
        self.velocity.unwrap_or(Vec2::new(0.0, -self.speed))
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }
}

/// Enemy types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnemyKind {
    #[default]
    Mineral,
    Crystal,
}

impl EnemyKind {
    pub fn palette(&self) -> &'static [Color] {
        match self {
            EnemyKind::Mineral => &MINERAL_COLORS,
            EnemyKind::Crystal => &CRYSTAL_COLORS,
        }
    }
}

/// A falling mineral or crystal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub pos: Vec2,
    pub size: Vec2,
    pub active: bool,
    pub kind: EnemyKind,
    pub color: Color,
    /// Shape variant (0-2)
    pub shape: u8,
    /// Pixels per tick, downward
    pub speed: f32,
    /// Crystal shimmer phase (always 0 for minerals)
    pub glow_phase: f32,
}

impl Enemy {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    pub tier: PerformanceTier,
    /// Player, bullets, enemies
    pub store: EntityStore,
    /// Glows and particle layers
    pub effects: Effects,
    pub score: u64,
    pub lives: u8,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
}

impl GameState {
    /// Create a state waiting for `start`
    pub fn new(canvas: CanvasSize, tier: PerformanceTier) -> Self {
        Self {
            tier,
            store: EntityStore::new(canvas),
            effects: Effects::new(tier),
            score: 0,
            lives: STARTING_LIVES,
            phase: GamePhase::Ready,
            time_ticks: 0,
        }
    }

    /// Reset every session field and enter `Playing`
    pub fn start(&mut self) {
        self.store.reset();
        self.effects.reset(self.store.player.pos);
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.phase = GamePhase::Playing;
        self.time_ticks = 0;
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Take one life; returns true when this hit ended the game
    pub fn lose_life(&mut self) -> bool {
        if self.lives == 0 {
            return false;
        }
        self.lives -= 1;
        if self.lives == 0 {
            self.phase = GamePhase::GameOver;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_spawn_position() {
        let player = Player::spawn(CanvasSize::new(400.0, 600.0));
        assert_eq!(player.pos, Vec2::new(185.0, 540.0));
        assert_eq!(player.center(), Vec2::new(200.0, 560.0));
    }

    #[test]
    fn test_bullet_kind_cycle() {
        let kinds: Vec<_> = (1..=6).map(BulletKind::for_shot).collect();
        assert_eq!(
            kinds,
            vec![
                BulletKind::Note,
                BulletKind::Note,
                BulletKind::Heart,
                BulletKind::Note,
                BulletKind::Note,
                BulletKind::Heart,
            ]
        );
    }

    #[test]
    fn test_lives_floor() {
        let mut state = GameState::new(CanvasSize::default(), PerformanceTier::High);
        state.start();
        for _ in 0..4 {
            assert!(!state.lose_life());
        }
        assert!(state.lose_life());
        assert_eq!(state.lives, 0);
        assert!(state.is_over());
        assert!(!state.lose_life());
        assert_eq!(state.lives, 0);
    }
}
