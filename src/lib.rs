//! Riff Shooter - A concert-stage vertical shooter core
//!
//! Core modules:
//! - `sim`: Entity store, collisions, effect state machine, tick
//! - `audio`: Procedural voice graphs and the engine that plays them
//! - `lighting`: Stage spotlights, lasers and strobe on a beat timer
//! - `game`: The frame loop tying it all together
//! - `snapshot`: Serializable per-frame state for an external renderer

pub mod audio;
pub mod error;
pub mod game;
pub mod lighting;
pub mod settings;
pub mod sim;
pub mod snapshot;

pub use error::{AudioError, InitError};
pub use game::{FrameScheduler, Game};
pub use settings::{PerformanceTier, Settings};
pub use snapshot::FrameSnapshot;

/// Game configuration constants
pub mod consts {
    /// Playfield used when the host does not supply one
    pub const DEFAULT_CANVAS_WIDTH: f32 = 400.0;
    pub const DEFAULT_CANVAS_HEIGHT: f32 = 600.0;

    /// Player defaults
    pub const PLAYER_WIDTH: f32 = 30.0;
    pub const PLAYER_HEIGHT: f32 = 40.0;
    pub const PLAYER_BOTTOM_MARGIN: f32 = 20.0;
    /// Pixels per tick per held arrow
    pub const PLAYER_SPEED: f32 = 5.0;
    /// Joystick moves a little faster than the keyboard
    pub const JOYSTICK_SPEED_FACTOR: f32 = 1.2;
    pub const STARTING_LIVES: u8 = 5;

    /// Shooting
    pub const STRAIGHT_BULLET_SPEED: f32 = 7.0;
    pub const HEART_SHOT_PERIOD: u32 = 3;
    pub const FIRE_COOLDOWN_TICKS: u32 = 10;
    pub const SPLIT_BULLET_COUNT: usize = 3;
    pub const SPLIT_MIN_ANGLE_DEG: f32 = 10.0;
    pub const SPLIT_MAX_ANGLE_DEG: f32 = 50.0;
    pub const SPLIT_MIN_SPEED: f32 = 5.0;
    pub const SPLIT_MAX_SPEED: f32 = 9.0;

    /// Enemies
    pub const ENEMY_SPAWN_INTERVAL: u32 = 60;
    pub const ENEMY_WIDTH: f32 = 30.0;
    pub const ENEMY_HEIGHT: f32 = 35.0;
    pub const ENEMY_SPAWN_Y: f32 = -50.0;
    /// Spawn x is drawn from [0, canvas_width - margin)
    pub const ENEMY_SPAWN_MARGIN: f32 = 35.0;
    pub const ENEMY_MIN_SPEED: f32 = 2.0;
    pub const ENEMY_MAX_SPEED: f32 = 4.0;
    pub const ENEMY_SHAPE_COUNT: u8 = 3;
    pub const CRYSTAL_CHANCE: f64 = 0.2;
    pub const CRYSTAL_PHASE_STEP: f32 = 0.15;

    pub const HIT_SCORE: u64 = 10;

    /// Effect machine
    pub const MOVE_STREAK_THRESHOLD: u32 = 3;
    pub const SWEEP_STREAK_THRESHOLD: u32 = 2;
    pub const CRYSTAL_HIT_THRESHOLD: u32 = 3;
    pub const CRYSTAL_HIT_WINDOW_MS: f64 = 2000.0;
    pub const MAX_OVERLAP_MS: f64 = 4000.0;
    pub const GLOW_PHASE_STEP: f32 = 0.2;
    /// 100 ms and 80 ms at 60 frames per second
    pub const GLOW_RIPPLE_STAGGER_TICKS: u32 = 6;
    pub const SWEEP_RIPPLE_STAGGER_TICKS: u32 = 5;

    pub const SHOCK_START_RADIUS: f32 = 20.0;
    pub const SHOCK_START_ALPHA: f32 = 0.8;
    pub const SHOCK_MAX_RADIUS: f32 = 100.0;
    pub const SHOCK_GROWTH: f32 = 4.0;
    pub const SHOCK_FADE: f32 = 0.02;

    pub const RIPPLE_START_RADIUS: f32 = 15.0;
    pub const RIPPLE_START_ALPHA: f32 = 0.9;
    pub const RIPPLE_MAX_RADIUS: f32 = 120.0;
    pub const RIPPLE_GROWTH: f32 = 3.0;
    pub const RIPPLE_FADE: f32 = 0.015;

    pub const TRAIL_START_ALPHA: f32 = 0.8;
    pub const TRAIL_FALL_SPEED: f32 = 2.0;
    pub const TRAIL_FADE: f32 = 0.02;
    pub const TRAIL_SHRINK: f32 = 0.97;
}
