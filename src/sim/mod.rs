//! Gameplay simulation
//!
//! Everything that decides score and lives lives here:
//! - Seeded RNG only (injected by the caller)
//! - Insertion-order entity iteration
//! - No audio, lighting or platform dependencies

pub mod collision;
pub mod effects;
pub mod state;
pub mod store;
pub mod tick;

pub use collision::{CollisionEvents, Rect, collides, detect_and_resolve};
pub use effects::{
    DelayQueue, EffectEvents, Effects, Glow, GlowKind, HitStreak, Ripple, ShockPulse, TrailMote,
};
pub use state::{
    Bullet, BulletKind, CanvasSize, Color, Enemy, EnemyKind, GamePhase, GameState, Player,
};
pub use store::{EntityStore, JoystickInput, KeyState};
pub use tick::{TickEvents, TickInput, tick};
