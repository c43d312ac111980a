//! Per-frame state handed to the external renderer
//!
//! The snapshot already reflects the performance tier: layers the tier
//! does not draw are left empty so the renderer never has to know the
//! tier rules.

use serde::{Deserialize, Serialize};

use crate::lighting::{Director, LaserBeam, Spotlight, StrobeFlash};
use crate::settings::PerformanceTier;
use crate::sim::{
    Bullet, CanvasSize, Enemy, GamePhase, GameState, Glow, Player, Ripple, ShockPulse, TrailMote,
};

/// Renderer hints derived from the tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderHints {
    pub canvas_scale: f32,
    pub glow_layers: u32,
    pub star_count: u32,
}

impl RenderHints {
    pub fn for_tier(tier: PerformanceTier) -> Self {
        Self {
            canvas_scale: tier.canvas_scale(),
            glow_layers: tier.glow_layer_count(),
            star_count: tier.star_count(),
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub tier: PerformanceTier,
    pub canvas: CanvasSize,
    pub hints: RenderHints,
    pub phase: GamePhase,
    pub score: u64,
    pub lives: u8,
    pub game_over: bool,
    pub player: Player,
    pub bullets: Vec<Bullet>,
    pub enemies: Vec<Enemy>,
    pub major_glow: Glow,
    pub minor_glow: Glow,
    pub shock_pulses: Vec<ShockPulse>,
    pub ripples: Vec<Ripple>,
    pub trail_motes: Vec<TrailMote>,
    pub spotlights: Vec<Spotlight>,
    pub lasers: Vec<LaserBeam>,
    /// Present only while a flash is visible
    pub strobe: Option<StrobeFlash>,
    /// Audio context state label
    pub audio: String,
}

impl FrameSnapshot {
    pub fn capture(state: &GameState, lights: &Director, audio: &str) -> Self {
        let tier = state.tier;
        let effects = &state.effects;
        let store = &state.store;

        Self {
            tier,
            canvas: store.canvas,
            hints: RenderHints::for_tier(tier),
            phase: state.phase,
            score: state.score,
            lives: state.lives,
            game_over: state.is_over(),
            player: store.player.clone(),
            bullets: store.bullets.iter().filter(|b| b.active).cloned().collect(),
            enemies: store.enemies.iter().filter(|e| e.active).cloned().collect(),
            major_glow: effects.major.clone(),
            minor_glow: effects.minor.clone(),
            shock_pulses: if tier.draws_shock_pulses() {
                effects.shock_pulses.clone()
            } else {
                Vec::new()
            },
            ripples: if tier.draws_ripples() {
                effects.ripples.clone()
            } else {
                Vec::new()
            },
            trail_motes: if tier.draws_trails() {
                effects.trail_motes.clone()
            } else {
                Vec::new()
            },
            spotlights: if tier.draws_spotlights() {
                lights.spotlights.clone()
            } else {
                Vec::new()
            },
            lasers: if tier.draws_lasers() {
                lights.lasers.clone()
            } else {
                Vec::new()
            },
            strobe: Some(lights.strobe).filter(|s| tier.draws_strobe() && s.active),
            audio: audio.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn capture(tier: PerformanceTier) -> FrameSnapshot {
        let mut state = GameState::new(CanvasSize::default(), tier);
        state.start();
        state.effects.ripples.push(Ripple {
            origin: Vec2::new(200.0, 300.0),
            radius: 15.0,
            alpha: 0.9,
        });
        let mut lights = Director::new(tier, CanvasSize::default(), 3);
        lights.init();
        lights.strobe = StrobeFlash {
            active: true,
            alpha: 0.2,
            color: 0xFFFFFF,
        };
        FrameSnapshot::capture(&state, &lights, "running")
    }

    #[test]
    fn test_low_tier_hides_stage_layers() {
        let snap = capture(PerformanceTier::Low);
        assert!(snap.ripples.is_empty());
        assert!(snap.spotlights.is_empty());
        assert!(snap.strobe.is_none());
        assert_eq!(snap.hints.canvas_scale, 0.8);
    }

    #[test]
    fn test_medium_draws_ripples_but_no_strobe() {
        let snap = capture(PerformanceTier::Medium);
        assert_eq!(snap.ripples.len(), 1);
        assert_eq!(snap.spotlights.len(), 4);
        assert!(snap.strobe.is_none());
    }

    #[test]
    fn test_high_snapshot_serializes() {
        let snap = capture(PerformanceTier::High);
        assert!(snap.strobe.is_some());
        assert_eq!(snap.lives, 5);
        let json = snap.to_json().unwrap();
        assert!(json.contains("\"audio\":\"running\""));
        assert!(json.contains("\"phase\":\"Playing\""));
    }
}
