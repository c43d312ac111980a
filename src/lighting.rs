//! Concert stage lighting
//!
//! Purely decorative: spotlights orbiting above the stage, laser beams
//! sweeping across it and a strobe flash on the beat. The director owns its
//! own RNG stream, so gameplay draws are identical with or without it.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::settings::PerformanceTier;
use crate::sim::{CanvasSize, Color};

/// Colors a spotlight starts with
pub const SPOTLIGHT_COLORS: [Color; 6] = [0xFF1493, 0x00FFFF, 0xFFD700, 0xFF4500, 0x00FF00, 0x9370DB];
/// Colors a spotlight may switch to mid-show
pub const SPOTLIGHT_RECOLORS: [Color; 8] = [
    0xFF1493, 0x00FFFF, 0xFFD700, 0xFF4500, 0x00FF00, 0x9370DB, 0xFF69B4, 0x1E90FF,
];
pub const LASER_COLORS: [Color; 6] = [0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF];
pub const STROBE_COLORS: [Color; 4] = [0xFFFFFF, 0xFFD700, 0xFF1493, 0x00FFFF];

const SPOTLIGHT_Y: f32 = -50.0;
const ORBIT_RADIUS: f32 = 150.0;
const BEAT_PHASE_STEP: f32 = 0.1;
const RECOLOR_CHANCE: f64 = 0.01;
const LASER_CHANCE: f64 = 0.05;
const LASER_ALPHA: f32 = 0.6;
const LASER_FADE: f32 = 0.03;
const STROBE_FADE: f32 = 0.1;

const BEAT_STROBE_CHANCE: f64 = 0.3;
const BEAT_STROBE_ALPHA: f32 = 0.2;
const BEAT_LASER_CHANCE: f64 = 0.4;
const BEAT_SPOTLIGHT_ALPHA: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spotlight {
    pub pos: Vec2,
    pub radius: f32,
    pub color: Color,
    pub alpha: f32,
    /// Orbital angle (radians)
    pub angle: f32,
    /// Radians per tick
    pub speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaserBeam {
    pub origin: Vec2,
    pub target: Vec2,
    pub color: Color,
    pub alpha: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrobeFlash {
    pub active: bool,
    pub alpha: f32,
    pub color: Color,
}

impl Default for StrobeFlash {
    fn default() -> Self {
        Self {
            active: false,
            alpha: 0.0,
            color: 0xFFFFFF,
        }
    }
}

/// Wall-clock beat trigger
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatTimer {
    interval_ms: f64,
    next_beat_ms: Option<f64>,
}

impl BeatTimer {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            next_beat_ms: None,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Returns true when a beat is due. The first poll only arms the timer.
    /// After a long gap (pause, hidden tab) one beat fires and the schedule
    /// restarts from `now_ms` instead of bursting.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        let Some(next) = self.next_beat_ms else {
            self.next_beat_ms = Some(now_ms + self.interval_ms);
            return false;
        };
        if now_ms < next {
            return false;
        }
        let mut following = next + self.interval_ms;
        if following <= now_ms {
            following = now_ms + self.interval_ms;
        }
        self.next_beat_ms = Some(following);
        true
    }

    /// Forget the schedule; the next poll re-arms it
    pub fn rearm(&mut self) {
        self.next_beat_ms = None;
    }
}

/// Lighting director
#[derive(Debug, Clone)]
pub struct Director {
    tier: PerformanceTier,
    canvas: CanvasSize,
    rng: Pcg32,
    pub spotlights: Vec<Spotlight>,
    pub lasers: Vec<LaserBeam>,
    pub strobe: StrobeFlash,
    pub beat_phase: f32,
    beat: Option<BeatTimer>,
}

impl Director {
    pub fn new(tier: PerformanceTier, canvas: CanvasSize, seed: u64) -> Self {
        Self {
            tier,
            canvas,
            rng: Pcg32::seed_from_u64(seed),
            spotlights: Vec::new(),
            lasers: Vec::new(),
            strobe: StrobeFlash::default(),
            beat_phase: 0.0,
            beat: None,
        }
    }

    pub fn tier(&self) -> PerformanceTier {
        self.tier
    }

    /// Whether the beat timer is running
    pub fn has_beat(&self) -> bool {
        self.beat.is_some()
    }

    /// Set up the rig for a new show. Constrained tiers get fewer
    /// spotlights and a slower beat; the low tier gets neither.
    pub fn init(&mut self) {
        self.reset();
        let count = self.tier.spotlight_count();
        let width = self.canvas.width;
        for i in 0..count {
            let x = if count > 1 {
                i as f32 / (count - 1) as f32 * width
            } else {
                width / 2.0
            };
            let spotlight = Spotlight {
                pos: Vec2::new(x, SPOTLIGHT_Y),
                radius: self.rng.random_range(60.0..100.0),
                color: SPOTLIGHT_COLORS[self.rng.random_range(0..SPOTLIGHT_COLORS.len())],
                alpha: self.rng.random_range(0.3..0.6),
                angle: self.rng.random_range(0.0..TAU),
                speed: self.rng.random_range(0.02..0.05),
            };
            self.spotlights.push(spotlight);
        }
        self.beat = self.tier.beat_interval_ms().map(BeatTimer::new);

        match self.beat {
            Some(beat) => log::info!(
                "Stage lights up: {} spotlights, beat every {} ms",
                count,
                beat.interval_ms()
            ),
            None => log::info!("Stage lights disabled for {} tier", self.tier.as_str()),
        }
    }

    /// Clear every light and cancel the beat
    pub fn reset(&mut self) {
        self.spotlights.clear();
        self.lasers.clear();
        self.strobe = StrobeFlash::default();
        self.beat_phase = 0.0;
        self.beat = None;
    }

    /// Stop the beat timer, keeping what is on stage
    pub fn cancel(&mut self) {
        self.beat = None;
    }

    /// Re-arm the beat after a pause so missed beats are not replayed
    pub fn resume(&mut self) {
        if let Some(beat) = self.beat.as_mut() {
            beat.rearm();
        }
    }

    /// Per-tick update; due beats are applied after the regular motion.
    /// Returns true when a beat fired.
    pub fn update(&mut self, now_ms: f64) -> bool {
        self.beat_phase += BEAT_PHASE_STEP;
        let center_x = self.canvas.width / 2.0;
        for spot in &mut self.spotlights {
            spot.angle += spot.speed;
            spot.pos.x = center_x + spot.angle.cos() * ORBIT_RADIUS;
            if self.rng.random_bool(RECOLOR_CHANCE) {
                spot.color = SPOTLIGHT_RECOLORS[self.rng.random_range(0..SPOTLIGHT_RECOLORS.len())];
            }
            spot.alpha = 0.3 + (self.beat_phase + spot.angle).sin() * 0.2;
        }

        self.lasers.retain_mut(|beam| {
            beam.alpha -= LASER_FADE;
            beam.alpha > 0.0
        });
        if self.rng.random_bool(LASER_CHANCE) {
            self.spawn_laser();
        }

        if self.strobe.active {
            self.strobe.alpha -= STROBE_FADE;
            if self.strobe.alpha <= 0.0 {
                self.strobe.active = false;
            }
        }

        let beat_due = self.beat.as_mut().is_some_and(|beat| beat.poll(now_ms));
        if beat_due {
            self.on_beat();
        }
        beat_due
    }

    /// Beat: maybe strobe, maybe a laser, and pulse every spotlight
    pub fn on_beat(&mut self) {
        if self.rng.random_bool(BEAT_STROBE_CHANCE) {
            self.strobe = StrobeFlash {
                active: true,
                alpha: BEAT_STROBE_ALPHA,
                color: STROBE_COLORS[self.rng.random_range(0..STROBE_COLORS.len())],
            };
        }
        if self.rng.random_bool(BEAT_LASER_CHANCE) {
            self.spawn_laser();
        }
        for spot in &mut self.spotlights {
            spot.alpha = BEAT_SPOTLIGHT_ALPHA;
        }
    }

    /// Beam from one side of the stage to somewhere on the far half
    fn spawn_laser(&mut self) {
        let CanvasSize { width, height } = self.canvas;
        let (x, target_x) = if self.rng.random_bool(0.5) {
            (0.0, width * self.rng.random_range(0.5..1.0))
        } else {
            (width, width * self.rng.random_range(0.0..0.5))
        };
        let beam = LaserBeam {
            origin: Vec2::new(x, self.rng.random::<f32>() * height * 0.7),
            target: Vec2::new(target_x, self.rng.random::<f32>() * height),
            color: LASER_COLORS[self.rng.random_range(0..LASER_COLORS.len())],
            alpha: LASER_ALPHA,
            width: self.rng.random_range(2.0..5.0),
        };
        self.lasers.push(beam);
    }
}
