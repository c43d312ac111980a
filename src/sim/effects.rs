//! Transient effect state machine
//!
//! Two competing glows (major from vertical movement streaks, minor from
//! crystal hit streaks), the horizontal sweep ripple trigger, and three
//! particle layers. Wall-clock cooldowns use `now_ms`; staggered spawns
//! go through a tick-counted [`DelayQueue`].

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::Player;
use crate::consts::*;
use crate::settings::PerformanceTier;

/// Which glow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlowKind {
    /// Gold glow from vertical movement
    Major,
    /// Silver glow from crystal hits
    Minor,
}

/// A timed, decaying highlight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Glow {
    pub active: bool,
    /// 1.0 on trigger, decays to 0
    pub intensity: f32,
    /// Animation phase, advances while active
    pub phase: f32,
    /// Wall-clock time of the last trigger
    pub last_trigger_ms: Option<f64>,
}

impl Glow {
    pub fn trigger(&mut self, now_ms: f64) {
        self.active = true;
        self.intensity = 1.0;
        self.last_trigger_ms = Some(now_ms);
    }

    /// True if at least `cooldown_ms` has passed since the last trigger
    pub fn cooled_down(&self, now_ms: f64, cooldown_ms: f64) -> bool {
        self.last_trigger_ms.is_none_or(|last| now_ms - last >= cooldown_ms)
    }

    /// Advance one tick; returns true when the glow just went idle
    fn decay(&mut self, rate: f32) -> bool {
        if !self.active {
            return false;
        }
        self.phase += GLOW_PHASE_STEP;
        self.intensity -= rate;
        if self.intensity <= 0.0 {
            self.force_idle();
            return true;
        }
        false
    }

    fn force_idle(&mut self) {
        self.active = false;
        self.intensity = 0.0;
        self.phase = 0.0;
    }
}

/// Consecutive crystal hits within a timeout window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitStreak {
    pub count: u32,
    pub last_hit_ms: Option<f64>,
}

impl HitStreak {
    /// Record a hit and return the new streak length
    pub fn register(&mut self, now_ms: f64) -> u32 {
        let within_window = self
            .last_hit_ms
            .is_some_and(|last| now_ms - last < CRYSTAL_HIT_WINDOW_MS);
        self.count = if within_window { self.count + 1 } else { 1 };
        self.last_hit_ms = Some(now_ms);
        self.count
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }
}

/// Expanding ring centered on the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockPulse {
    pub radius: f32,
    pub alpha: f32,
    pub max_radius: f32,
}

/// Expanding ring left where it was emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ripple {
    pub origin: Vec2,
    pub radius: f32,
    pub alpha: f32,
}

/// Falling exhaust particle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailMote {
    pub pos: Vec2,
    pub alpha: f32,
    pub size: f32,
}

/// Items released after a number of ticks
#[derive(Debug, Clone, Default)]
pub struct DelayQueue<T> {
    pending: Vec<(u32, T)>,
}

impl<T> DelayQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Schedule `item` to be released after `delay_ticks` advances
    /// (0 releases on the next advance)
    pub fn push(&mut self, delay_ticks: u32, item: T) {
        self.pending.push((delay_ticks, item));
    }

    /// Count down every entry and return the ones that are due, in the
    /// order they were pushed
    pub fn advance(&mut self) -> Vec<T> {
        let mut due = Vec::new();
        let mut waiting = Vec::with_capacity(self.pending.len());
        for (ticks, item) in self.pending.drain(..) {
            if ticks == 0 {
                due.push(item);
            } else {
                waiting.push((ticks - 1, item));
            }
        }
        self.pending = waiting;
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Deferred particle spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingSpawn {
    Ripple,
}

/// What changed in the effect machine this tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectEvents {
    pub major_triggered: bool,
    pub minor_triggered: bool,
    /// Glow dropped by the overlap ceiling
    pub overlap_dropped: Option<GlowKind>,
    /// Ripples queued by a horizontal sweep
    pub sweep_triggered: bool,
}

/// Complete effect state
#[derive(Debug, Clone)]
pub struct Effects {
    tier: PerformanceTier,
    pub major: Glow,
    pub minor: Glow,
    pub hit_streak: HitStreak,
    /// Qualifying vertical steps since the last reset
    pub vertical_streak: u32,
    /// Qualifying horizontal steps since the last sweep
    pub horizontal_streak: u32,
    /// Player position at the last counted step, per axis
    pub anchor: Vec2,
    pub last_sweep_ms: Option<f64>,
    /// When both glows became active together
    pub overlap_since_ms: Option<f64>,
    pub pending: DelayQueue<PendingSpawn>,
    pub shock_pulses: Vec<ShockPulse>,
    pub ripples: Vec<Ripple>,
    pub trail_motes: Vec<TrailMote>,
}

impl Effects {
    pub fn new(tier: PerformanceTier) -> Self {
        Self {
            tier,
            major: Glow::default(),
            minor: Glow::default(),
            hit_streak: HitStreak::default(),
            vertical_streak: 0,
            horizontal_streak: 0,
            anchor: Vec2::ZERO,
            last_sweep_ms: None,
            overlap_since_ms: None,
            pending: DelayQueue::new(),
            shock_pulses: Vec::new(),
            ripples: Vec::new(),
            trail_motes: Vec::new(),
        }
    }

    /// Drop every effect and queued spawn; streaks anchor at `anchor`
    pub fn reset(&mut self, anchor: Vec2) {
        *self = Self::new(self.tier);
        self.anchor = anchor;
    }

    pub fn tier(&self) -> PerformanceTier {
        self.tier
    }

    /// Advance the machine one tick.
    ///
    /// Glows decay first so a glow triggered this tick is reported at full
    /// intensity. Then movement steps and crystal hits may trigger, the
    /// overlap ceiling is enforced, particle layers advance, and the delay
    /// queue releases due spawns.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        player: &Player,
        crystal_hits: u32,
        now_ms: f64,
        canvas_height: f32,
        rng: &mut R,
    ) -> EffectEvents {
        let mut events = EffectEvents::default();
        let tier = self.tier;

        if self.major.decay(tier.glow_decay_rate()) {
            self.vertical_streak = 0;
        }
        if self.minor.decay(tier.glow_decay_rate()) {
            self.hit_streak.clear();
        }

        events.sweep_triggered = self.track_horizontal(player.pos.x, now_ms);
        events.major_triggered = self.track_vertical(player, now_ms, rng);

        for _ in 0..crystal_hits {
            if self.hit_streak.register(now_ms) >= CRYSTAL_HIT_THRESHOLD {
                self.minor.trigger(now_ms);
                events.minor_triggered = true;
            }
        }
        if events.minor_triggered {
            log::debug!("Minor glow (crystal streak {})", self.hit_streak.count);
        }

        events.overlap_dropped = self.enforce_overlap(now_ms, rng);

        self.advance_layers(canvas_height);

        for spawn in self.pending.advance() {
            match spawn {
                PendingSpawn::Ripple => self.ripples.push(Ripple {
                    origin: player.center(),
                    radius: RIPPLE_START_RADIUS,
                    alpha: RIPPLE_START_ALPHA,
                }),
            }
        }

        events
    }

    fn track_horizontal(&mut self, x: f32, now_ms: f64) -> bool {
        let tier = self.tier;
        if (x - self.anchor.x).abs() <= tier.streak_step_threshold() {
            return false;
        }
        self.horizontal_streak += 1;
        self.anchor.x = x;

        let cooled = self
            .last_sweep_ms
            .is_none_or(|last| now_ms - last >= tier.ripple_cooldown_ms());
        if self.horizontal_streak >= SWEEP_STREAK_THRESHOLD && cooled {
            for i in 0..tier.sweep_ripple_count() {
                self.pending
                    .push(i as u32 * SWEEP_RIPPLE_STAGGER_TICKS, PendingSpawn::Ripple);
            }
            self.last_sweep_ms = Some(now_ms);
            self.horizontal_streak = 0;
            return true;
        }
        false
    }

    fn track_vertical<R: Rng + ?Sized>(&mut self, player: &Player, now_ms: f64, rng: &mut R) -> bool {
        let tier = self.tier;
        let y = player.pos.y;
        if (y - self.anchor.y).abs() <= tier.streak_step_threshold() {
            return false;
        }
        self.vertical_streak += 1;
        self.anchor.y = y;
        self.emit_trail(player, rng);

        if self.vertical_streak >= MOVE_STREAK_THRESHOLD
            && !self.major.active
            && self.major.cooled_down(now_ms, tier.glow_cooldown_ms())
        {
            self.major.trigger(now_ms);
            self.vertical_streak = 0;
            if tier.shock_pulses_enabled() {
                self.shock_pulses.push(ShockPulse {
                    radius: SHOCK_START_RADIUS,
                    alpha: SHOCK_START_ALPHA,
                    max_radius: SHOCK_MAX_RADIUS,
                });
            }
            for i in 0..tier.glow_ripple_count() {
                self.pending
                    .push(i as u32 * GLOW_RIPPLE_STAGGER_TICKS, PendingSpawn::Ripple);
            }
            log::debug!("Major glow triggered");
            return true;
        }
        false
    }

    fn emit_trail<R: Rng + ?Sized>(&mut self, player: &Player, rng: &mut R) {
        let tail = player.tail();
        for _ in 0..self.tier.trail_motes_per_step() {
            let spread = (rng.random::<f32>() - 0.5) * player.size.x * 0.6;
            self.trail_motes.push(TrailMote {
                pos: Vec2::new(tail.x + spread, tail.y),
                alpha: TRAIL_START_ALPHA,
                size: 2.0 + rng.random::<f32>() * 3.0,
            });
        }
    }

    fn enforce_overlap<R: Rng + ?Sized>(&mut self, now_ms: f64, rng: &mut R) -> Option<GlowKind> {
        if !(self.major.active && self.minor.active) {
            self.overlap_since_ms = None;
            return None;
        }

        let since = *self.overlap_since_ms.get_or_insert(now_ms);
        if now_ms - since <= MAX_OVERLAP_MS {
            return None;
        }

        self.overlap_since_ms = None;
        let dropped = if rng.random_bool(0.5) {
            self.major.force_idle();
            GlowKind::Major
        } else {
            self.minor.force_idle();
            GlowKind::Minor
        };
        log::debug!("Glow overlap ceiling reached, dropping {:?}", dropped);
        Some(dropped)
    }

    fn advance_layers(&mut self, canvas_height: f32) {
        self.shock_pulses.retain_mut(|p| {
            p.radius += SHOCK_GROWTH;
            p.alpha -= SHOCK_FADE;
            p.alpha > 0.0 && p.radius < p.max_radius
        });
        self.ripples.retain_mut(|r| {
            r.radius += RIPPLE_GROWTH;
            r.alpha -= RIPPLE_FADE;
            r.alpha > 0.0 && r.radius < RIPPLE_MAX_RADIUS
        });
        self.trail_motes.retain_mut(|m| {
            m.pos.y += TRAIL_FALL_SPEED;
            m.alpha -= TRAIL_FADE;
            m.size *= TRAIL_SHRINK;
            m.alpha > 0.0 && m.pos.y < canvas_height
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::CanvasSize;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn player() -> Player {
        Player::spawn(CanvasSize::new(400.0, 600.0))
    }

    fn effects(tier: PerformanceTier) -> Effects {
        let mut fx = Effects::new(tier);
        fx.reset(player().pos);
        fx
    }

    #[test]
    fn test_delay_queue_order() {
        let mut queue = DelayQueue::new();
        queue.push(2, 'c');
        queue.push(0, 'a');
        queue.push(1, 'b');
        assert_eq!(queue.advance(), vec!['a']);
        assert_eq!(queue.advance(), vec!['b']);
        assert_eq!(queue.advance(), vec!['c']);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_three_crystal_hits_light_minor_glow() {
        let mut fx = effects(PerformanceTier::High);
        let mut rng = Pcg32::seed_from_u64(1);
        let p = player();

        fx.advance(&p, 1, 0.0, 600.0, &mut rng);
        fx.advance(&p, 1, 500.0, 600.0, &mut rng);
        assert!(!fx.minor.active);
        let events = fx.advance(&p, 1, 1000.0, 600.0, &mut rng);
        assert!(events.minor_triggered);
        assert!(fx.minor.active);
        assert_eq!(fx.minor.intensity, 1.0);
    }

    #[test]
    fn test_crystal_streak_times_out() {
        let mut fx = effects(PerformanceTier::High);
        let mut rng = Pcg32::seed_from_u64(1);
        let p = player();

        fx.advance(&p, 2, 0.0, 600.0, &mut rng);
        assert_eq!(fx.hit_streak.count, 2);
        fx.advance(&p, 1, 2500.0, 600.0, &mut rng);
        assert_eq!(fx.hit_streak.count, 1);
        assert!(!fx.minor.active);
    }

    #[test]
    fn test_minor_glow_decays_and_clears_streak() {
        let mut fx = effects(PerformanceTier::Medium);
        let mut rng = Pcg32::seed_from_u64(1);
        let p = player();
        fx.advance(&p, 3, 0.0, 600.0, &mut rng);
        assert!(fx.minor.active);

        // 0.02 per tick on constrained tiers
        for i in 1..=60 {
            fx.advance(&p, 0, i as f64 * 16.0, 600.0, &mut rng);
        }
        assert!(!fx.minor.active);
        assert_eq!(fx.minor.intensity, 0.0);
        assert_eq!(fx.minor.phase, 0.0);
        assert_eq!(fx.hit_streak.count, 0);
    }

    #[test]
    fn test_vertical_streak_triggers_major_glow() {
        let mut fx = effects(PerformanceTier::High);
        let mut rng = Pcg32::seed_from_u64(2);
        let mut p = player();

        for step in 1..=3 {
            p.pos.y -= 5.0;
            let events = fx.advance(&p, 0, step as f64 * 16.0, 600.0, &mut rng);
            assert_eq!(events.major_triggered, step == 3);
        }
        assert!(fx.major.active);
        assert_eq!(fx.major.intensity, 1.0);
        assert_eq!(fx.vertical_streak, 0);
        assert_eq!(fx.shock_pulses.len(), 1);
        // Two motes per step on high
        assert_eq!(fx.trail_motes.len(), 6);
        // First ripple released immediately, two more staggered
        assert_eq!(fx.ripples.len(), 1);
        assert_eq!(fx.pending.len(), 2);
        for t in 0..12 {
            fx.advance(&p, 0, 100.0 + t as f64 * 16.0, 600.0, &mut rng);
        }
        assert_eq!(fx.ripples.len(), 3);
        assert!(fx.pending.is_empty());
    }

    #[test]
    fn test_major_glow_respects_cooldown() {
        let mut fx = effects(PerformanceTier::Medium);
        let mut rng = Pcg32::seed_from_u64(2);
        let mut p = player();
        fx.major.last_trigger_ms = Some(0.0);

        for step in 1..=6 {
            p.pos.y -= 5.0;
            fx.advance(&p, 0, 100.0 * step as f64, 600.0, &mut rng);
        }
        assert!(!fx.major.active, "2000 ms cooldown on constrained tiers");
        assert!(fx.vertical_streak >= 3);
    }

    #[test]
    fn test_low_tier_skips_shock_and_motes() {
        let mut fx = effects(PerformanceTier::Low);
        let mut rng = Pcg32::seed_from_u64(2);
        let mut p = player();
        for step in 1..=3 {
            p.pos.y -= 5.0;
            fx.advance(&p, 0, step as f64, 600.0, &mut rng);
        }
        assert!(fx.major.active);
        assert!(fx.shock_pulses.is_empty());
        assert!(fx.trail_motes.is_empty());
        assert_eq!(fx.ripples.len(), 1);
    }

    #[test]
    fn test_small_steps_do_not_count() {
        let mut fx = effects(PerformanceTier::Medium);
        let mut rng = Pcg32::seed_from_u64(2);
        let mut p = player();
        p.pos.y -= 2.0;
        fx.advance(&p, 0, 0.0, 600.0, &mut rng);
        assert_eq!(fx.vertical_streak, 0);
        p.pos.y -= 1.0;
        fx.advance(&p, 0, 16.0, 600.0, &mut rng);
        assert_eq!(fx.vertical_streak, 1);
    }

    #[test]
    fn test_horizontal_sweep_queues_ripples() {
        let mut fx = effects(PerformanceTier::High);
        let mut rng = Pcg32::seed_from_u64(2);
        let mut p = player();

        p.pos.x += 5.0;
        assert!(!fx.advance(&p, 0, 0.0, 600.0, &mut rng).sweep_triggered);
        p.pos.x += 5.0;
        assert!(fx.advance(&p, 0, 16.0, 600.0, &mut rng).sweep_triggered);
        assert_eq!(fx.ripples.len(), 1);
        assert_eq!(fx.pending.len(), 1);

        // Within the 200 ms ripple cooldown nothing fires
        p.pos.x += 5.0;
        fx.advance(&p, 0, 32.0, 600.0, &mut rng);
        p.pos.x += 5.0;
        assert!(!fx.advance(&p, 0, 48.0, 600.0, &mut rng).sweep_triggered);
    }

    #[test]
    fn test_overlap_ceiling_drops_exactly_one() {
        for seed in 0..16 {
            let mut fx = effects(PerformanceTier::High);
            let mut rng = Pcg32::seed_from_u64(seed);
            let p = player();
            fx.major.trigger(0.0);
            fx.minor.trigger(0.0);

            fx.advance(&p, 0, 0.0, 600.0, &mut rng);
            assert_eq!(fx.overlap_since_ms, Some(0.0));
            let events = fx.advance(&p, 0, 4000.0, 600.0, &mut rng);
            assert_eq!(events.overlap_dropped, None);

            let events = fx.advance(&p, 0, 4001.0, 600.0, &mut rng);
            let dropped = events.overlap_dropped.expect("one glow dropped");
            assert_ne!(fx.major.active, fx.minor.active);
            match dropped {
                GlowKind::Major => assert!(!fx.major.active),
                GlowKind::Minor => assert!(!fx.minor.active),
            }
            assert_eq!(fx.overlap_since_ms, None);
        }
    }

    #[test]
    fn test_overlap_clock_clears_when_coactivity_ends() {
        let mut fx = effects(PerformanceTier::High);
        let mut rng = Pcg32::seed_from_u64(3);
        let p = player();
        fx.major.trigger(0.0);
        fx.minor.trigger(0.0);
        fx.advance(&p, 0, 10.0, 600.0, &mut rng);
        assert!(fx.overlap_since_ms.is_some());
        fx.minor.force_idle();
        fx.advance(&p, 0, 20.0, 600.0, &mut rng);
        assert_eq!(fx.overlap_since_ms, None);
    }

    #[test]
    fn test_layers_expire() {
        let mut fx = effects(PerformanceTier::High);
        fx.shock_pulses.push(ShockPulse {
            radius: SHOCK_START_RADIUS,
            alpha: SHOCK_START_ALPHA,
            max_radius: SHOCK_MAX_RADIUS,
        });
        fx.ripples.push(Ripple {
            origin: Vec2::ZERO,
            radius: RIPPLE_START_RADIUS,
            alpha: RIPPLE_START_ALPHA,
        });
        fx.trail_motes.push(TrailMote {
            pos: Vec2::new(0.0, 590.0),
            alpha: TRAIL_START_ALPHA,
            size: 4.0,
        });

        fx.advance_layers(600.0);
        assert_eq!(fx.shock_pulses[0].radius, 24.0);
        assert_eq!(fx.ripples[0].radius, 18.0);
        assert!((fx.trail_motes[0].size - 3.88).abs() < 1e-5);

        for _ in 0..40 {
            fx.advance_layers(600.0);
        }
        assert!(fx.shock_pulses.is_empty());
        assert!(fx.ripples.is_empty());
        assert!(fx.trail_motes.is_empty());
    }

    #[test]
    fn test_reset_drops_pending_spawns() {
        let mut fx = effects(PerformanceTier::High);
        fx.pending.push(3, PendingSpawn::Ripple);
        fx.major.trigger(0.0);
        fx.reset(Vec2::new(10.0, 10.0));
        assert!(fx.pending.is_empty());
        assert!(!fx.major.active);
        assert_eq!(fx.anchor, Vec2::new(10.0, 10.0));
    }
}
