//! Game settings and performance tiers
//!
//! The tier is detected by the host (device class, pixel ratio) and handed
//! in; every tier-dependent constant of the simulation lives here.
//! Settings are persisted separately from the game in LocalStorage.

use serde::{Deserialize, Serialize};

/// Performance tier levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PerformanceTier {
    Low,
    Medium,
    #[default]
    High,
}

impl PerformanceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Low => "Low",
            PerformanceTier::Medium => "Medium",
            PerformanceTier::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(PerformanceTier::Low),
            "medium" | "med" => Some(PerformanceTier::Medium),
            "high" => Some(PerformanceTier::High),
            _ => None,
        }
    }

    /// Low and medium tiers run the handheld profile: longer cooldowns,
    /// faster decay, coarser movement detection.
    pub fn is_constrained(&self) -> bool {
        !matches!(self, PerformanceTier::High)
    }

    // === Effect state machine ===

    /// Cooldown between major glow triggers (ms)
    pub fn glow_cooldown_ms(&self) -> f64 {
        if self.is_constrained() { 2000.0 } else { 800.0 }
    }

    /// Glow intensity lost per tick
    pub fn glow_decay_rate(&self) -> f32 {
        if self.is_constrained() { 0.02 } else { 0.008 }
    }

    /// Minimum displacement from the streak anchor that counts as a step
    pub fn streak_step_threshold(&self) -> f32 {
        if self.is_constrained() { 2.0 } else { 1.0 }
    }

    /// Cooldown between horizontal-sweep ripple bursts (ms)
    pub fn ripple_cooldown_ms(&self) -> f64 {
        if self.is_constrained() { 500.0 } else { 200.0 }
    }

    /// Ripples spawned when the major glow fires
    pub fn glow_ripple_count(&self) -> usize {
        if self.is_constrained() { 1 } else { 3 }
    }

    /// Ripples spawned by a horizontal sweep
    pub fn sweep_ripple_count(&self) -> usize {
        if self.is_constrained() { 1 } else { 2 }
    }

    /// Whether the major glow emits a shock pulse
    pub fn shock_pulses_enabled(&self) -> bool {
        !matches!(self, PerformanceTier::Low)
    }

    /// Trail motes emitted per vertical step
    pub fn trail_motes_per_step(&self) -> usize {
        match self {
            PerformanceTier::Low => 0,
            PerformanceTier::Medium => 1,
            PerformanceTier::High => 2,
        }
    }

    // === Audio ===

    /// Per-tick displacement below which an axis counts as still
    pub fn movement_epsilon(&self) -> f32 {
        match self {
            PerformanceTier::Low => 1.0,
            PerformanceTier::Medium | PerformanceTier::High => 0.5,
        }
    }

    // === Lighting ===

    /// Number of stage spotlights (0 disables the lighting director)
    pub fn spotlight_count(&self) -> usize {
        match self {
            PerformanceTier::Low => 0,
            PerformanceTier::Medium => 4,
            PerformanceTier::High => 8,
        }
    }

    /// Beat timer interval in ms, if the tier runs one
    pub fn beat_interval_ms(&self) -> Option<f64> {
        match self {
            PerformanceTier::Low => None,
            PerformanceTier::Medium => Some(800.0),
            PerformanceTier::High => Some(500.0),
        }
    }

    // === Renderer hints ===

    /// Canvas resolution scale the host should apply
    pub fn canvas_scale(&self) -> f32 {
        match self {
            PerformanceTier::Low => 0.8,
            PerformanceTier::Medium | PerformanceTier::High => 1.0,
        }
    }

    /// Radial layers used to draw a glow
    pub fn glow_layer_count(&self) -> u32 {
        match self {
            PerformanceTier::Low => 3,
            PerformanceTier::Medium => 4,
            PerformanceTier::High => 6,
        }
    }

    /// Background star count
    pub fn star_count(&self) -> u32 {
        match self {
            PerformanceTier::Low => 20,
            PerformanceTier::Medium => 30,
            PerformanceTier::High => 50,
        }
    }

    pub fn draws_spotlights(&self) -> bool {
        !matches!(self, PerformanceTier::Low)
    }

    pub fn draws_lasers(&self) -> bool {
        matches!(self, PerformanceTier::High)
    }

    pub fn draws_ripples(&self) -> bool {
        !matches!(self, PerformanceTier::Low)
    }

    pub fn draws_shock_pulses(&self) -> bool {
        matches!(self, PerformanceTier::High)
    }

    pub fn draws_trails(&self) -> bool {
        !matches!(self, PerformanceTier::Low)
    }

    pub fn draws_strobe(&self) -> bool {
        matches!(self, PerformanceTier::High)
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Performance tier from the host's device detection
    pub tier: PerformanceTier,

    // === Audio ===
    /// Master bus gain (0.0 - 1.0)
    pub master_volume: f32,
    /// Mute all audio
    pub muted: bool,

    /// Fixed RNG seed (random per session when unset)
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tier: PerformanceTier::High,
            master_volume: 0.3,
            muted: false,
            seed: None,
        }
    }
}

impl Settings {
    /// Create settings for a tier
    pub fn from_tier(tier: PerformanceTier) -> Self {
        Self {
            tier,
            ..Self::default()
        }
    }

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Effective master gain (0 when muted)
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume.clamp(0.0, 1.0)
        }
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "riff_shooter_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring malformed settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse() {
        assert_eq!(PerformanceTier::from_str("LOW"), Some(PerformanceTier::Low));
        assert_eq!(PerformanceTier::from_str("med"), Some(PerformanceTier::Medium));
        assert_eq!(PerformanceTier::from_str("ultra"), None);
    }

    #[test]
    fn test_constrained_profile() {
        assert!(PerformanceTier::Low.is_constrained());
        assert!(PerformanceTier::Medium.is_constrained());
        assert!(!PerformanceTier::High.is_constrained());
        assert_eq!(PerformanceTier::Medium.glow_cooldown_ms(), 2000.0);
        assert_eq!(PerformanceTier::High.glow_decay_rate(), 0.008);
        assert_eq!(PerformanceTier::Low.beat_interval_ms(), None);
    }

    #[test]
    fn test_settings_json_defaults() {
        let settings = Settings::from_json(r#"{"tier":"Medium"}"#).unwrap();
        assert_eq!(settings.tier, PerformanceTier::Medium);
        assert!((settings.master_volume - 0.3).abs() < 1e-6);
        assert!(settings.seed.is_none());
    }

    #[test]
    fn test_muted_volume() {
        let settings = Settings {
            muted: true,
            ..Settings::default()
        };
        assert_eq!(settings.effective_volume(), 0.0);
    }
}
