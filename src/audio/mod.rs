//! Procedural audio
//!
//! Every sound is synthesized from a [`graph::VoiceGraph`] recipe; no
//! sample files are needed. The [`AudioEngine`] owns the output backend,
//! the per-channel voice slots (gear, engine, background bed) and the
//! unlock state. Failures never reach the caller: they are logged and the
//! trigger becomes a no-op.

pub mod backend;
pub mod graph;
pub mod impulse;
pub mod movement;
pub mod recipes;
#[cfg(target_arch = "wasm32")]
pub mod web;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

pub use backend::{AudioBackend, Command, ContextState, OfflineBackend, VoiceHandle};
pub use graph::VoiceGraph;
pub use movement::MoveAxis;
pub use recipes::EngineTimbre;

use crate::error::AudioError;
use crate::settings::Settings;

/// Fade applied when a movement sound stops (seconds)
pub const MOVEMENT_FADE_SECS: f64 = 0.1;
/// Fade applied when the background bed stops (seconds)
pub const BED_FADE_SECS: f64 = 0.5;

/// Label reported when no output exists at all
pub const UNAVAILABLE_LABEL: &str = "unavailable";

/// Audio engine with explicit voice slots
pub struct AudioEngine<B: AudioBackend> {
    backend: Option<B>,
    rng: Pcg32,
    /// Set once the host reports a user gesture
    unlocked: bool,
    master_gain: f32,
    gear: Option<VoiceHandle>,
    engine: Option<(VoiceHandle, EngineTimbre)>,
    bed: Option<VoiceHandle>,
    movement: MoveAxis,
}

impl<B: AudioBackend> AudioEngine<B> {
    /// Wrap a backend. `None` means the platform has no audio output; the
    /// engine then stays silent.
    pub fn new(backend: Option<B>, settings: &Settings, seed: u64) -> Self {
        let mut engine = Self {
            backend,
            rng: Pcg32::seed_from_u64(seed),
            unlocked: false,
            master_gain: settings.effective_volume(),
            gear: None,
            engine: None,
            bed: None,
            movement: MoveAxis::None,
        };
        match engine.backend.as_mut() {
            Some(backend) => {
                backend.set_master_gain(engine.master_gain);
                log::info!(
                    "Audio initialized ({} Hz, {})",
                    backend.sample_rate(),
                    backend.state().as_str()
                );
            }
            None => log::warn!("No audio output - running silently"),
        }
        engine
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn state(&self) -> Option<ContextState> {
        self.backend.as_ref().map(AudioBackend::state)
    }

    /// Diagnostic label: "running", "suspended", "closed" or "unavailable"
    pub fn state_label(&self) -> &'static str {
        self.state().map_or(UNAVAILABLE_LABEL, |s| s.as_str())
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    /// Current movement classification
    pub fn movement(&self) -> MoveAxis {
        self.movement
    }

    /// Timbre of the engine voice, if one is playing
    pub fn engine_timbre(&self) -> Option<EngineTimbre> {
        self.engine.map(|(_, timbre)| timbre)
    }

    pub fn has_gear(&self) -> bool {
        self.gear.is_some()
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn has_bed(&self) -> bool {
        self.bed.is_some()
    }

    /// Resume output from inside a user-gesture handler and confirm with a
    /// short chirp. Returns true when audio is now running.
    pub fn unlock(&mut self) -> bool {
        let Some(backend) = self.backend.as_mut() else {
            log::warn!("Cannot unlock audio: no output");
            return false;
        };
        if let Err(e) = backend.resume() {
            log::warn!("Audio unlock failed: {}", e);
            return false;
        }
        self.unlocked = true;
        log::info!("Audio unlocked ({})", backend.state().as_str());
        self.spawn(recipes::unlock_chirp());
        true
    }

    /// Apply volume and mute from settings
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.master_gain = settings.effective_volume();
        if let Some(backend) = self.backend.as_mut() {
            backend.set_master_gain(self.master_gain);
        }
    }

    /// Guitar pluck on a random pentatonic note
    pub fn play_shoot(&mut self) {
        if !self.ready("shoot") {
            return;
        }
        let note = recipes::SHOOT_NOTES[self.rng.random_range(0..recipes::SHOOT_NOTES.len())];
        let sample_rate = self.sample_rate();
        let graph = recipes::shoot(note, sample_rate, &mut self.rng);
        log::debug!("Shoot note {:.2} Hz", note);
        self.spawn(graph);
    }

    pub fn play_game_start(&mut self) {
        if !self.ready("game start") {
            return;
        }
        self.spawn(recipes::game_start());
    }

    /// Diagnostic A4 tone
    pub fn play_test_tone(&mut self) {
        if !self.ready("test tone") {
            return;
        }
        self.spawn(recipes::test_tone());
    }

    /// Start the channels `axis` needs. Occupied channels are left alone.
    pub fn start_movement(&mut self, axis: MoveAxis) {
        if axis == MoveAxis::None || !self.ready("movement") {
            return;
        }
        if axis.uses_gear() && self.gear.is_none() {
            self.gear = self.spawn(recipes::gear());
        }
        if axis.uses_engine() && self.engine.is_none() {
            let timbre = EngineTimbre::random(&mut self.rng);
            let sample_rate = self.sample_rate();
            let graph = recipes::engine(timbre, sample_rate, &mut self.rng);
            log::debug!("Engine timbre: {}", timbre.as_str());
            self.engine = self.spawn(graph).map(|voice| (voice, timbre));
        }
    }

    /// Fade out and forget both movement channels
    pub fn stop_movement(&mut self) {
        if let Some(voice) = self.gear.take() {
            self.release(voice, MOVEMENT_FADE_SECS);
        }
        if let Some((voice, _)) = self.engine.take() {
            self.release(voice, MOVEMENT_FADE_SECS);
        }
        self.movement = MoveAxis::None;
    }

    /// Feed one tick's player displacement through the movement state
    /// machine. A change of axis stops the previous voices before the new
    /// ones start; staying on an axis refills any channel that failed to
    /// start.
    pub fn update_movement(&mut self, displacement: Vec2, epsilon: f32) {
        let axis = MoveAxis::classify(displacement, epsilon);
        if axis != self.movement {
            self.stop_movement();
        } else if !self.movement_missing(axis) {
            return;
        }
        self.start_movement(axis);
        self.movement = axis;
    }

    fn movement_missing(&self, axis: MoveAxis) -> bool {
        (axis.uses_gear() && self.gear.is_none()) || (axis.uses_engine() && self.engine.is_none())
    }

    /// Idempotent
    pub fn start_background_bed(&mut self) {
        if self.bed.is_some() || !self.ready("background bed") {
            return;
        }
        self.bed = self.spawn(recipes::background_bed());
        if self.bed.is_some() {
            log::info!("Background bed started");
        }
    }

    pub fn stop_background_bed(&mut self) {
        if let Some(voice) = self.bed.take() {
            self.release(voice, BED_FADE_SECS);
            log::info!("Background bed stopped");
        }
    }

    /// Stop every looping voice
    pub fn stop_all(&mut self) {
        self.stop_movement();
        self.stop_background_bed();
    }

    pub fn suspend(&mut self) {
        if let Some(backend) = self.backend.as_mut() {
            if let Err(e) = backend.suspend() {
                log::warn!("Audio suspend failed: {}", e);
            }
        }
    }

    /// Resume after `suspend`. Does nothing before the first unlock.
    pub fn resume(&mut self) {
        if !self.unlocked {
            return;
        }
        if let Some(backend) = self.backend.as_mut() {
            if let Err(e) = backend.resume() {
                log::warn!("Audio resume failed: {}", e);
            }
        }
    }

    /// Stop everything and release the output for good
    pub fn close(&mut self) {
        self.stop_all();
        if let Some(backend) = self.backend.as_mut() {
            if let Err(e) = backend.close() {
                log::warn!("Audio close failed: {}", e);
            }
        }
        self.unlocked = false;
    }

    fn sample_rate(&self) -> f32 {
        self.backend.as_ref().map_or(44_100.0, AudioBackend::sample_rate)
    }

    fn ready(&self, what: &str) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            log::debug!("Skipping {}: no audio output", what);
            return false;
        };
        if !self.unlocked {
            log::debug!("Skipping {}: audio locked", what);
            return false;
        }
        let state = backend.state();
        if state != ContextState::Running {
            log::debug!("Skipping {}: audio {}", what, state.as_str());
            return false;
        }
        true
    }

    fn spawn(&mut self, graph: VoiceGraph) -> Option<VoiceHandle> {
        let backend = self.backend.as_mut()?;
        match backend.play(&graph) {
            Ok(voice) => Some(voice),
            Err(e) => {
                log::warn!("Failed to play {}: {}", graph.name, e);
                None
            }
        }
    }

    fn release(&mut self, voice: VoiceHandle, fade: f64) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        if let Err(e) = backend.release(voice, fade) {
            // Already finished or torn down with the context
            if !matches!(e, AudioError::UnknownVoice(_)) {
                log::warn!("Failed to release voice {}: {}", voice.0, e);
            }
        }
    }
}
