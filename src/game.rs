//! Game session and frame loop
//!
//! [`Game`] ties the simulation, audio and lighting together. The host
//! owns the actual animation-frame mechanism and lends it to the game
//! through [`FrameScheduler`]; the game only asks for the next frame while
//! a session is running.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::audio::{AudioBackend, AudioEngine};
use crate::consts::{PLAYER_HEIGHT, PLAYER_WIDTH};
use crate::error::InitError;
use crate::lighting::Director;
use crate::settings::Settings;
use crate::sim::{CanvasSize, GamePhase, GameState, TickEvents, TickInput, tick};
use crate::snapshot::FrameSnapshot;

/// Offsets separating the per-subsystem RNG streams
const LIGHTING_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;
const AUDIO_SEED_SALT: u64 = 0xD1B5_4A32_D192_ED03;

/// Host frame callback mechanism (`requestAnimationFrame` in a browser)
pub trait FrameScheduler {
    /// Ask for one more frame; returns the request id
    fn request_frame(&mut self) -> i32;

    fn cancel_frame(&mut self, id: i32);
}

/// A game session
pub struct Game<B: AudioBackend> {
    settings: Settings,
    state: GameState,
    audio: AudioEngine<B>,
    lights: Director,
    /// Gameplay randomness (spawns, colors, shot spread, effects)
    rng: Pcg32,
    seed: u64,
    pending_frame: Option<i32>,
    /// Paused by the host (tab hidden) rather than by the player
    auto_paused: bool,
}

impl<B: AudioBackend> Game<B> {
    /// Create a session. A missing or degenerate canvas is fatal; a missing
    /// audio backend is not.
    pub fn new(
        settings: Settings,
        canvas: Option<CanvasSize>,
        audio: Option<B>,
    ) -> Result<Self, InitError> {
        let Some(canvas) = canvas else {
            log::error!("No canvas to draw on");
            return Err(InitError::SurfaceUnavailable("canvas not found".to_string()));
        };
        let too_small = !(canvas.width >= PLAYER_WIDTH && canvas.height >= PLAYER_HEIGHT);
        if too_small || !canvas.width.is_finite() || !canvas.height.is_finite() {
            log::error!("Canvas {}x{} cannot hold the stage", canvas.width, canvas.height);
            return Err(InitError::InvalidCanvas {
                width: canvas.width,
                height: canvas.height,
            });
        }

        let seed = settings.seed.unwrap_or_else(rand::random);
        let tier = settings.tier;
        log::info!(
            "Game initialized: {}x{} canvas, {} tier, seed {}",
            canvas.width,
            canvas.height,
            tier.as_str(),
            seed
        );

        Ok(Self {
            state: GameState::new(canvas, tier),
            audio: AudioEngine::new(audio, &settings, seed ^ AUDIO_SEED_SALT),
            lights: Director::new(tier, canvas, seed ^ LIGHTING_SEED_SALT),
            rng: Pcg32::seed_from_u64(seed),
            seed,
            settings,
            pending_frame: None,
            auto_paused: false,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn audio(&self) -> &AudioEngine<B> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioEngine<B> {
        &mut self.audio
    }

    pub fn lights(&self) -> &Director {
        &self.lights
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether the loop should keep running
    pub fn is_running(&self) -> bool {
        self.state.phase == GamePhase::Playing
    }

    /// Id of the outstanding frame request, if any
    pub fn pending_frame(&self) -> Option<i32> {
        self.pending_frame
    }

    /// Call from the earliest user-gesture handler
    pub fn unlock_audio(&mut self) -> bool {
        let unlocked = self.audio.unlock();
        if unlocked && self.is_running() {
            self.audio.start_background_bed();
        }
        unlocked
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.settings.master_volume = volume.clamp(0.0, 1.0);
        self.audio.apply_settings(&self.settings);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.settings.muted = muted;
        self.audio.apply_settings(&self.settings);
    }

    /// Begin a fresh session, resetting every session field
    pub fn start_game(&mut self, scheduler: &mut impl FrameScheduler) {
        self.cancel_frame(scheduler);
        self.audio.stop_all();
        self.auto_paused = false;

        self.state.start();
        self.lights.init();
        // A restart from pause finds the context suspended
        self.audio.resume();
        self.audio.play_game_start();
        self.audio.start_background_bed();

        log::info!("Game started");
        self.request_frame(scheduler);
    }

    /// Run one frame: simulation tick, audio reactions, lighting. Requests
    /// the next frame while the session is still running.
    pub fn frame(&mut self, input: &TickInput, scheduler: &mut impl FrameScheduler) -> TickEvents {
        // The request that brought us here has fired
        self.pending_frame = None;
        if !self.is_running() {
            return TickEvents::default();
        }

        let events = tick(&mut self.state, input, &mut self.rng);

        for kind in &events.shots {
            log::debug!("Fired {:?}", kind);
            self.audio.play_shoot();
        }
        self.audio
            .update_movement(events.displacement, self.state.tier.movement_epsilon());

        self.lights.update(input.now_ms);

        if events.game_over {
            self.stop(scheduler);
        } else {
            self.request_frame(scheduler);
        }
        events
    }

    /// Suspend the loop and audio output
    pub fn pause(&mut self, scheduler: &mut impl FrameScheduler) {
        if self.state.phase != GamePhase::Playing {
            return;
        }
        self.auto_paused = false;
        self.state.phase = GamePhase::Paused;
        self.cancel_frame(scheduler);
        self.audio.update_movement(glam::Vec2::ZERO, 0.0);
        self.audio.suspend();
        log::info!("Game paused");
    }

    /// Pause on behalf of the host, e.g. when the page is hidden. Only a
    /// pause taken this way is undone by [`Game::auto_resume`].
    pub fn auto_pause(&mut self, scheduler: &mut impl FrameScheduler) {
        if self.state.phase != GamePhase::Playing {
            return;
        }
        self.pause(scheduler);
        self.auto_paused = true;
        log::info!("Auto-paused");
    }

    /// Undo an [`Game::auto_pause`]; a pause the player asked for stays
    pub fn auto_resume(&mut self, scheduler: &mut impl FrameScheduler) {
        if std::mem::take(&mut self.auto_paused) {
            self.resume(scheduler);
        }
    }

    pub fn resume(&mut self, scheduler: &mut impl FrameScheduler) {
        if self.state.phase != GamePhase::Paused {
            return;
        }
        self.auto_paused = false;
        self.state.phase = GamePhase::Playing;
        self.audio.resume();
        self.lights.resume();
        log::info!("Game resumed");
        self.request_frame(scheduler);
    }

    /// Halt the session: cancel the pending frame, fade out every voice,
    /// stop the beat and drop queued effect spawns. An active session ends
    /// as game over.
    pub fn stop(&mut self, scheduler: &mut impl FrameScheduler) {
        self.cancel_frame(scheduler);
        self.audio.stop_all();
        self.lights.cancel();
        self.state.effects.pending.clear();
        self.auto_paused = false;
        if matches!(self.state.phase, GamePhase::Playing | GamePhase::Paused) {
            self.state.phase = GamePhase::GameOver;
        }
        log::info!("Game stopped - score {}", self.state.score);
    }

    /// Stop and release the audio output for good
    pub fn shutdown(&mut self, scheduler: &mut impl FrameScheduler) {
        self.stop(scheduler);
        self.audio.close();
    }

    /// Current frame for the renderer
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot::capture(&self.state, &self.lights, self.audio.state_label())
    }

    fn request_frame(&mut self, scheduler: &mut impl FrameScheduler) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(scheduler.request_frame());
        }
    }

    fn cancel_frame(&mut self, scheduler: &mut impl FrameScheduler) {
        if let Some(id) = self.pending_frame.take() {
            scheduler.cancel_frame(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OfflineBackend;
    use crate::settings::PerformanceTier;
    use crate::sim::KeyState;

    #[derive(Default)]
    struct TestScheduler {
        next: i32,
        outstanding: Vec<i32>,
        cancelled: Vec<i32>,
    }

    impl FrameScheduler for TestScheduler {
        fn request_frame(&mut self) -> i32 {
            self.next += 1;
            self.outstanding.push(self.next);
            self.next
        }

        fn cancel_frame(&mut self, id: i32) {
            self.outstanding.retain(|&o| o != id);
            self.cancelled.push(id);
        }
    }

    fn settings(tier: PerformanceTier) -> Settings {
        Settings {
            seed: Some(42),
            ..Settings::from_tier(tier)
        }
    }

    fn new_game(tier: PerformanceTier) -> Game<OfflineBackend> {
        Game::new(
            settings(tier),
            Some(CanvasSize::default()),
            Some(OfflineBackend::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_canvas_is_fatal() {
        let result: Result<Game<OfflineBackend>, _> =
            Game::new(Settings::default(), None, Some(OfflineBackend::default()));
        assert!(matches!(result, Err(InitError::SurfaceUnavailable(_))));

        let result: Result<Game<OfflineBackend>, _> =
            Game::new(Settings::default(), Some(CanvasSize::new(0.0, 600.0)), None);
        assert!(matches!(result, Err(InitError::InvalidCanvas { .. })));
    }

    #[test]
    fn test_missing_audio_runs_silently() {
        let mut game: Game<OfflineBackend> =
            Game::new(settings(PerformanceTier::High), Some(CanvasSize::default()), None).unwrap();
        let mut sched = TestScheduler::default();
        assert!(!game.unlock_audio());
        game.start_game(&mut sched);
        let input = TickInput {
            fire_pressed: true,
            ..Default::default()
        };
        let events = game.frame(&input, &mut sched);
        assert_eq!(events.shots.len(), 1);
        assert_eq!(game.snapshot().audio, "unavailable");
    }

    #[test]
    fn test_frame_requests_next_only_while_running() {
        let mut game = new_game(PerformanceTier::Medium);
        let mut sched = TestScheduler::default();

        // Not started: nothing happens and nothing is requested
        game.frame(&TickInput::default(), &mut sched);
        assert!(sched.outstanding.is_empty());

        game.start_game(&mut sched);
        assert_eq!(sched.outstanding.len(), 1);
        game.frame(&TickInput::default(), &mut sched);
        assert_eq!(game.pending_frame(), Some(2));

        game.pause(&mut sched);
        assert_eq!(game.pending_frame(), None);
        assert_eq!(sched.cancelled, vec![2]);
        let events = game.frame(&TickInput::default(), &mut sched);
        assert_eq!(events.displacement, glam::Vec2::ZERO);
        assert_eq!(game.state().time_ticks, 1);

        game.resume(&mut sched);
        assert!(game.is_running());
        assert!(game.pending_frame().is_some());
    }

    #[test]
    fn test_start_game_plays_fanfare_and_bed() {
        let mut game = new_game(PerformanceTier::High);
        let mut sched = TestScheduler::default();
        assert!(game.unlock_audio());
        game.start_game(&mut sched);

        let played = game.audio().backend().unwrap().played();
        assert_eq!(played, vec!["unlock chirp", "game start", "background bed"]);
        assert_eq!(game.lights().spotlights.len(), 8);
        assert_eq!(game.snapshot().audio, "running");
    }

    #[test]
    fn test_movement_drives_engine_audio() {
        let mut game = new_game(PerformanceTier::High);
        let mut sched = TestScheduler::default();
        game.unlock_audio();
        game.start_game(&mut sched);

        let up = TickInput {
            keys: KeyState {
                up: true,
                ..Default::default()
            },
            ..Default::default()
        };
        game.frame(&up, &mut sched);
        game.frame(&up, &mut sched);
        assert!(game.audio().has_engine());
        assert!(!game.audio().has_gear());

        game.frame(&TickInput::default(), &mut sched);
        assert!(!game.audio().has_engine());
    }

    #[test]
    fn test_stop_tears_everything_down() {
        let mut game = new_game(PerformanceTier::High);
        let mut sched = TestScheduler::default();
        game.unlock_audio();
        game.start_game(&mut sched);
        game.state.effects.pending.push(3, crate::sim::effects::PendingSpawn::Ripple);

        game.stop(&mut sched);
        assert!(sched.outstanding.is_empty());
        assert!(!game.audio().has_bed());
        assert!(!game.lights().has_beat());
        assert!(game.state().effects.pending.is_empty());
        assert!(game.state().is_over());
    }

    #[test]
    fn test_restart_resets_session() {
        let mut game = new_game(PerformanceTier::Low);
        let mut sched = TestScheduler::default();
        game.start_game(&mut sched);
        let fire = TickInput {
            fire_pressed: true,
            ..Default::default()
        };
        game.frame(&fire, &mut sched);
        game.frame(&fire, &mut sched);
        assert_eq!(game.state().store.shot_count, 2);

        game.start_game(&mut sched);
        assert_eq!(game.state().store.shot_count, 0);
        assert_eq!(game.state().lives, 5);
        assert_eq!(game.state().score, 0);
        assert_eq!(sched.outstanding.len(), 1);
    }

    #[test]
    fn test_restart_from_pause_is_audible() {
        let mut game = new_game(PerformanceTier::High);
        let mut sched = TestScheduler::default();
        game.unlock_audio();
        game.start_game(&mut sched);
        game.pause(&mut sched);
        assert_eq!(game.audio().state_label(), "suspended");

        game.start_game(&mut sched);
        assert!(game.is_running());
        assert_eq!(game.audio().state_label(), "running");
        assert!(game.audio().has_bed());
        let fanfares = game
            .audio()
            .backend()
            .unwrap()
            .played()
            .iter()
            .filter(|n| **n == "game start")
            .count();
        assert_eq!(fanfares, 2);
    }

    #[test]
    fn test_auto_resume_only_undoes_auto_pause() {
        let mut game = new_game(PerformanceTier::Medium);
        let mut sched = TestScheduler::default();
        game.start_game(&mut sched);

        game.auto_pause(&mut sched);
        assert_eq!(game.state().phase, GamePhase::Paused);
        game.auto_resume(&mut sched);
        assert!(game.is_running());

        // The player paused, then the page was hidden and shown again
        game.pause(&mut sched);
        game.auto_pause(&mut sched);
        game.auto_resume(&mut sched);
        assert_eq!(game.state().phase, GamePhase::Paused);
        assert_eq!(game.pending_frame(), None);

        // A restart clears a stale auto-pause
        game.resume(&mut sched);
        game.auto_pause(&mut sched);
        game.start_game(&mut sched);
        game.pause(&mut sched);
        game.auto_resume(&mut sched);
        assert_eq!(game.state().phase, GamePhase::Paused);
    }

    #[test]
    fn test_volume_and_mute_reach_backend() {
        let mut game = new_game(PerformanceTier::High);
        game.set_volume(0.5);
        assert_eq!(game.audio().backend().unwrap().master_gain(), 0.5);
        game.set_muted(true);
        assert_eq!(game.audio().backend().unwrap().master_gain(), 0.0);
    }
}
