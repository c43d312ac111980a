//! End-to-end sessions through the public API

use rand::SeedableRng;
use rand_pcg::Pcg32;

use riff_shooter::audio::OfflineBackend;
use riff_shooter::sim::{CanvasSize, GameState, JoystickInput, KeyState, TickInput, tick};
use riff_shooter::{FrameScheduler, FrameSnapshot, Game, PerformanceTier, Settings};

const FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Default)]
struct ImmediateScheduler {
    next: i32,
    pending: Option<i32>,
}

impl FrameScheduler for ImmediateScheduler {
    fn request_frame(&mut self) -> i32 {
        self.next += 1;
        self.pending = Some(self.next);
        self.next
    }

    fn cancel_frame(&mut self, id: i32) {
        if self.pending == Some(id) {
            self.pending = None;
        }
    }
}

fn scripted(frame: u32) -> TickInput {
    let phase = frame % 180;
    TickInput {
        keys: KeyState {
            left: phase < 45,
            right: (90..135).contains(&phase),
            up: phase % 60 < 10,
            ..Default::default()
        },
        joystick: if (45..60).contains(&phase) {
            JoystickInput::new(-0.5, 0.9)
        } else {
            JoystickInput::default()
        },
        fire_held: phase % 2 == 0,
        fire_pressed: frame % 50 == 0,
        now_ms: frame as f64 * FRAME_MS,
    }
}

fn new_game(tier: PerformanceTier, seed: u64) -> Game<OfflineBackend> {
    let settings = Settings {
        seed: Some(seed),
        ..Settings::from_tier(tier)
    };
    Game::new(settings, Some(CanvasSize::default()), Some(OfflineBackend::default())).unwrap()
}

#[test]
fn lighting_and_audio_do_not_perturb_gameplay() {
    let seed = 99;
    let mut game = new_game(PerformanceTier::High, seed);
    let mut sched = ImmediateScheduler::default();
    game.unlock_audio();
    game.start_game(&mut sched);

    let mut bare = GameState::new(CanvasSize::default(), PerformanceTier::High);
    bare.start();
    let mut rng = Pcg32::seed_from_u64(seed);

    for frame in 0..900 {
        if !game.is_running() {
            break;
        }
        let input = scripted(frame);
        game.frame(&input, &mut sched);
        tick(&mut bare, &input, &mut rng);
    }

    let state = game.state();
    assert_eq!(state.score, bare.score);
    assert_eq!(state.lives, bare.lives);
    assert_eq!(state.time_ticks, bare.time_ticks);
    assert_eq!(state.store.player.pos, bare.store.player.pos);
    let enemies: Vec<_> = state.store.enemies.iter().map(|e| e.pos).collect();
    let bare_enemies: Vec<_> = bare.store.enemies.iter().map(|e| e.pos).collect();
    assert_eq!(enemies, bare_enemies);
}

#[test]
fn same_seed_same_session() {
    let run = |seed| {
        let mut game = new_game(PerformanceTier::Medium, seed);
        let mut sched = ImmediateScheduler::default();
        game.start_game(&mut sched);
        for frame in 0..600 {
            game.frame(&scripted(frame), &mut sched);
        }
        let snap = game.snapshot();
        (snap.score, snap.lives, snap.bullets.len(), snap.enemies.len())
    };
    assert_eq!(run(5), run(5));
}

#[test]
fn audio_follows_the_session() {
    let mut game = new_game(PerformanceTier::High, 3);
    let mut sched = ImmediateScheduler::default();
    assert_eq!(game.snapshot().audio, "suspended");
    assert!(game.unlock_audio());
    game.start_game(&mut sched);

    // Diagonal movement plays gear and engine together
    let diagonal = TickInput {
        keys: KeyState {
            left: true,
            up: true,
            ..Default::default()
        },
        fire_pressed: true,
        ..Default::default()
    };
    game.frame(&diagonal, &mut sched);
    assert!(game.audio().has_gear());
    assert!(game.audio().has_engine());
    assert!(game.audio().engine_timbre().is_some());

    let played = game.audio().backend().unwrap().played();
    assert!(played.iter().any(|n| n.starts_with("shoot")));
    assert!(played.contains(&"gear"));

    game.pause(&mut sched);
    assert_eq!(game.snapshot().audio, "suspended");
    assert!(!game.audio().has_gear());
    game.resume(&mut sched);
    assert_eq!(game.snapshot().audio, "running");

    game.stop(&mut sched);
    assert!(sched.pending.is_none());
    let backend = game.audio_mut().backend_mut().unwrap();
    backend.advance(2.0);
    assert_eq!(backend.active_voices(), 0);
}

#[test]
fn shutdown_closes_audio() {
    let mut game = new_game(PerformanceTier::Low, 8);
    let mut sched = ImmediateScheduler::default();
    game.unlock_audio();
    game.start_game(&mut sched);
    game.shutdown(&mut sched);
    assert_eq!(game.snapshot().audio, "closed");
    assert!(!game.is_running());

    // Triggers after close are silent no-ops
    game.audio_mut().play_shoot();
    assert_eq!(game.audio().backend().unwrap().active_voices(), 0);
}

#[test]
fn snapshot_json_reaches_a_renderer() {
    let mut game = new_game(PerformanceTier::High, 21);
    let mut sched = ImmediateScheduler::default();
    game.start_game(&mut sched);
    for frame in 0..120 {
        game.frame(&scripted(frame), &mut sched);
    }
    let json = game.snapshot().to_json().unwrap();
    let parsed: FrameSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.score, game.state().score);
    assert_eq!(parsed.spotlights.len(), 8);
    assert_eq!(parsed.enemies.len(), game.snapshot().enemies.len());
}

#[test]
fn settings_from_json_drive_the_game() {
    let settings = Settings::from_json(r#"{"tier":"Low","muted":true,"seed":4}"#).unwrap();
    let game: Game<OfflineBackend> =
        Game::new(settings, Some(CanvasSize::default()), Some(OfflineBackend::default())).unwrap();
    assert_eq!(game.seed(), 4);
    assert_eq!(game.audio().backend().unwrap().master_gain(), 0.0);
    assert_eq!(game.snapshot().hints.canvas_scale, 0.8);
}
