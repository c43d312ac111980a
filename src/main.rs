//! Riff Shooter entry point
//!
//! The browser build wires the canvas, keyboard, on-screen controls and
//! animation frames to a [`Game`]. The native build plays a scripted
//! headless session against the offline audio backend and logs the result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, KeyboardEvent};

    use riff_shooter::audio::web::WebAudioBackend;
    use riff_shooter::sim::{CanvasSize, JoystickInput, TickInput};
    use riff_shooter::{FrameScheduler, Game, Settings};

    // Snapshot hand-off to the page's renderer
    #[wasm_bindgen(inline_js = "
        export function render_frame(json) {
            if (typeof window.renderRiffShooter === 'function') {
                window.renderRiffShooter(JSON.parse(json));
            }
        }
    ")]
    extern "C" {
        fn render_frame(json: &str);
    }

    /// `requestAnimationFrame` scheduler that re-enters the loop
    struct RafScheduler {
        window: web_sys::Window,
        session: Weak<RefCell<Session>>,
    }

    impl FrameScheduler for RafScheduler {
        fn request_frame(&mut self) -> i32 {
            let session = self.session.clone();
            let closure = Closure::once(move |time: f64| {
                if let Some(session) = session.upgrade() {
                    game_loop(session, time);
                }
            });
            let id = self
                .window
                .request_animation_frame(closure.as_ref().unchecked_ref())
                .unwrap_or(0);
            closure.forget();
            id
        }

        fn cancel_frame(&mut self, id: i32) {
            let _ = self.window.cancel_animation_frame(id);
        }
    }

    struct Session {
        game: Game<WebAudioBackend>,
        input: TickInput,
        scheduler: RafScheduler,
    }

    thread_local! {
        static SESSION: RefCell<Option<Rc<RefCell<Session>>>> = const { RefCell::new(None) };
    }

    fn with_session<T>(f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        SESSION.with(|cell| {
            let session = cell.borrow().clone()?;
            let mut s = session.borrow_mut();
            Some(f(&mut s))
        })
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Riff Shooter starting...");

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        let settings = Settings::load();
        let canvas: Option<HtmlCanvasElement> = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into().ok());
        let canvas_size = canvas.as_ref().map(|canvas| {
            let scale = settings.tier.canvas_scale();
            let width = (canvas.client_width() as f32 * scale).round();
            let height = (canvas.client_height() as f32 * scale).round();
            canvas.set_width(width as u32);
            canvas.set_height(height as u32);
            CanvasSize::new(width, height)
        });

        let audio = WebAudioBackend::new().ok();
        let game = match Game::new(settings, canvas_size, audio) {
            Ok(game) => game,
            Err(e) => {
                log::error!("Failed to start: {}", e);
                return;
            }
        };

        let session = Rc::new_cyclic(|weak| {
            RefCell::new(Session {
                game,
                input: TickInput::default(),
                scheduler: RafScheduler {
                    window: window.clone(),
                    session: weak.clone(),
                },
            })
        });
        SESSION.with(|cell| *cell.borrow_mut() = Some(session.clone()));

        setup_keyboard(session.clone());
        setup_gesture_unlock(session.clone());
        setup_auto_pause(session);

        log::info!("Riff Shooter ready");
    }

    fn game_loop(session: Rc<RefCell<Session>>, time: f64) {
        let mut s = session.borrow_mut();
        let Session {
            game,
            input,
            scheduler,
        } = &mut *s;
        input.now_ms = time;
        game.frame(input, scheduler);
        input.fire_pressed = false;

        match game.snapshot().to_json() {
            Ok(json) => render_frame(&json),
            Err(e) => log::warn!("Snapshot failed: {}", e),
        }
    }

    fn setup_keyboard(session: Rc<RefCell<Session>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        {
            let session = session.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut s = session.borrow_mut();
                let input = &mut s.input;
                match event.key().as_str() {
                    "ArrowLeft" => input.keys.left = true,
                    "ArrowRight" => input.keys.right = true,
                    "ArrowUp" => input.keys.up = true,
                    "ArrowDown" => input.keys.down = true,
                    " " => {
                        event.prevent_default();
                        if !event.repeat() {
                            input.fire_pressed = true;
                        }
                        input.keys.fire = true;
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut s = session.borrow_mut();
                let keys = &mut s.input.keys;
                match event.key().as_str() {
                    "ArrowLeft" => keys.left = false,
                    "ArrowRight" => keys.right = false,
                    "ArrowUp" => keys.up = false,
                    "ArrowDown" => keys.down = false,
                    " " => keys.fire = false,
                    _ => {}
                }
            });
            let _ =
                window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Audio may only start inside a user gesture
    fn setup_gesture_unlock(session: Rc<RefCell<Session>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        for event in ["pointerdown", "touchstart", "keydown"] {
            let session = session.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let mut s = session.borrow_mut();
                if !s.game.audio().is_unlocked() {
                    s.game.unlock_audio();
                }
            });
            let _ =
                window.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_auto_pause(session: Rc<RefCell<Session>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut s = session.borrow_mut();
            let Session { game, scheduler, .. } = &mut *s;
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                game.auto_pause(scheduler);
            } else {
                game.auto_resume(scheduler);
            }
        });
        let _ = document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // === Exports for the page's controls ===

    #[wasm_bindgen]
    pub fn start_game() {
        with_session(|s| s.game.start_game(&mut s.scheduler));
    }

    #[wasm_bindgen]
    pub fn pause_game() {
        with_session(|s| s.game.pause(&mut s.scheduler));
    }

    #[wasm_bindgen]
    pub fn resume_game() {
        with_session(|s| s.game.resume(&mut s.scheduler));
    }

    #[wasm_bindgen]
    pub fn stop_game() {
        with_session(|s| s.game.stop(&mut s.scheduler));
    }

    /// Normalized joystick vector, each axis in [-1, 1]
    #[wasm_bindgen]
    pub fn joystick_move(x: f32, y: f32) {
        with_session(|s| s.input.joystick = JoystickInput::new(x, y));
    }

    #[wasm_bindgen]
    pub fn joystick_release() {
        with_session(|s| s.input.joystick = JoystickInput::default());
    }

    #[wasm_bindgen]
    pub fn shoot_button(pressed: bool) {
        with_session(|s| s.input.fire_held = pressed);
    }

    #[wasm_bindgen]
    pub fn unlock_audio() -> bool {
        with_session(|s| s.game.unlock_audio()).unwrap_or(false)
    }

    #[wasm_bindgen]
    pub fn test_audio() {
        with_session(|s| s.game.audio_mut().play_test_tone());
    }

    #[wasm_bindgen]
    pub fn audio_state() -> String {
        with_session(|s| s.game.audio().state_label().to_string())
            .unwrap_or_else(|| "unavailable".to_string())
    }

    #[wasm_bindgen]
    pub fn set_muted(muted: bool) {
        with_session(|s| {
            s.game.set_muted(muted);
            s.game.settings().save();
        });
    }

    #[wasm_bindgen]
    pub fn set_volume(volume: f32) {
        with_session(|s| {
            s.game.set_volume(volume);
            s.game.settings().save();
        });
    }

    #[wasm_bindgen]
    pub fn snapshot_json() -> String {
        with_session(|s| s.game.snapshot().to_json().unwrap_or_default()).unwrap_or_default()
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use riff_shooter::audio::{AudioBackend, OfflineBackend};
    use riff_shooter::sim::{CanvasSize, JoystickInput, KeyState, TickInput};
    use riff_shooter::{FrameScheduler, Game, PerformanceTier, Settings};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    const DEFAULT_FRAMES: u32 = 3600;

    /// Frames fire immediately; only counts requests
    #[derive(Default)]
    struct CountingScheduler {
        requested: i32,
        outstanding: Option<i32>,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&mut self) -> i32 {
            self.requested += 1;
            self.outstanding = Some(self.requested);
            self.requested
        }

        fn cancel_frame(&mut self, id: i32) {
            if self.outstanding == Some(id) {
                self.outstanding = None;
            }
        }
    }

    /// Sweep left and right, dive now and then, hold fire most of the time
    fn scripted_input(frame: u32) -> TickInput {
        let phase = frame % 240;
        let keys = KeyState {
            left: phase < 60,
            right: (120..180).contains(&phase),
            ..Default::default()
        };
        let joystick = if (60..90).contains(&phase) {
            JoystickInput::new(0.7, -0.7)
        } else {
            JoystickInput::default()
        };
        TickInput {
            keys,
            joystick,
            fire_held: phase % 80 < 60,
            fire_pressed: frame % 97 == 0,
            now_ms: frame as f64 * FRAME_MS,
        }
    }

    pub fn run(args: &[String]) {
        let tier = args
            .get(1)
            .and_then(|s| PerformanceTier::from_str(s))
            .unwrap_or_default();
        let frames = args
            .get(2)
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FRAMES);

        let settings = Settings {
            seed: Some(0x5EED),
            ..Settings::from_tier(tier)
        };
        let mut game = match Game::new(
            settings,
            Some(CanvasSize::default()),
            Some(OfflineBackend::default()),
        ) {
            Ok(game) => game,
            Err(e) => {
                log::error!("Failed to start: {}", e);
                return;
            }
        };
        let mut scheduler = CountingScheduler::default();

        game.unlock_audio();
        game.start_game(&mut scheduler);

        let mut played = 0;
        let mut major = 0;
        let mut minor = 0;
        while played < frames && scheduler.outstanding.take().is_some() {
            let events = game.frame(&scripted_input(played), &mut scheduler);
            major += u32::from(events.effects.major_triggered);
            minor += u32::from(events.effects.minor_triggered);
            if let Some(backend) = game.audio_mut().backend_mut() {
                backend.advance(FRAME_MS / 1000.0);
            }
            played += 1;
        }

        let state = game.state();
        log::info!(
            "Session over after {} frames ({} tier): score {}, lives {}, game over: {}",
            played,
            tier.as_str(),
            state.score,
            state.lives,
            state.is_over()
        );
        log::info!("Glows: {} major, {} minor", major, minor);
        if let Some(backend) = game.audio().backend() {
            log::info!(
                "Audio: {} voices started, {} still sounding, clock {:.2}s",
                backend.played().len(),
                backend.active_voices(),
                backend.current_time()
            );
        }

        game.shutdown(&mut scheduler);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Riff Shooter (native) starting headless demo...");

    let args: Vec<String> = std::env::args().collect();
    headless::run(&args);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
