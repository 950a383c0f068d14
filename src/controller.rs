//! Controller loop - the single owner of gaze state and command dispatch
//!
//! One `tick` per rendered frame: drain control events, drain the command
//! queue completely, then run the gaze controller against the tick's
//! landmark frame. Queued commands always apply before gaze runs, so a
//! "stop tracking" takes effect in the very tick it is drained. The loop
//! never blocks on I/O; everything slow lives on the listener threads.

use std::sync::PoisonError;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::command::Command;
use crate::config::Config;
use crate::gaze::{GazeController, GazeState};
use crate::inject::{Key, SharedInjector};
use crate::keyboard::KeyboardWidget;
use crate::landmarks::LandmarkSource;
use crate::listen::VoiceEngine;
use crate::oskb::SystemKeyboard;
use crate::speech::Feedback;
use crate::state::SharedState;

/// Scroll commands repeat the key press for a noticeable jump.
const SCROLL_REPEAT: usize = 3;

/// Platform/UI events that mutate core state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Manually activate command mode (spacebar in the loop driver)
    ForceWake,
    /// Re-run microphone calibration
    Calibrate,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Quit,
}

/// Read-only view of controller state for the presentation layer.
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub tracking_enabled: bool,
    pub pointer: (f32, f32),
    pub holding_click: bool,
    pub blink_detected: bool,
    pub blink_count: u64,
    pub wake_word_active: bool,
    pub wake_remaining: Option<Duration>,
    pub typing_mode: bool,
    pub voice_feedback_enabled: bool,
    pub actively_listening: bool,
    pub last_heard: String,
}

pub struct Controller {
    state: SharedState,
    engine: VoiceEngine,
    gaze: GazeController,
    gaze_state: GazeState,
    commands: flume::Receiver<Command>,
    events: flume::Receiver<ControlEvent>,
    landmarks: Box<dyn LandmarkSource>,
    injector: SharedInjector,
    keyboard: Option<Box<dyn KeyboardWidget>>,
    oskb: SystemKeyboard,
    feedback: Feedback,
}

impl Controller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &Config,
        state: SharedState,
        engine: VoiceEngine,
        commands: flume::Receiver<Command>,
        events: flume::Receiver<ControlEvent>,
        landmarks: Box<dyn LandmarkSource>,
        injector: SharedInjector,
        feedback: Feedback,
        screen: (f32, f32),
    ) -> Self {
        Self {
            state,
            engine,
            gaze: GazeController::new(config.gaze.clone(), screen),
            gaze_state: GazeState::default(),
            commands,
            events,
            landmarks,
            injector,
            keyboard: None,
            oskb: SystemKeyboard::from_config(&config.oskb),
            feedback,
        }
    }

    /// Attach the presentation layer's on-screen keyboard widget.
    pub fn with_keyboard_widget(mut self, widget: Box<dyn KeyboardWidget>) -> Self {
        self.keyboard = Some(widget);
        self
    }

    pub fn tick(&mut self, now: Instant) -> Tick {
        let events: Vec<ControlEvent> = self.events.try_iter().collect();
        for event in events {
            match event {
                ControlEvent::Quit => return Tick::Quit,
                ControlEvent::ForceWake => self.engine.force_wake(),
                ControlEvent::Calibrate => self.engine.calibrate(),
            }
        }

        let pending: Vec<Command> = self.commands.try_iter().collect();
        for command in pending {
            self.apply(command);
        }

        let frame = self.landmarks.next_frame();
        let mut injector = self.injector.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.gaze.process(
            now,
            frame.as_ref(),
            self.keyboard.as_deref_mut(),
            &mut self.gaze_state,
            &mut *injector,
        ) {
            eprintln!("[gaze] {e}");
        }

        Tick::Continue
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Track => self.gaze_state.tracking_enabled = true,
            Command::StopTracking => self.gaze_state.tracking_enabled = false,
            Command::RightClick => self.inject(|inj| inj.right_click()),
            Command::DoubleClick => self.inject(|inj| inj.double_click()),
            Command::ScrollUp => {
                for _ in 0..SCROLL_REPEAT {
                    self.inject(|inj| inj.press(Key::PageUp));
                }
                self.feedback.say("Scrolling up");
            }
            Command::ScrollDown => {
                for _ in 0..SCROLL_REPEAT {
                    self.inject(|inj| inj.press(Key::PageDown));
                }
                self.feedback.say("Scrolling down");
            }
            Command::EnableFeedback => {
                self.state
                    .voice_feedback_enabled
                    .store(true, Ordering::SeqCst);
                self.feedback.say("Voice feedback enabled");
            }
            Command::DisableFeedback => {
                // announce before clearing the flag so the goodbye is heard
                self.feedback.say("Voice feedback disabled");
                self.state
                    .voice_feedback_enabled
                    .store(false, Ordering::SeqCst);
            }
            Command::StartTyping => {
                if self.oskb.launch() {
                    self.feedback.say("On-screen keyboard launched");
                }
                self.engine.start_dictation();
            }
            Command::DontType => {
                self.engine.stop_dictation();
                if self.oskb.close() {
                    self.feedback.say("On-screen keyboard closed");
                }
            }
            Command::CancelCommandMode => {
                self.state.clear_wake();
                self.feedback.say("Command mode deactivated");
            }
            Command::LaunchKeyboard => {
                if self.oskb.launch() {
                    self.feedback.say("On-screen keyboard launched");
                }
            }
            Command::CloseKeyboard => {
                if self.oskb.close() {
                    self.feedback.say("On-screen keyboard closed");
                }
            }
            Command::ToggleKeyboard => {
                if self.oskb.toggle() {
                    self.feedback.say("On-screen keyboard launched");
                } else if self.oskb.configured() {
                    self.feedback.say("On-screen keyboard closed");
                }
            }
        }
    }

    fn inject(&self, op: impl FnOnce(&mut dyn crate::inject::InputInjector) -> Result<(), crate::inject::InjectError>) {
        let mut injector = self.injector.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = op(&mut *injector) {
            eprintln!("[inject] {e}");
        }
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            tracking_enabled: self.gaze_state.tracking_enabled,
            pointer: self.gaze_state.pointer,
            holding_click: self.gaze_state.holding_click,
            blink_detected: self.gaze_state.blink_detected,
            blink_count: self.gaze_state.blink_count,
            wake_word_active: self.state.wake_word_active.load(Ordering::SeqCst),
            wake_remaining: self.state.wake_remaining(),
            typing_mode: self.state.typing_mode.load(Ordering::SeqCst),
            voice_feedback_enabled: self
                .state
                .voice_feedback_enabled
                .load(Ordering::SeqCst),
            actively_listening: self.state.actively_listening.load(Ordering::SeqCst),
            last_heard: self.state.last_heard(),
        }
    }

    /// Stop the voice engine (bounded joins), tear down dictation if still
    /// active, and hide the OS keyboard.
    pub fn shutdown(&mut self) {
        self.engine.stop();
        if self.oskb.visible() {
            self.oskb.close();
        }
    }
}
