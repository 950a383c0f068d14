//! Gaze-to-pointer mapping and the blink click/hold state machine
//!
//! Runs once per controller tick against the tick's landmark frame. Pointer
//! motion follows the iris center; clicks and holds are edge-triggered on
//! eyelid displacement so an eye held closed across many frames produces
//! exactly one event. Displacements are in normalized landmark units
//! (smaller = more closed).

use std::time::Instant;

use crate::config::GazeConfig;
use crate::inject::{InjectError, InputInjector};
use crate::keyboard::KeyboardWidget;
use crate::landmarks::LandmarkFrame;

/// Face-mesh indices. The iris subset is 474..478; the pointer follows its
/// second point. Eyelid pairs are (upper, lower) per eye.
const IRIS_POINTER: usize = 475;
const LEFT_EYE: (usize, usize) = (145, 159);
const RIGHT_EYE: (usize, usize) = (374, 386);

/// The highest index the controller reads; shorter frames are noise.
const MIN_LANDMARKS: usize = 478;

/// Per-tick gaze state, owned by the controller loop.
#[derive(Debug, Clone)]
pub struct GazeState {
    pub pointer: (f32, f32),
    pub holding_click: bool,
    pub blink_detected: bool,
    pub blink_count: u64,
    pub tracking_enabled: bool,
    /// Right-eye reads are not trusted until this instant passes
    cooldown_until: Option<Instant>,
}

impl Default for GazeState {
    fn default() -> Self {
        Self {
            pointer: (0.0, 0.0),
            holding_click: false,
            blink_detected: false,
            blink_count: 0,
            tracking_enabled: true,
            cooldown_until: None,
        }
    }
}

pub struct GazeController {
    config: GazeConfig,
    screen: (f32, f32),
}

impl GazeController {
    pub fn new(config: GazeConfig, screen: (f32, f32)) -> Self {
        Self { config, screen }
    }

    /// Process one tick. With no frame (or tracking disabled) nothing moves
    /// and no click events fire; a hold survives until an open left eye is
    /// actually observed.
    pub fn process(
        &self,
        now: Instant,
        frame: Option<&LandmarkFrame>,
        keyboard: Option<&mut (dyn KeyboardWidget + 'static)>,
        state: &mut GazeState,
        injector: &mut dyn InputInjector,
    ) -> Result<(), InjectError> {
        let usable = frame.filter(|f| f.len() >= MIN_LANDMARKS);
        let Some(frame) = usable else {
            state.blink_detected = false;
            return Ok(());
        };
        if !state.tracking_enabled {
            state.blink_detected = false;
            return Ok(());
        }

        self.move_pointer(frame, state, injector)?;
        self.detect_click(now, frame, keyboard, state, injector)?;
        self.detect_hold(frame, state, injector)?;
        Ok(())
    }

    fn move_pointer(
        &self,
        frame: &LandmarkFrame,
        state: &mut GazeState,
        injector: &mut dyn InputInjector,
    ) -> Result<(), InjectError> {
        let Some((x, y)) = frame.point(IRIS_POINTER) else {
            return Ok(());
        };
        let screen_x = x * self.screen.0;
        let screen_y = y * self.screen.1;
        state.pointer = (screen_x, screen_y);
        injector.move_to(screen_x, screen_y)
    }

    fn detect_click(
        &self,
        now: Instant,
        frame: &LandmarkFrame,
        keyboard: Option<&mut (dyn KeyboardWidget + 'static)>,
        state: &mut GazeState,
        injector: &mut dyn InputInjector,
    ) -> Result<(), InjectError> {
        let Some(displacement) = eye_displacement(frame, RIGHT_EYE) else {
            state.blink_detected = false;
            return Ok(());
        };
        let in_cooldown = state.cooldown_until.is_some_and(|until| now < until);

        if displacement < self.config.click_threshold && !in_cooldown {
            self.fire_blink(keyboard, injector)?;
            state.blink_detected = true;
            state.blink_count += 1;
            state.cooldown_until = Some(now + self.config.blink_cooldown());
        } else {
            state.blink_detected = false;
        }
        Ok(())
    }

    /// A blink is redirected to the on-screen keyboard widget when one is
    /// active; only without one does it become a system click.
    fn fire_blink(
        &self,
        keyboard: Option<&mut (dyn KeyboardWidget + 'static)>,
        injector: &mut dyn InputInjector,
    ) -> Result<(), InjectError> {
        if let Some(widget) = keyboard.filter(|kb| kb.active()) {
            let (x, y) = injector.position()?;
            if let Some(key) = widget.key_at(x, y) {
                if let Some(text) = widget.process_key(&key) {
                    injector.write(&text)?;
                }
            }
            return Ok(());
        }
        injector.click()
    }

    fn detect_hold(
        &self,
        frame: &LandmarkFrame,
        state: &mut GazeState,
        injector: &mut dyn InputInjector,
    ) -> Result<(), InjectError> {
        let Some(displacement) = eye_displacement(frame, LEFT_EYE) else {
            return Ok(());
        };
        if displacement < self.config.hold_threshold {
            if !state.holding_click {
                injector.mouse_down()?;
                state.holding_click = true;
            }
        } else if state.holding_click {
            injector.mouse_up()?;
            state.holding_click = false;
        }
        Ok(())
    }
}

fn eye_displacement(frame: &LandmarkFrame, (upper, lower): (usize, usize)) -> Option<f32> {
    let (_, upper_y) = frame.point(upper)?;
    let (_, lower_y) = frame.point(lower)?;
    Some(upper_y - lower_y)
}
