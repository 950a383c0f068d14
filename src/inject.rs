//! Input injection - the pointer/keyboard effector contract and the
//! enigo-backed system implementation
//!
//! The controller thread and the dictation listener both inject, so the
//! injector is shared behind a mutex. All coordinates are absolute screen
//! pixels.

use enigo::{
    Button, Coordinate, Direction, Enigo, Key as EnigoKey, Keyboard, Mouse, Settings,
};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Keys the controller presses directly (scroll commands).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    PageUp,
    PageDown,
    Enter,
    Space,
    Backspace,
}

#[derive(Debug)]
pub enum InjectError {
    Init(String),
    Input(String),
}

impl fmt::Display for InjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectError::Init(msg) => write!(f, "injector init failed: {}", msg),
            InjectError::Input(msg) => write!(f, "injection failed: {}", msg),
        }
    }
}

impl std::error::Error for InjectError {}

/// Side-effecting pointer/keyboard capability. Assumed synchronous and fast.
pub trait InputInjector: Send {
    fn move_to(&mut self, x: f32, y: f32) -> Result<(), InjectError>;
    fn click(&mut self) -> Result<(), InjectError>;
    fn double_click(&mut self) -> Result<(), InjectError>;
    fn right_click(&mut self) -> Result<(), InjectError>;
    fn mouse_down(&mut self) -> Result<(), InjectError>;
    fn mouse_up(&mut self) -> Result<(), InjectError>;
    fn press(&mut self, key: Key) -> Result<(), InjectError>;
    fn write(&mut self, text: &str) -> Result<(), InjectError>;
    fn position(&mut self) -> Result<(f32, f32), InjectError>;
    fn screen_size(&mut self) -> Result<(f32, f32), InjectError>;
}

/// Injector shared between the controller loop and the dictation listener.
pub type SharedInjector = Arc<Mutex<dyn InputInjector>>;

pub fn shared(injector: impl InputInjector + 'static) -> SharedInjector {
    Arc::new(Mutex::new(injector))
}

/// Real OS-level injection through enigo.
pub struct SystemInjector {
    enigo: Enigo,
}

impl SystemInjector {
    pub fn new() -> Result<Self, InjectError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| InjectError::Init(format!("{e}")))?;
        Ok(Self { enigo })
    }

    fn input(result: Result<(), enigo::InputError>) -> Result<(), InjectError> {
        result.map_err(|e| InjectError::Input(format!("{e}")))
    }
}

impl InputInjector for SystemInjector {
    fn move_to(&mut self, x: f32, y: f32) -> Result<(), InjectError> {
        Self::input(
            self.enigo
                .move_mouse(x as i32, y as i32, Coordinate::Abs),
        )
    }

    fn click(&mut self) -> Result<(), InjectError> {
        Self::input(self.enigo.button(Button::Left, Direction::Click))
    }

    fn double_click(&mut self) -> Result<(), InjectError> {
        self.click()?;
        self.click()
    }

    fn right_click(&mut self) -> Result<(), InjectError> {
        Self::input(self.enigo.button(Button::Right, Direction::Click))
    }

    fn mouse_down(&mut self) -> Result<(), InjectError> {
        Self::input(self.enigo.button(Button::Left, Direction::Press))
    }

    fn mouse_up(&mut self) -> Result<(), InjectError> {
        Self::input(self.enigo.button(Button::Left, Direction::Release))
    }

    fn press(&mut self, key: Key) -> Result<(), InjectError> {
        let key = match key {
            Key::PageUp => EnigoKey::PageUp,
            Key::PageDown => EnigoKey::PageDown,
            Key::Enter => EnigoKey::Return,
            Key::Space => EnigoKey::Space,
            Key::Backspace => EnigoKey::Backspace,
        };
        Self::input(self.enigo.key(key, Direction::Click))
    }

    fn write(&mut self, text: &str) -> Result<(), InjectError> {
        Self::input(self.enigo.text(text))
    }

    fn position(&mut self) -> Result<(f32, f32), InjectError> {
        let (x, y) = self
            .enigo
            .location()
            .map_err(|e| InjectError::Input(format!("{e}")))?;
        Ok((x as f32, y as f32))
    }

    fn screen_size(&mut self) -> Result<(f32, f32), InjectError> {
        let (w, h) = self
            .enigo
            .main_display()
            .map_err(|e| InjectError::Input(format!("{e}")))?;
        Ok((w as f32, h as f32))
    }
}
