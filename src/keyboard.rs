//! On-screen keyboard widget boundary
//!
//! The widget itself (layout, hit rectangles, rendering) lives in the
//! presentation layer. The core only asks three questions: is it visible,
//! which key sits under the pointer, and what happened when that key was
//! pressed. Blink-driven clicks are redirected through this contract before
//! they ever reach the system injector.

/// In-process on-screen keyboard consumed by the gaze controller.
pub trait KeyboardWidget: Send {
    /// Whether the keyboard is currently shown and should capture blinks.
    fn active(&self) -> bool;

    /// Show or hide; returns the new visibility.
    fn toggle(&mut self) -> bool;

    /// The key label under an absolute screen position, if any.
    fn key_at(&self, x: f32, y: f32) -> Option<String>;

    /// Apply a key press to the widget's buffer. Returns the buffered text
    /// only on an Enter-equivalent key; the caller types it out.
    fn process_key(&mut self, key: &str) -> Option<String>;
}
