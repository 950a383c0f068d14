//! Shared runtime state - the only mutable region crossed by the listener
//! threads and the controller loop.
//!
//! Every field is an atomic (or a narrow mutex for the one string), so a
//! reader on the controller thread can never observe a torn value written by
//! a listener thread. Wake-mode transitions additionally go through a tiny
//! internal lock so that timer expiry racing a renewal is resolved by the
//! generation stamp, never by interleaving.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::Config;

/// Shared runtime state - accessible from all components
pub struct RuntimeState {
    /// Command mode is active; spoken text is parsed against the command table
    pub wake_word_active: AtomicBool,
    /// Bumped on every activation, renewal, and manual cancel. An expiry
    /// timer armed with an older stamp is stale and must not fire.
    wake_generation: AtomicU64,
    /// Instant (Unix ms) at which command mode lapses without renewal
    wake_deadline_ms: AtomicU64,
    /// Speak acknowledgements for recognized commands
    pub voice_feedback_enabled: AtomicBool,
    /// Dictation sub-mode: recognized speech is typed, not parsed
    pub typing_mode: AtomicBool,
    /// A listener thread is currently blocked on the microphone
    pub actively_listening: AtomicBool,
    /// Most recent transcription, for the status display
    last_heard: Mutex<String>,
    /// Serializes wake transitions against timer expiry
    wake_lock: Mutex<()>,
}

/// Type alias for shared state
pub type SharedState = Arc<RuntimeState>;

impl RuntimeState {
    pub fn new(config: &Config) -> SharedState {
        Arc::new(Self {
            wake_word_active: AtomicBool::new(false),
            wake_generation: AtomicU64::new(0),
            wake_deadline_ms: AtomicU64::new(0),
            voice_feedback_enabled: AtomicBool::new(config.voice_feedback),
            typing_mode: AtomicBool::new(false),
            actively_listening: AtomicBool::new(false),
            last_heard: Mutex::new(String::new()),
            wake_lock: Mutex::new(()),
        })
    }

    // ========================================================================
    // Wake mode
    // ========================================================================

    /// Activate command mode and arm a fresh deadline. Returns the generation
    /// stamp the caller must hand to its expiry timer.
    pub fn activate_wake(&self, timeout: Duration) -> u64 {
        let _guard = self.lock_wake();
        self.wake_word_active.store(true, Ordering::SeqCst);
        self.arm_deadline(timeout)
    }

    /// Push the deadline forward after a recognized command. Returns the new
    /// generation stamp; any previously armed timer is now stale.
    pub fn renew_wake(&self, timeout: Duration) -> u64 {
        let _guard = self.lock_wake();
        self.arm_deadline(timeout)
    }

    /// Called by an expiry timer. Deactivates command mode only if the stamp
    /// is still current and the mode is still active - a renewal or manual
    /// cancel in the meantime makes this a no-op. Returns whether the timer
    /// actually deactivated the mode (at most once per activation window).
    pub fn try_expire_wake(&self, stamp: u64) -> bool {
        let _guard = self.lock_wake();
        if self.wake_generation.load(Ordering::SeqCst) != stamp {
            return false;
        }
        self.wake_word_active.swap(false, Ordering::SeqCst)
    }

    /// Manual cancel ("cancel command mode" / shutdown). Bumps the generation
    /// so a pending timer cannot fire a spurious timeout notice later.
    pub fn clear_wake(&self) {
        let _guard = self.lock_wake();
        self.wake_generation.fetch_add(1, Ordering::SeqCst);
        self.wake_word_active.store(false, Ordering::SeqCst);
    }

    /// Time left before command mode lapses, if active.
    pub fn wake_remaining(&self) -> Option<Duration> {
        if !self.wake_word_active.load(Ordering::SeqCst) {
            return None;
        }
        let deadline = self.wake_deadline_ms.load(Ordering::SeqCst);
        Some(Duration::from_millis(deadline.saturating_sub(now_ms())))
    }

    fn arm_deadline(&self, timeout: Duration) -> u64 {
        self.wake_deadline_ms
            .store(now_ms() + timeout.as_millis() as u64, Ordering::SeqCst);
        self.wake_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock_wake(&self) -> std::sync::MutexGuard<'_, ()> {
        self.wake_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Last-heard text
    // ========================================================================

    pub fn set_last_heard(&self, text: &str) {
        let mut heard = self
            .last_heard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        heard.clear();
        heard.push_str(text);
    }

    pub fn last_heard(&self) -> String {
        self.last_heard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl fmt::Debug for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeState")
            .field(
                "wake_word_active",
                &self.wake_word_active.load(Ordering::SeqCst),
            )
            .field(
                "voice_feedback_enabled",
                &self.voice_feedback_enabled.load(Ordering::SeqCst),
            )
            .field("typing_mode", &self.typing_mode.load(Ordering::SeqCst))
            .field(
                "actively_listening",
                &self.actively_listening.load(Ordering::SeqCst),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SharedState {
        RuntimeState::new(&Config::default())
    }

    #[test]
    fn expiry_with_current_stamp_deactivates_once() {
        let state = state();
        let stamp = state.activate_wake(Duration::from_secs(1));
        assert!(state.wake_word_active.load(Ordering::SeqCst));

        assert!(state.try_expire_wake(stamp));
        assert!(!state.wake_word_active.load(Ordering::SeqCst));
        // second firing of the same timer does nothing
        assert!(!state.try_expire_wake(stamp));
    }

    #[test]
    fn renewal_makes_pending_timer_stale() {
        let state = state();
        let stale = state.activate_wake(Duration::from_secs(1));
        let _fresh = state.renew_wake(Duration::from_secs(1));

        assert!(!state.try_expire_wake(stale));
        assert!(state.wake_word_active.load(Ordering::SeqCst));
    }

    #[test]
    fn manual_cancel_invalidates_stamp() {
        let state = state();
        let stamp = state.activate_wake(Duration::from_secs(1));
        state.clear_wake();

        assert!(!state.wake_word_active.load(Ordering::SeqCst));
        // the timer armed before the cancel must not report an expiry
        assert!(!state.try_expire_wake(stamp));
    }

    #[test]
    fn wake_remaining_tracks_deadline() {
        let state = state();
        assert!(state.wake_remaining().is_none());
        state.activate_wake(Duration::from_secs(10));
        let remaining = state.wake_remaining().unwrap();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining > Duration::from_secs(8));
    }

    #[test]
    fn last_heard_round_trips() {
        let state = state();
        state.set_last_heard("scroll up");
        assert_eq!(state.last_heard(), "scroll up");
    }
}
