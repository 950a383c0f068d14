//! Voice command engine - ambient listening, wake mode, dictation
//!
//! Two background listener threads at most: the ambient command listener
//! (always running) and the dictation listener (only in typing mode). Both
//! communicate with the controller loop exclusively through the command
//! queue and the shared state flags, and both serialize on the microphone
//! mutex so the physical device is never read concurrently.
//!
//! Wake-mode expiry is handled by detached sleeper threads stamped with the
//! state's generation counter: every activation/renewal arms a fresh sleeper
//! and makes all earlier ones stale, so a late timer can never deactivate a
//! renewed session or double-fire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::command::{Command, CommandTable};
use crate::config::Config;
use crate::inject::SharedInjector;
use crate::speech::Feedback;
use crate::state::SharedState;
use crate::transcribe::{ListenError, ListenParams, TranscriptionSource};
use crate::wake::WakeSet;

/// Spoken service-failure notices are throttled to one per this interval.
const SERVICE_NOTICE_INTERVAL: Duration = Duration::from_secs(10);

/// Pause after a service failure so a dead sidecar does not spin the loop.
const SERVICE_RETRY_PAUSE: Duration = Duration::from_millis(250);

/// Settle delay between the focus click and typing dictated text.
const FOCUS_SETTLE: Duration = Duration::from_millis(100);

/// Timing knobs for both listeners, derived from config.
#[derive(Debug, Clone, Copy)]
pub struct ListenTuning {
    pub ambient: ListenParams,
    pub dictation: ListenParams,
    pub wake_timeout: Duration,
    pub calibrate: Duration,
}

impl ListenTuning {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ambient: ListenParams::ambient(&config.listen),
            dictation: ListenParams::dictation(&config.listen),
            wake_timeout: config.wake_timeout(),
            calibrate: Duration::from_secs(config.listen.calibrate_secs),
        }
    }
}

pub struct VoiceEngine {
    state: SharedState,
    commands: flume::Sender<Command>,
    transcriber: Arc<dyn TranscriptionSource>,
    injector: SharedInjector,
    feedback: Feedback,
    wake: Arc<WakeSet>,
    table: Arc<CommandTable>,
    mic: Arc<Mutex<()>>,
    tuning: ListenTuning,
    ambient_stop: Arc<AtomicBool>,
    ambient: Option<JoinHandle<()>>,
    dictation_stop: Arc<AtomicBool>,
    dictation: Option<JoinHandle<()>>,
}

impl VoiceEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: SharedState,
        commands: flume::Sender<Command>,
        transcriber: Arc<dyn TranscriptionSource>,
        injector: SharedInjector,
        feedback: Feedback,
        wake: WakeSet,
        table: Arc<CommandTable>,
        tuning: ListenTuning,
    ) -> Self {
        Self {
            state,
            commands,
            transcriber,
            injector,
            feedback,
            wake: Arc::new(wake),
            table,
            mic: Arc::new(Mutex::new(())),
            tuning,
            ambient_stop: Arc::new(AtomicBool::new(false)),
            ambient: None,
            dictation_stop: Arc::new(AtomicBool::new(false)),
            dictation: None,
        }
    }

    /// Start the ambient command listener.
    pub fn start(&mut self) {
        if self.ambient.is_some() {
            return;
        }
        self.ambient_stop.store(false, Ordering::SeqCst);
        let worker = AmbientWorker {
            state: Arc::clone(&self.state),
            commands: self.commands.clone(),
            transcriber: Arc::clone(&self.transcriber),
            feedback: self.feedback.clone(),
            wake: Arc::clone(&self.wake),
            table: Arc::clone(&self.table),
            mic: Arc::clone(&self.mic),
            params: self.tuning.ambient,
            wake_timeout: self.tuning.wake_timeout,
            stop: Arc::clone(&self.ambient_stop),
        };
        self.ambient = Some(thread::spawn(move || worker.run()));
        self.feedback.say(&format!(
            "Voice commands activated. Say {} to start",
            self.wake.primary()
        ));
    }

    /// Stop both listeners cooperatively. Each join is bounded by a small
    /// multiple of the listen timeout; an overrunning thread is abandoned.
    pub fn stop(&mut self) {
        self.stop_dictation();
        self.ambient_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.ambient.take() {
            join_bounded(handle, join_bound(self.tuning.ambient), "ambient");
        }
        self.feedback.say("Voice commands deactivated");
    }

    /// Manual wake trigger (keyboard shortcut in the loop driver).
    pub fn force_wake(&self) {
        let stamp = self.state.activate_wake(self.tuning.wake_timeout);
        self.spawn_expiry(stamp);
        self.feedback.say("Command mode activated manually");
    }

    /// Re-run ambient-noise calibration off-thread; the controller loop must
    /// not block on the microphone.
    pub fn calibrate(&self) {
        let transcriber = Arc::clone(&self.transcriber);
        let mic = Arc::clone(&self.mic);
        let feedback = self.feedback.clone();
        let duration = self.tuning.calibrate;
        thread::spawn(move || {
            eprintln!("[calib] calibrating microphone, please remain silent");
            let _mic = mic.lock().unwrap_or_else(PoisonError::into_inner);
            match transcriber.calibrate(duration) {
                Ok(()) => {
                    eprintln!("[calib] calibration complete");
                    feedback.say("Microphone calibrated.");
                }
                Err(e) => eprintln!("[calib] calibration failed: {e}"),
            }
        });
    }

    /// Enter the dictation sub-mode: recognized speech is typed verbatim
    /// instead of parsed. No-op if already typing.
    pub fn start_dictation(&mut self) {
        if self.state.typing_mode.swap(true, Ordering::SeqCst) {
            return;
        }
        self.dictation_stop.store(false, Ordering::SeqCst);
        let worker = DictationWorker {
            state: Arc::clone(&self.state),
            commands: self.commands.clone(),
            transcriber: Arc::clone(&self.transcriber),
            injector: Arc::clone(&self.injector),
            feedback: self.feedback.clone(),
            table: Arc::clone(&self.table),
            mic: Arc::clone(&self.mic),
            params: self.tuning.dictation,
            stop: Arc::clone(&self.dictation_stop),
        };
        self.dictation = Some(thread::spawn(move || worker.run()));
        self.feedback
            .say("Typing mode activated. Speak clearly to type.");
    }

    /// Leave the dictation sub-mode and join its listener within the bound.
    pub fn stop_dictation(&mut self) {
        if !self.state.typing_mode.swap(false, Ordering::SeqCst) {
            return;
        }
        self.dictation_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.dictation.take() {
            join_bounded(handle, join_bound(self.tuning.dictation), "dictation");
        }
        self.feedback.say("Typing mode deactivated");
    }

    fn spawn_expiry(&self, stamp: u64) {
        spawn_expiry(
            Arc::clone(&self.state),
            self.feedback.clone(),
            stamp,
            self.tuning.wake_timeout,
        );
    }
}

/// Sleep out the wake timeout, then deactivate command mode unless a renewal
/// made the stamp stale in the meantime.
fn spawn_expiry(state: SharedState, feedback: Feedback, stamp: u64, timeout: Duration) {
    thread::spawn(move || {
        thread::sleep(timeout);
        if state.try_expire_wake(stamp) {
            eprintln!("[voice] command mode timed out");
            feedback.say("Command mode timed out");
        }
    });
}

fn join_bound(params: ListenParams) -> Duration {
    params.timeout * 3
}

fn join_bounded(handle: JoinHandle<()>, bound: Duration, name: &str) {
    let deadline = Instant::now() + bound;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            eprintln!("[voice] {name} listener did not stop within {bound:?}, abandoning");
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    let _ = handle.join();
}

// ============================================================================
// Ambient listener
// ============================================================================

struct AmbientWorker {
    state: SharedState,
    commands: flume::Sender<Command>,
    transcriber: Arc<dyn TranscriptionSource>,
    feedback: Feedback,
    wake: Arc<WakeSet>,
    table: Arc<CommandTable>,
    mic: Arc<Mutex<()>>,
    params: ListenParams,
    wake_timeout: Duration,
    stop: Arc<AtomicBool>,
}

impl AmbientWorker {
    fn run(self) {
        let mut last_service_notice: Option<Instant> = None;

        while !self.stop.load(Ordering::SeqCst) {
            self.state.actively_listening.store(true, Ordering::SeqCst);
            let heard = {
                let _mic = self.mic.lock().unwrap_or_else(PoisonError::into_inner);
                self.transcriber.listen(&self.params)
            };
            self.state.actively_listening.store(false, Ordering::SeqCst);

            let text = match heard {
                Ok(text) => text.to_lowercase(),
                Err(ListenError::Timeout) | Err(ListenError::Unintelligible) => continue,
                Err(ListenError::Service(msg)) => {
                    self.notice_service_failure(&msg, &mut last_service_notice);
                    thread::sleep(SERVICE_RETRY_PAUSE);
                    continue;
                }
            };
            if text.is_empty() {
                continue;
            }
            self.state.set_last_heard(&text);

            if !self.state.wake_word_active.load(Ordering::SeqCst) && self.wake.matches(&text) {
                let stamp = self.state.activate_wake(self.wake_timeout);
                spawn_expiry(
                    Arc::clone(&self.state),
                    self.feedback.clone(),
                    stamp,
                    self.wake_timeout,
                );
                self.feedback.say("Command mode activated");
                // the wake utterance itself is never parsed as a command
                continue;
            }

            if self.state.wake_word_active.load(Ordering::SeqCst) {
                if let Some(command) = self.table.parse(&text) {
                    if self.commands.send(command).is_err() {
                        break;
                    }
                    self.renew();
                    self.feedback.say(&format!("Command: {command}"));
                } else if self.wake.matches(&text) {
                    // repeating the wake phrase keeps command mode alive
                    self.renew();
                }
            }

            // the dictation stop phrase works from either listener,
            // regardless of wake state
            if self.state.typing_mode.load(Ordering::SeqCst) && self.table.speaks_stop_typing(&text)
            {
                let _ = self.commands.send(Command::DontType);
            }
        }
    }

    fn renew(&self) {
        let stamp = self.state.renew_wake(self.wake_timeout);
        spawn_expiry(
            Arc::clone(&self.state),
            self.feedback.clone(),
            stamp,
            self.wake_timeout,
        );
    }

    fn notice_service_failure(&self, msg: &str, last: &mut Option<Instant>) {
        eprintln!("[voice] transcription service unavailable: {msg}");
        let due = last.is_none_or(|at| at.elapsed() >= SERVICE_NOTICE_INTERVAL);
        if due {
            *last = Some(Instant::now());
            self.feedback
                .say("Could not reach speech recognition service");
        }
    }
}

// ============================================================================
// Dictation listener
// ============================================================================

struct DictationWorker {
    state: SharedState,
    commands: flume::Sender<Command>,
    transcriber: Arc<dyn TranscriptionSource>,
    injector: SharedInjector,
    feedback: Feedback,
    table: Arc<CommandTable>,
    mic: Arc<Mutex<()>>,
    params: ListenParams,
    stop: Arc<AtomicBool>,
}

impl DictationWorker {
    fn run(self) {
        let mut last_service_notice: Option<Instant> = None;

        while !self.stop.load(Ordering::SeqCst) && self.state.typing_mode.load(Ordering::SeqCst) {
            let heard = {
                let _mic = self.mic.lock().unwrap_or_else(PoisonError::into_inner);
                self.transcriber.listen(&self.params)
            };

            let text = match heard {
                Ok(text) => text,
                Err(ListenError::Timeout) | Err(ListenError::Unintelligible) => continue,
                Err(ListenError::Service(msg)) => {
                    eprintln!("[voice] transcription service unavailable: {msg}");
                    let due =
                        last_service_notice.is_none_or(|at| at.elapsed() >= SERVICE_NOTICE_INTERVAL);
                    if due {
                        last_service_notice = Some(Instant::now());
                        self.feedback
                            .say("Could not reach speech recognition service");
                    }
                    thread::sleep(SERVICE_RETRY_PAUSE);
                    continue;
                }
            };
            if text.is_empty() {
                continue;
            }

            if self.table.speaks_stop_typing(&text.to_lowercase()) {
                let _ = self.commands.send(Command::DontType);
                continue;
            }

            // click first to make sure the target field has focus
            let mut injector = self.injector.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = injector.click() {
                eprintln!("[voice] dictation click failed: {e}");
                continue;
            }
            thread::sleep(FOCUS_SETTLE);
            if let Err(e) = injector.write(&format!("{text} ")) {
                eprintln!("[voice] dictation write failed: {e}");
            }
        }
    }
}
