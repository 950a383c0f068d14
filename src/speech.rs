//! Spoken feedback - best-effort, fire-and-forget
//!
//! Synthesis runs in an external program; failures are swallowed so a broken
//! speaker can never disturb the listeners or the controller loop.

use std::process::{Command as Process, Stdio};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::config::SpeechConfig;
use crate::state::SharedState;

pub trait Speak: Send + Sync {
    fn say(&self, text: &str);
}

/// Speaks by spawning the configured command detached (`{text}` substituted,
/// or appended when no placeholder is present).
pub struct CommandSpeaker {
    command: Vec<String>,
}

impl CommandSpeaker {
    pub fn from_config(cfg: &SpeechConfig) -> Self {
        Self {
            command: cfg.command.clone(),
        }
    }
}

impl Speak for CommandSpeaker {
    fn say(&self, text: &str) {
        let Some((program, rest)) = self.command.split_first() else {
            return;
        };
        let mut args: Vec<String> = rest
            .iter()
            .map(|arg| arg.replace("{text}", text))
            .collect();
        if !rest.iter().any(|arg| arg.contains("{text}")) {
            args.push(text.to_string());
        }
        let _ = Process::new(program)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
    }
}

/// Speaker that stays silent. Used where no feedback channel exists.
pub struct NullSpeaker;

impl Speak for NullSpeaker {
    fn say(&self, _text: &str) {}
}

/// Feedback gate: speaks only while `voice_feedback_enabled` is set.
/// Cheap to clone and hand to every thread that announces anything.
#[derive(Clone)]
pub struct Feedback {
    speaker: Arc<dyn Speak>,
    state: SharedState,
}

impl Feedback {
    pub fn new(speaker: Arc<dyn Speak>, state: SharedState) -> Self {
        Self { speaker, state }
    }

    pub fn say(&self, text: &str) {
        if self.state.voice_feedback_enabled.load(Ordering::SeqCst) {
            self.speaker.say(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::RuntimeState;
    use std::sync::Mutex;

    pub struct RecordingSpeaker {
        pub spoken: Mutex<Vec<String>>,
    }

    impl RecordingSpeaker {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                spoken: Mutex::new(Vec::new()),
            })
        }
    }

    impl Speak for RecordingSpeaker {
        fn say(&self, text: &str) {
            self.spoken.lock().unwrap().push(text.to_string());
        }
    }

    #[test]
    fn feedback_honors_the_flag() {
        let state = RuntimeState::new(&Config::default());
        let speaker = RecordingSpeaker::new();
        let feedback = Feedback::new(speaker.clone(), state.clone());

        feedback.say("hello");
        state.voice_feedback_enabled.store(false, Ordering::SeqCst);
        feedback.say("ignored");

        assert_eq!(*speaker.spoken.lock().unwrap(), vec!["hello".to_string()]);
    }
}
