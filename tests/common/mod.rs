//! Test doubles for the external collaborators

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use iris::inject::{InjectError, InputInjector, Key};
use iris::landmarks::{LandmarkFrame, LandmarkSource};
use iris::speech::Speak;
use iris::transcribe::{ListenError, ListenParams, TranscriptionSource};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    MoveTo(f32, f32),
    Click,
    DoubleClick,
    RightClick,
    MouseDown,
    MouseUp,
    Press(Key),
    Write(String),
}

/// Injector that records every call; the log handle stays with the test.
pub struct RecordingInjector {
    pub log: Arc<Mutex<Vec<Call>>>,
}

impl RecordingInjector {
    pub fn new() -> (Self, Arc<Mutex<Vec<Call>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }

    fn record(&self, call: Call) -> Result<(), InjectError> {
        self.log.lock().unwrap().push(call);
        Ok(())
    }
}

impl InputInjector for RecordingInjector {
    fn move_to(&mut self, x: f32, y: f32) -> Result<(), InjectError> {
        self.record(Call::MoveTo(x, y))
    }
    fn click(&mut self) -> Result<(), InjectError> {
        self.record(Call::Click)
    }
    fn double_click(&mut self) -> Result<(), InjectError> {
        self.record(Call::DoubleClick)
    }
    fn right_click(&mut self) -> Result<(), InjectError> {
        self.record(Call::RightClick)
    }
    fn mouse_down(&mut self) -> Result<(), InjectError> {
        self.record(Call::MouseDown)
    }
    fn mouse_up(&mut self) -> Result<(), InjectError> {
        self.record(Call::MouseUp)
    }
    fn press(&mut self, key: Key) -> Result<(), InjectError> {
        self.record(Call::Press(key))
    }
    fn write(&mut self, text: &str) -> Result<(), InjectError> {
        self.record(Call::Write(text.to_string()))
    }
    fn position(&mut self) -> Result<(f32, f32), InjectError> {
        Ok((0.0, 0.0))
    }
    fn screen_size(&mut self) -> Result<(f32, f32), InjectError> {
        Ok((1920.0, 1080.0))
    }
}

/// Transcription source that replays a fixed script, then reports listen
/// timeouts forever. Each call pauses briefly like a real microphone read.
pub struct ScriptedTranscriber {
    script: Mutex<VecDeque<Result<String, ListenError>>>,
}

impl ScriptedTranscriber {
    pub fn new(utterances: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                utterances
                    .iter()
                    .map(|u| Ok(u.to_string()))
                    .collect(),
            ),
        })
    }

    pub fn from_results(results: Vec<Result<String, ListenError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(results.into()),
        })
    }
}

impl TranscriptionSource for ScriptedTranscriber {
    fn listen(&self, _params: &ListenParams) -> Result<String, ListenError> {
        thread::sleep(Duration::from_millis(10));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ListenError::Timeout))
    }

    fn calibrate(&self, _duration: Duration) -> Result<(), ListenError> {
        Ok(())
    }
}

pub struct RecordingSpeaker {
    pub spoken: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.contains(needle))
            .count()
    }
}

impl Speak for RecordingSpeaker {
    fn say(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }
}

/// Landmark source with no face in view.
pub struct NoFrames;

impl LandmarkSource for NoFrames {
    fn next_frame(&mut self) -> Option<LandmarkFrame> {
        None
    }
}

/// Poll until the condition holds or the deadline passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
