//! Facial landmark input - frame type, source contract, and the JSONL feed
//!
//! Landmark extraction itself happens in an external visual-model process;
//! this module only consumes its output. The feed reads one JSON object per
//! line (`{"points": [[x, y], ...]}`, normalized coordinates, index-stable
//! per the face-mesh topology) from a named pipe or file, keeps only the
//! most recent frame, and hands it to the controller exactly once.

use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use anyhow::Context;

/// One detected face's landmark set for a single frame. Ephemeral: consumed
/// the tick it is taken and never reused.
#[derive(Debug, Clone, Deserialize)]
pub struct LandmarkFrame {
    pub points: Vec<(f32, f32)>,
}

impl LandmarkFrame {
    pub fn point(&self, index: usize) -> Option<(f32, f32)> {
        self.points.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Per-tick landmark provider: zero or one face.
pub trait LandmarkSource: Send {
    fn next_frame(&mut self) -> Option<LandmarkFrame>;
}

/// Reader-thread-backed source over a newline-delimited JSON stream.
///
/// The reader blocks on the stream and overwrites a single slot with the
/// latest decoded frame; `next_frame` takes the slot, so the controller
/// never sees the same frame twice and never blocks waiting for one.
/// Malformed lines are expected noise and skipped silently.
pub struct LandmarkFeed {
    slot: Arc<Mutex<Option<LandmarkFrame>>>,
}

impl LandmarkFeed {
    /// Open the stream at `path`. Failure here is fatal to startup: without
    /// a landmark source there is nothing to control.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening landmark stream {}", path.display()))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let slot: Arc<Mutex<Option<LandmarkFrame>>> = Arc::new(Mutex::new(None));
        let writer = Arc::clone(&slot);
        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<LandmarkFrame>(line) {
                    Ok(frame) => {
                        *writer.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
                    }
                    Err(_) => continue,
                }
            }
        });
        Self { slot }
    }
}

impl LandmarkSource for LandmarkFeed {
    fn next_frame(&mut self) -> Option<LandmarkFrame> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
