use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Phrases that switch the voice engine into command mode
    #[serde(default = "default_wake_phrases")]
    pub wake_phrases: Vec<String>,
    #[serde(default = "default_wake_timeout")]
    pub wake_timeout_secs: u64,
    /// Speak acknowledgements for recognized commands
    #[serde(default = "default_voice_feedback")]
    pub voice_feedback: bool,
    /// Controller loop period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default)]
    pub gaze: GazeConfig,
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub stt: SttConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub landmarks: LandmarksConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub oskb: OskbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wake_phrases: default_wake_phrases(),
            wake_timeout_secs: default_wake_timeout(),
            voice_feedback: default_voice_feedback(),
            tick_ms: default_tick_ms(),
            gaze: GazeConfig::default(),
            listen: ListenConfig::default(),
            stt: SttConfig::default(),
            speech: SpeechConfig::default(),
            landmarks: LandmarksConfig::default(),
            commands: CommandsConfig::default(),
            oskb: OskbConfig::default(),
        }
    }
}

fn default_wake_phrases() -> Vec<String> {
    [
        "hey computer",
        "computer",
        "eye control",
        "eye commander",
        "voice control",
    ]
    .map(String::from)
    .to_vec()
}

fn default_wake_timeout() -> u64 {
    12
}

fn default_voice_feedback() -> bool {
    true
}

fn default_tick_ms() -> u64 {
    33
}

// ============================================================================
// Gaze Config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GazeConfig {
    /// Right-eye displacement below this fires a click (normalized units)
    #[serde(default = "default_click_threshold")]
    pub click_threshold: f32,
    /// Left-eye displacement below this holds the mouse button down
    #[serde(default = "default_hold_threshold")]
    pub hold_threshold: f32,
    /// Window after a click during which further closed-eye reads are ignored
    #[serde(default = "default_blink_cooldown")]
    pub blink_cooldown_ms: u64,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            click_threshold: default_click_threshold(),
            hold_threshold: default_hold_threshold(),
            blink_cooldown_ms: default_blink_cooldown(),
        }
    }
}

impl GazeConfig {
    pub fn blink_cooldown(&self) -> Duration {
        Duration::from_millis(self.blink_cooldown_ms)
    }
}

fn default_click_threshold() -> f32 {
    0.008
}

fn default_hold_threshold() -> f32 {
    0.008
}

fn default_blink_cooldown() -> u64 {
    300
}

// ============================================================================
// Listener Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListenConfig {
    /// Ambient listener: wait this long for speech to start
    #[serde(default = "default_ambient_timeout")]
    pub ambient_timeout_ms: u64,
    /// Ambient listener: cap a single utterance at this length
    #[serde(default = "default_ambient_phrase_limit")]
    pub ambient_phrase_limit_ms: u64,
    /// Dictation listener: longer pause tolerance for full sentences
    #[serde(default = "default_dictation_timeout")]
    pub dictation_timeout_ms: u64,
    #[serde(default = "default_dictation_phrase_limit")]
    pub dictation_phrase_limit_ms: u64,
    /// Ambient-noise calibration sample length
    #[serde(default = "default_calibrate_secs")]
    pub calibrate_secs: u64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            ambient_timeout_ms: default_ambient_timeout(),
            ambient_phrase_limit_ms: default_ambient_phrase_limit(),
            dictation_timeout_ms: default_dictation_timeout(),
            dictation_phrase_limit_ms: default_dictation_phrase_limit(),
            calibrate_secs: default_calibrate_secs(),
        }
    }
}

fn default_ambient_timeout() -> u64 {
    1000
}

fn default_ambient_phrase_limit() -> u64 {
    3000
}

fn default_dictation_timeout() -> u64 {
    2000
}

fn default_dictation_phrase_limit() -> u64 {
    10_000
}

fn default_calibrate_secs() -> u64 {
    3
}

// ============================================================================
// External collaborator commands
// ============================================================================

/// Speech-to-text sidecar. Each `listen` call runs this command; it should
/// record from the microphone and print the recognized text to stdout.
/// Placeholders `{timeout_s}` and `{limit_s}` are substituted with the listen
/// timeout and phrase time limit in seconds. See `transcribe::CommandTranscriber`
/// for the exit-code contract.
#[derive(Debug, Deserialize)]
pub struct SttConfig {
    #[serde(default = "default_listen_command")]
    pub listen_command: Vec<String>,
    /// Optional ambient-noise calibration command (`{duration_s}` substituted)
    #[serde(default = "default_calibrate_command")]
    pub calibrate_command: Option<Vec<String>>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            listen_command: default_listen_command(),
            calibrate_command: default_calibrate_command(),
        }
    }
}

fn default_listen_command() -> Vec<String> {
    [
        "iris-stt",
        "listen",
        "--timeout",
        "{timeout_s}",
        "--phrase-limit",
        "{limit_s}",
    ]
    .map(String::from)
    .to_vec()
}

fn default_calibrate_command() -> Option<Vec<String>> {
    Some(
        ["iris-stt", "calibrate", "--duration", "{duration_s}"]
            .map(String::from)
            .to_vec(),
    )
}

#[derive(Debug, Deserialize)]
pub struct SpeechConfig {
    /// Text-to-speech command, spawned fire-and-forget (`{text}` substituted)
    #[serde(default = "default_speech_command")]
    pub command: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: default_speech_command(),
        }
    }
}

fn default_speech_command() -> Vec<String> {
    if cfg!(target_os = "macos") {
        ["say", "{text}"].map(String::from).to_vec()
    } else {
        ["espeak", "{text}"].map(String::from).to_vec()
    }
}

#[derive(Debug, Deserialize)]
pub struct LandmarksConfig {
    /// Newline-delimited-JSON landmark stream written by the external
    /// visual model (typically a named pipe)
    #[serde(default = "default_landmarks_path")]
    pub path: PathBuf,
}

impl Default for LandmarksConfig {
    fn default() -> Self {
        Self {
            path: default_landmarks_path(),
        }
    }
}

fn default_landmarks_path() -> PathBuf {
    PathBuf::from("landmarks.jsonl")
}

// ============================================================================
// Command table extensions
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct CommandsConfig {
    /// Extra spoken variations appended to the built-in table
    #[serde(default)]
    pub extra: Vec<ExtraCommand>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtraCommand {
    /// Canonical command id, e.g. "scroll up"
    pub command: String,
    pub phrase: String,
}

// ============================================================================
// External OS on-screen keyboard
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OskbConfig {
    #[serde(default = "default_oskb_show")]
    pub show: Option<Vec<String>>,
    #[serde(default = "default_oskb_hide")]
    pub hide: Option<Vec<String>>,
}

impl Default for OskbConfig {
    fn default() -> Self {
        Self {
            show: default_oskb_show(),
            hide: default_oskb_hide(),
        }
    }
}

fn default_oskb_show() -> Option<Vec<String>> {
    if cfg!(windows) {
        Some(["osk"].map(String::from).to_vec())
    } else {
        None
    }
}

fn default_oskb_hide() -> Option<Vec<String>> {
    if cfg!(windows) {
        Some(
            ["taskkill", "/f", "/im", "osk.exe"]
                .map(String::from)
                .to_vec(),
        )
    } else {
        None
    }
}

impl Config {
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }
        match fs::read_to_string(path) {
            Ok(text) => match toml::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!(
                        "[config] {} is malformed ({e}), using defaults",
                        path.display()
                    );
                    Config::default()
                }
            },
            Err(e) => {
                eprintln!(
                    "[config] failed to read {} ({e}), using defaults",
                    path.display()
                );
                Config::default()
            }
        }
    }

    pub fn wake_timeout(&self) -> Duration {
        Duration::from_secs(self.wake_timeout_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
