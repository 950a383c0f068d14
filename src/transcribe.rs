//! Transcription source contract and the subprocess-backed implementation
//!
//! Speech-to-text is an external capability consumed over a blocking
//! call/response contract: listen on the microphone for up to a timeout,
//! return recognized text or a classified failure. The taxonomy matters -
//! timeouts and unintelligible speech are expected, high-frequency outcomes
//! the listeners must swallow, while a service failure is recoverable and
//! retried forever.

use std::fmt;
use std::process::Command as Process;
use std::time::Duration;

use crate::config::{ListenConfig, SttConfig};

/// Parameters for a single listen call.
#[derive(Debug, Clone, Copy)]
pub struct ListenParams {
    /// How long to wait for speech to begin
    pub timeout: Duration,
    /// Maximum length of a single utterance
    pub phrase_time_limit: Duration,
}

impl ListenParams {
    pub fn ambient(cfg: &ListenConfig) -> Self {
        Self {
            timeout: Duration::from_millis(cfg.ambient_timeout_ms),
            phrase_time_limit: Duration::from_millis(cfg.ambient_phrase_limit_ms),
        }
    }

    pub fn dictation(cfg: &ListenConfig) -> Self {
        Self {
            timeout: Duration::from_millis(cfg.dictation_timeout_ms),
            phrase_time_limit: Duration::from_millis(cfg.dictation_phrase_limit_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenError {
    /// No speech began within the timeout
    Timeout,
    /// Audio was captured but could not be recognized
    Unintelligible,
    /// The transcription service is unreachable or failed
    Service(String),
}

impl fmt::Display for ListenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenError::Timeout => write!(f, "no speech before timeout"),
            ListenError::Unintelligible => write!(f, "speech not recognized"),
            ListenError::Service(msg) => write!(f, "transcription service error: {}", msg),
        }
    }
}

impl std::error::Error for ListenError {}

/// Blocking speech-to-text capability.
pub trait TranscriptionSource: Send + Sync {
    fn listen(&self, params: &ListenParams) -> Result<String, ListenError>;

    /// Sample ambient noise to adjust the recognizer's energy threshold.
    fn calibrate(&self, duration: Duration) -> Result<(), ListenError>;
}

/// Transcription via a configured sidecar command, one invocation per
/// utterance.
///
/// Exit-code contract with the sidecar:
/// - `0` with text on stdout: recognized utterance
/// - `0` with empty stdout, or `1`: unintelligible
/// - `2`: listen timeout (no speech)
/// - anything else, or a spawn failure: service error
pub struct CommandTranscriber {
    listen_command: Vec<String>,
    calibrate_command: Option<Vec<String>>,
}

impl CommandTranscriber {
    pub fn from_config(cfg: &SttConfig) -> Self {
        Self {
            listen_command: cfg.listen_command.clone(),
            calibrate_command: cfg.calibrate_command.clone(),
        }
    }

    fn run(args: &[String]) -> Result<String, ListenError> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| ListenError::Service("empty command".to_string()))?;
        let output = Process::new(program)
            .args(rest)
            .output()
            .map_err(|e| ListenError::Service(format!("{program}: {e}")))?;

        match output.status.code() {
            Some(0) => {
                let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if text.is_empty() {
                    Err(ListenError::Unintelligible)
                } else {
                    Ok(text)
                }
            }
            Some(1) => Err(ListenError::Unintelligible),
            Some(2) => Err(ListenError::Timeout),
            _ => Err(ListenError::Service(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }
}

impl TranscriptionSource for CommandTranscriber {
    fn listen(&self, params: &ListenParams) -> Result<String, ListenError> {
        let args = substitute(
            &self.listen_command,
            &[
                ("{timeout_s}", seconds(params.timeout)),
                ("{limit_s}", seconds(params.phrase_time_limit)),
            ],
        );
        Self::run(&args)
    }

    fn calibrate(&self, duration: Duration) -> Result<(), ListenError> {
        let Some(command) = &self.calibrate_command else {
            return Ok(());
        };
        let args = substitute(command, &[("{duration_s}", seconds(duration))]);
        Self::run(&args).map(|_| ())
    }
}

fn seconds(duration: Duration) -> String {
    format!("{}", duration.as_secs_f32())
}

fn substitute(command: &[String], replacements: &[(&str, String)]) -> Vec<String> {
    command
        .iter()
        .map(|arg| {
            let mut arg = arg.clone();
            for (placeholder, value) in replacements {
                arg = arg.replace(placeholder, value);
            }
            arg
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ListenParams {
        ListenParams {
            timeout: Duration::from_secs(1),
            phrase_time_limit: Duration::from_secs(3),
        }
    }

    fn transcriber(listen: &[&str]) -> CommandTranscriber {
        CommandTranscriber {
            listen_command: listen.iter().map(|s| s.to_string()).collect(),
            calibrate_command: None,
        }
    }

    #[cfg(unix)]
    #[test]
    fn stdout_text_is_recognized() {
        let t = transcriber(&["sh", "-c", "echo scroll up"]);
        assert_eq!(t.listen(&params()).unwrap(), "scroll up");
    }

    #[cfg(unix)]
    #[test]
    fn empty_stdout_is_unintelligible() {
        let t = transcriber(&["sh", "-c", "true"]);
        assert_eq!(t.listen(&params()), Err(ListenError::Unintelligible));
    }

    #[cfg(unix)]
    #[test]
    fn exit_codes_map_to_taxonomy() {
        let t = transcriber(&["sh", "-c", "exit 1"]);
        assert_eq!(t.listen(&params()), Err(ListenError::Unintelligible));

        let t = transcriber(&["sh", "-c", "exit 2"]);
        assert_eq!(t.listen(&params()), Err(ListenError::Timeout));

        let t = transcriber(&["sh", "-c", "exit 3"]);
        assert!(matches!(t.listen(&params()), Err(ListenError::Service(_))));
    }

    #[test]
    fn missing_binary_is_a_service_error() {
        let t = transcriber(&["definitely-not-a-real-binary-xyz"]);
        assert!(matches!(t.listen(&params()), Err(ListenError::Service(_))));
    }

    #[cfg(unix)]
    #[test]
    fn placeholders_substitute_seconds() {
        let t = transcriber(&["sh", "-c", "echo {timeout_s} {limit_s}"]);
        assert_eq!(t.listen(&params()).unwrap(), "1 3");
    }
}
