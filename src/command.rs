//! Canonical commands and the spoken-variation table
//!
//! Every recognized utterance maps to at most one canonical command. The
//! table is declaration-ordered; the first variation that matches wins.
//! Matching runs in two passes: exact substring over the whole table, then -
//! only for short utterances - a partial pass that tolerates one misheard
//! word per variation.

use std::fmt;

use crate::config::ExtraCommand;

/// Canonical command identifiers enqueued from the listener to the
/// controller loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Track,
    StopTracking,
    RightClick,
    DoubleClick,
    ScrollUp,
    ScrollDown,
    EnableFeedback,
    DisableFeedback,
    StartTyping,
    DontType,
    CancelCommandMode,
    ToggleKeyboard,
    LaunchKeyboard,
    CloseKeyboard,
}

impl Command {
    pub fn id(&self) -> &'static str {
        match self {
            Command::Track => "track",
            Command::StopTracking => "stop tracking",
            Command::RightClick => "right click",
            Command::DoubleClick => "double click",
            Command::ScrollUp => "scroll up",
            Command::ScrollDown => "scroll down",
            Command::EnableFeedback => "enable feedback",
            Command::DisableFeedback => "disable feedback",
            Command::StartTyping => "start typing",
            Command::DontType => "dont type",
            Command::CancelCommandMode => "cancel command mode",
            Command::ToggleKeyboard => "toggle keyboard",
            Command::LaunchKeyboard => "launch keyboard",
            Command::CloseKeyboard => "close keyboard",
        }
    }

    pub fn from_id(id: &str) -> Option<Command> {
        ALL.iter().copied().find(|cmd| cmd.id() == id)
    }
}

const ALL: &[Command] = &[
    Command::Track,
    Command::StopTracking,
    Command::RightClick,
    Command::DoubleClick,
    Command::ScrollUp,
    Command::ScrollDown,
    Command::EnableFeedback,
    Command::DisableFeedback,
    Command::StartTyping,
    Command::DontType,
    Command::CancelCommandMode,
    Command::ToggleKeyboard,
    Command::LaunchKeyboard,
    Command::CloseKeyboard,
];

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Declaration-ordered mapping from command to accepted spoken variations.
pub struct CommandTable {
    entries: Vec<(Command, Vec<String>)>,
}

impl CommandTable {
    /// The built-in table. Order matters: earlier entries shadow later ones
    /// when a variation of each appears in the same utterance.
    pub fn builtin() -> Self {
        let entries = vec![
            (
                Command::Track,
                variations(&["track", "tracking", "enable tracking", "start tracking"]),
            ),
            (
                Command::StopTracking,
                variations(&["stop", "stop tracking", "disable tracking", "pause tracking"]),
            ),
            (
                Command::RightClick,
                variations(&["right", "right click", "secondary click"]),
            ),
            (
                Command::DoubleClick,
                variations(&["double", "double click", "twice"]),
            ),
            (
                Command::ScrollUp,
                variations(&["up", "scroll up", "page up"]),
            ),
            (
                Command::ScrollDown,
                variations(&["down", "scroll down", "page down"]),
            ),
            (
                Command::EnableFeedback,
                variations(&["enable feedback", "turn on feedback", "feedback on"]),
            ),
            (
                Command::DisableFeedback,
                variations(&["disable feedback", "turn off feedback", "feedback off", "quiet"]),
            ),
            (
                Command::StartTyping,
                variations(&["type", "typing", "start typing", "dictate"]),
            ),
            (
                Command::DontType,
                variations(&["stop typing", "end typing", "dont type", "exit typing", "cancel typing"]),
            ),
            (
                Command::CancelCommandMode,
                variations(&["cancel", "exit", "stop listening", "stop commands"]),
            ),
            (
                Command::ToggleKeyboard,
                variations(&["keyboard", "show keyboard", "toggle keyboard", "on screen keyboard"]),
            ),
            (
                Command::LaunchKeyboard,
                variations(&["launch keyboard", "open keyboard", "system keyboard", "windows keyboard"]),
            ),
            (
                Command::CloseKeyboard,
                variations(&["close keyboard", "hide keyboard"]),
            ),
        ];
        Self { entries }
    }

    /// Built-in table plus extra variations from config. Unknown canonical
    /// ids are skipped with a warning.
    pub fn with_extras(extra: &[ExtraCommand]) -> Self {
        let mut table = Self::builtin();
        for item in extra {
            let Some(command) = Command::from_id(&item.command) else {
                eprintln!("[voice] unknown command id in config: {:?}", item.command);
                continue;
            };
            if let Some((_, vars)) = table.entries.iter_mut().find(|(cmd, _)| *cmd == command) {
                vars.push(item.phrase.to_lowercase());
            }
        }
        table
    }

    /// Resolve an utterance to a canonical command.
    ///
    /// Pass 1: first variation appearing as a substring, in table order.
    /// Pass 2 (utterances of at most three words): first variation with all
    /// but one of its words present in the utterance's word set.
    pub fn parse(&self, text: &str) -> Option<Command> {
        let text = text.to_lowercase();
        let text = text.trim();

        for (command, vars) in &self.entries {
            if vars.iter().any(|v| text.contains(v.as_str())) {
                return Some(*command);
            }
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= 3 {
            for (command, vars) in &self.entries {
                for variation in vars {
                    let var_words: Vec<&str> = variation.split_whitespace().collect();
                    let matched = var_words.iter().filter(|w| words.contains(*w)).count();
                    if matched >= (var_words.len() - 1).max(1) {
                        return Some(*command);
                    }
                }
            }
        }

        None
    }

    /// Whether the text speaks any "dont type" variation. Checked for every
    /// utterance while dictation is active, independent of wake state.
    pub fn speaks_stop_typing(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.entries
            .iter()
            .find(|(cmd, _)| *cmd == Command::DontType)
            .is_some_and(|(_, vars)| vars.iter().any(|v| text.contains(v.as_str())))
    }
}

fn variations(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_substring_wins() {
        let table = CommandTable::builtin();
        assert_eq!(table.parse("right click"), Some(Command::RightClick));
        assert_eq!(table.parse("please scroll down"), Some(Command::ScrollDown));
        assert_eq!(table.parse("DICTATE"), Some(Command::StartTyping));
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let table = CommandTable::builtin();
        // "stop tracking" contains both the StopTracking variation "stop"
        // and the full phrase; StopTracking is declared before DontType, so
        // even "stop typing" resolves to it in the ambient parse
        assert_eq!(table.parse("stop tracking"), Some(Command::StopTracking));
        assert_eq!(table.parse("stop typing"), Some(Command::StopTracking));
    }

    #[test]
    fn short_utterance_tolerates_one_misheard_word() {
        let table = CommandTable::builtin();
        // "skroll up" resolves in pass 1 already: the short variation "up"
        // is a substring of the utterance
        assert_eq!(table.parse("skroll up"), Some(Command::ScrollUp));
        // genuinely exercises pass 2: no variation is a substring of
        // "secondary klick", but "secondary" covers all-but-one word of
        // "secondary click"
        assert_eq!(table.parse("secondary klick"), Some(Command::RightClick));
    }

    #[test]
    fn long_unmatched_utterance_returns_none() {
        let table = CommandTable::builtin();
        assert_eq!(table.parse("would you kindly make me a sandwich"), None);
    }

    #[test]
    fn unmatched_short_utterance_returns_none() {
        let table = CommandTable::builtin();
        assert_eq!(table.parse("hello there"), None);
    }

    #[test]
    fn stop_typing_phrase_detected_inside_sentence() {
        let table = CommandTable::builtin();
        assert!(table.speaks_stop_typing("please stop typing now"));
        assert!(table.speaks_stop_typing("END TYPING"));
        assert!(!table.speaks_stop_typing("keep going"));
    }

    #[test]
    fn extras_extend_existing_entries() {
        let extra = vec![crate::config::ExtraCommand {
            command: "scroll up".to_string(),
            phrase: "wheel up".to_string(),
        }];
        let table = CommandTable::with_extras(&extra);
        assert_eq!(table.parse("wheel up"), Some(Command::ScrollUp));
    }

    #[test]
    fn command_ids_round_trip() {
        for cmd in super::ALL {
            assert_eq!(Command::from_id(cmd.id()), Some(*cmd));
        }
        assert_eq!(Command::from_id("bogus"), None);
    }
}
