//! Terminal status line over the controller snapshot

use std::io::Write;

use crate::controller::ControllerSnapshot;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn status_line(snapshot: &ControllerSnapshot, frame: usize) {
    let tracking = if snapshot.tracking_enabled {
        "\x1b[32mtracking\x1b[0m"
    } else {
        "\x1b[31mpaused\x1b[0m"
    };
    let listening = if snapshot.actively_listening {
        SPINNER[frame % SPINNER.len()]
    } else {
        " "
    };
    let wake = match snapshot.wake_remaining {
        Some(remaining) if snapshot.wake_word_active => {
            format!(" \x1b[33mcmd {}s\x1b[0m", remaining.as_secs())
        }
        _ => String::new(),
    };
    let typing = if snapshot.typing_mode {
        " \x1b[36mtyping\x1b[0m"
    } else {
        ""
    };
    let holding = if snapshot.holding_click {
        " \x1b[31mhold\x1b[0m"
    } else {
        ""
    };
    let heard = truncate(&snapshot.last_heard, 40);

    print!(
        "\r\x1b[K{} {}{}{}{} blinks:{} \x1b[90m{}\x1b[0m",
        listening, tracking, wake, typing, holding, snapshot.blink_count, heard
    );
    std::io::stdout().flush().ok();
}

pub fn clear_line() {
    print!("\r\x1b[K");
    std::io::stdout().flush().ok();
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 40), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("héllo", 2), "hé");
    }
}
