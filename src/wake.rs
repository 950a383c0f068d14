//! Wake phrase detection - checks transcribed text for any configured phrase

use crate::fuzzy;

/// The configured wake phrases, normalized to lowercase at load time.
pub struct WakeSet {
    phrases: Vec<String>,
}

impl WakeSet {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Check whether the text contains a wake phrase, either as an exact
    /// substring or through phonetic similarity ("i control" for
    /// "eye control").
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.phrases
            .iter()
            .any(|phrase| text.contains(phrase.as_str()) || fuzzy::phrase_similar(&text, phrase))
    }

    /// The phrase announced to the user at startup.
    pub fn primary(&self) -> &str {
        self.phrases.first().map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wake_set() -> WakeSet {
        WakeSet::new(&[
            "hey computer".to_string(),
            "computer".to_string(),
            "eye control".to_string(),
        ])
    }

    #[test]
    fn exact_substring_matches() {
        let wake = wake_set();
        assert!(wake.matches("computer scroll up"));
        assert!(wake.matches("hey computer"));
        assert!(wake.matches("ok EYE CONTROL please"));
    }

    #[test]
    fn phonetic_similarity_matches() {
        let wake = wake_set();
        assert!(wake.matches("i control"));
        assert!(wake.matches("hay computer"));
    }

    #[test]
    fn unrelated_text_does_not_match() {
        let wake = wake_set();
        assert!(!wake.matches("gold duck"));
        assert!(!wake.matches(""));
    }

    #[test]
    fn primary_is_first_phrase() {
        assert_eq!(wake_set().primary(), "hey computer");
    }
}
