//! Phonetic word matching for noisy transcriptions
//!
//! Speech recognizers routinely mishear short words ("eye" as "i", "hey" as
//! "hay"). Matching is data-driven: a table of commonly-confused sounds per
//! canonical token, consumed by pure functions so it can be tested without
//! any audio I/O.

/// Alternate spellings a recognizer commonly produces for a canonical token.
const SIMILAR_SOUNDS: &[(&str, &[&str])] = &[
    ("eye", &["i", "ai", "aye"]),
    ("hey", &["hay", "hi", "he"]),
    ("control", &["controller", "controls", "controll"]),
    ("computer", &["compute", "commuter", "computing"]),
];

fn aliases_for(word: &str) -> Option<&'static [&'static str]> {
    SIMILAR_SOUNDS
        .iter()
        .find(|(canonical, _)| *canonical == word)
        .map(|(_, aliases)| *aliases)
}

/// Whether `text` is phonetically close to `phrase`.
///
/// Both are expected lowercase. The utterance may differ from the phrase by
/// at most one word in length, and each phrase word must appear either as an
/// identical token or through the alias table; all but one word must match.
pub fn phrase_similar(text: &str, phrase: &str) -> bool {
    let phrase_words: Vec<&str> = phrase.split_whitespace().collect();
    let text_words: Vec<&str> = text.split_whitespace().collect();

    if phrase_words.is_empty() {
        return false;
    }
    if phrase_words.len().abs_diff(text_words.len()) > 1 {
        return false;
    }

    let mut matches = 0;
    for phrase_word in &phrase_words {
        if text_words.contains(phrase_word) {
            matches += 1;
            continue;
        }
        if let Some(aliases) = aliases_for(phrase_word) {
            if text_words
                .iter()
                .any(|t| aliases.iter().any(|alias| t.contains(alias)))
            {
                matches += 1;
            }
        }
    }

    matches >= (phrase_words.len() - 1).max(1)
}
