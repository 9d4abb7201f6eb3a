//! Banned-word check for review content.

use crate::config::ReviewSettings;
use thiserror::Error;

/// Content contained one or more banned words.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", profane_message(.words))]
pub struct ProfaneContentError {
    pub words: Vec<String>,
}

fn profane_message(words: &[String]) -> String {
    let masked: Vec<String> = words
        .iter()
        .map(|w| format!("\"{}\"", mask_word(w)))
        .collect();
    match masked.as_slice() {
        [only] => format!("The word {only} is not allowed here."),
        _ => format!("The words {} are not allowed here.", text_list(&masked, "and")),
    }
}

/// Keeps the first and last character and replaces each one in between with
/// a dash: `"heck"` becomes `"h--k"`. Two-letter words have nothing in
/// between and come back unchanged. A single letter is both first and last,
/// so `"a"` becomes `"aa"`.
pub fn mask_word(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    match chars.as_slice() {
        [] => String::new(),
        [only] => [*only, *only].iter().collect(),
        [first, middle @ .., last] => {
            let mut masked = String::with_capacity(word.len());
            masked.push(*first);
            masked.extend(std::iter::repeat('-').take(middle.len()));
            masked.push(*last);
            masked
        }
    }
}

/// `["a", "b", "c"]` becomes `a, b and c`.
fn text_list(items: &[String], last_word: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} {last_word} {last}", init.join(", ")),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordFilter {
    allow_profanities: bool,
    banned_words: Vec<String>,
}

impl WordFilter {
    pub fn new(allow_profanities: bool, banned_words: impl IntoIterator<Item = String>) -> Self {
        let mut words: Vec<String> = Vec::new();
        for word in banned_words {
            let word = word.trim().to_lowercase();
            if !word.is_empty() && !words.contains(&word) {
                words.push(word);
            }
        }
        Self {
            allow_profanities,
            banned_words: words,
        }
    }

    pub fn from_settings(settings: &ReviewSettings) -> Self {
        Self::new(settings.allow_profanities, settings.banned_words.iter().cloned())
    }

    /// Fails with every banned word found in `content`, in configured order.
    pub fn check(&self, content: &str) -> Result<(), ProfaneContentError> {
        if self.allow_profanities {
            return Ok(());
        }
        let lowered = content.to_lowercase();
        let words: Vec<String> = self
            .banned_words
            .iter()
            .filter(|w| lowered.contains(w.as_str()))
            .cloned()
            .collect();
        if words.is_empty() {
            Ok(())
        } else {
            Err(ProfaneContentError { words })
        }
    }
}
