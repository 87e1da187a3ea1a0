//! Word frequencies of the two renders and which words a non-scripting
//! crawler misses.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const STOP_WORDS: [&str; 11] = [
    "the", "and", "for", "with", "from", "this", "that", "have", "not", "but", "are",
];

pub type WordFrequencyMap = HashMap<String, usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub weight: usize,
    pub visible_to_no_script: bool,
}

/// Lowercase `text` and split it on runs of characters that are neither
/// alphanumeric nor `_`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_countable(word: &str) -> bool {
    word.len() > 2
        && word.len() < 15
        && word.bytes().all(|b| b.is_ascii_lowercase())
        && !STOP_WORDS.contains(&word)
}

pub fn word_frequencies(text: &str) -> WordFrequencyMap {
    let mut frequencies = WordFrequencyMap::new();
    for token in tokenize(text) {
        if is_countable(&token) {
            *frequencies.entry(token).or_insert(0) += 1;
        }
    }
    frequencies
}

/// One entry per word of the scripted text, weighted by its count there and
/// flagged when the unscripted text has it too. Heaviest words first, ties
/// broken alphabetically.
pub fn diff_words(with_scripting: &str, without_scripting: &str) -> Vec<WordEntry> {
    let rendered = word_frequencies(with_scripting);
    let initial = word_frequencies(without_scripting);

    let mut entries: Vec<WordEntry> = rendered
        .into_iter()
        .filter(|(_, weight)| *weight > 0)
        .map(|(word, weight)| {
            let visible_to_no_script = initial.get(&word).is_some_and(|n| *n > 0);
            WordEntry {
                word,
                weight,
                visible_to_no_script,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.word.cmp(&b.word)));
    entries
}

/// Fraction (0..=1) of the total weight carried by words the unscripted
/// render does not contain.
pub fn hidden_share(entries: &[WordEntry]) -> f64 {
    let total: usize = entries.iter().map(|e| e.weight).sum();
    if total == 0 {
        return 0.0;
    }
    let hidden: usize = entries
        .iter()
        .filter(|e| !e.visible_to_no_script)
        .map(|e| e.weight)
        .sum();
    hidden as f64 / total as f64
}
