// Tests for word frequencies and the visible/hidden word diff

use rendergap_core::diff::{
    STOP_WORDS, WordEntry, diff_words, hidden_share, tokenize, word_frequencies,
};

#[test]
fn test_quick_fox_against_empty_static_text() {
    let entries = diff_words("The Quick Fox runs and jumps", "");

    let words: Vec<&str> = entries.iter().map(|e| e.word.as_str()).collect();
    assert_eq!(words, vec!["fox", "jumps", "quick", "runs"]);
    assert!(entries.iter().all(|e| e.weight == 1));
    assert!(entries.iter().all(|e| !e.visible_to_no_script));
}

#[test]
fn test_diff_marks_words_present_in_both() {
    let entries = diff_words(
        "Pricing pricing plans. Contact sales today",
        "Pricing and contact",
    );

    assert_eq!(
        entries,
        vec![
            WordEntry {
                word: "pricing".to_string(),
                weight: 2,
                visible_to_no_script: true,
            },
            WordEntry {
                word: "contact".to_string(),
                weight: 1,
                visible_to_no_script: true,
            },
            WordEntry {
                word: "plans".to_string(),
                weight: 1,
                visible_to_no_script: false,
            },
            WordEntry {
                word: "sales".to_string(),
                weight: 1,
                visible_to_no_script: false,
            },
            WordEntry {
                word: "today".to_string(),
                weight: 1,
                visible_to_no_script: false,
            },
        ]
    );
}

#[test]
fn test_diff_ignores_words_only_in_static_text() {
    let entries = diff_words("alpha", "alpha bravo charlie");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].word, "alpha");
}

#[test]
fn test_diff_never_emits_zero_weight() {
    let samples = [
        "",
        "a an of to",
        "Hello, world! Hello again: 123 abc_def x-y-z",
        "ÜBER straße café naïve résumé",
        "supercalifragilistic averyveryverylongword ok fine",
    ];
    for with_scripting in samples {
        for without in samples {
            assert!(diff_words(with_scripting, without).iter().all(|e| e.weight > 0));
        }
    }
}

#[test]
fn test_filter_rules() {
    let freq = word_frequencies(
        "to cat CATS the and dog_house x1y abcdefghijklmn abcdefghijklmno café",
    );

    assert_eq!(freq.get("cat"), Some(&1));
    assert_eq!(freq.get("cats"), Some(&1));
    // 14 letters is kept, 15 is not
    assert_eq!(freq.get("abcdefghijklmn"), Some(&1));
    assert!(!freq.contains_key("abcdefghijklmno"));
    assert!(!freq.contains_key("to"));
    assert!(!freq.contains_key("the"));
    assert!(!freq.contains_key("and"));
    assert!(!freq.contains_key("dog_house"));
    assert!(!freq.contains_key("x1y"));
    assert!(!freq.contains_key("café"));
}

#[test]
fn test_stop_words_never_counted() {
    let text = STOP_WORDS.join(" ");
    assert!(word_frequencies(&text).is_empty());
}

#[test]
fn test_tokenize_splits_on_non_word_runs() {
    assert_eq!(
        tokenize("Hello,   World!!snake_case--42"),
        vec!["hello", "world", "snake_case", "42"]
    );
    assert!(tokenize("  ...  ").is_empty());
}

#[test]
fn test_tokenize_is_idempotent() {
    let samples = [
        "The Quick Fox runs and jumps",
        "İstanbul ÉTÉ naïve STRASSE",
        "mixed_CASE words, and-dashes; numbers 123abc",
    ];
    for text in samples {
        let once = tokenize(text);
        let twice = tokenize(&once.join(" "));
        assert_eq!(once, twice);
        assert_eq!(word_frequencies(text), word_frequencies(&once.join(" ")));
    }
}

#[test]
fn test_hidden_share() {
    let entries = diff_words("alpha alpha alpha bravo", "bravo");
    assert_eq!(hidden_share(&entries), 0.75);
    assert_eq!(hidden_share(&[]), 0.0);
}
