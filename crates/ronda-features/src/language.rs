//! Lightweight language identification for titles and descriptions.
//!
//! Non-Latin scripts map directly to a language. Latin text is resolved by
//! counting stop words from a handful of high-volume languages. Anything
//! ambiguous is reported as [`UNKNOWN_LANGUAGE`].

use std::cmp::Reverse;
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

/// Label returned when detection fails.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Fewest letters worth classifying.
const MIN_LETTERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Script {
    Latin,
    Greek,
    Cyrillic,
    Hebrew,
    Arabic,
    Devanagari,
    Thai,
    Hangul,
    Kana,
    Han,
}

impl Script {
    fn of(c: char) -> Option<Self> {
        if !c.is_alphabetic() {
            return None;
        }
        let script = match u32::from(c) {
            0x0041..=0x024F | 0x1E00..=0x1EFF => Self::Latin,
            0x0370..=0x03FF | 0x1F00..=0x1FFF => Self::Greek,
            0x0400..=0x052F => Self::Cyrillic,
            0x0590..=0x05FF => Self::Hebrew,
            0x0600..=0x06FF | 0x0750..=0x077F => Self::Arabic,
            0x0900..=0x097F => Self::Devanagari,
            0x0E00..=0x0E7F => Self::Thai,
            0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF => Self::Hangul,
            0x3040..=0x30FF | 0x31F0..=0x31FF => Self::Kana,
            0x3400..=0x4DBF | 0x4E00..=0x9FFF => Self::Han,
            _ => return None,
        };
        Some(script)
    }

    const fn language(self) -> Option<&'static str> {
        match self {
            Self::Latin => None,
            Self::Greek => Some("el"),
            Self::Cyrillic => Some("ru"),
            Self::Hebrew => Some("he"),
            Self::Arabic => Some("ar"),
            Self::Devanagari => Some("hi"),
            Self::Thai => Some("th"),
            Self::Hangul => Some("ko"),
            Self::Kana => Some("ja"),
            Self::Han => Some("zh"),
        }
    }
}

const STOP_WORDS: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "and", "is", "are", "of", "to", "in", "this", "that", "with", "for", "you",
            "how", "what", "my", "your", "it", "was", "on", "i",
        ],
    ),
    (
        "es",
        &[
            "el", "la", "los", "las", "de", "que", "y", "en", "un", "una", "por", "con", "para",
            "es", "del", "cómo", "qué", "mi", "lo", "muy",
        ],
    ),
    (
        "pt",
        &[
            "o", "os", "as", "de", "que", "e", "do", "da", "em", "um", "uma", "para", "com",
            "não", "é", "como", "meu", "dos", "das", "você",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "de", "des", "et", "est", "un", "une", "pour", "avec", "dans",
            "que", "qui", "ce", "pas", "du", "comment", "je", "vous",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "mit", "für", "auf", "den",
            "zu", "ich", "wie", "von", "dem", "sie", "es", "im",
        ],
    ),
    (
        "it",
        &[
            "il", "lo", "la", "gli", "le", "di", "e", "che", "un", "una", "per", "con", "non",
            "è", "come", "del", "della", "sono", "questo", "io",
        ],
    ),
    (
        "id",
        &[
            "yang", "dan", "di", "ini", "itu", "dengan", "untuk", "tidak", "dari", "ke", "cara",
            "apa", "saya", "kamu", "ada", "akan", "bisa", "juga", "sudah", "aku",
        ],
    ),
];

/// Detect the language of a piece of text.
///
/// Returns an ISO 639-1 code, or [`UNKNOWN_LANGUAGE`] when the text has fewer
/// than three letters or the stop-word vote for Latin text has no single
/// winner.
///
/// # Example
///
/// ```
/// use ronda_features::language::detect_language;
///
/// assert_eq!(detect_language("How to cook the perfect steak"), "en");
/// assert_eq!(detect_language("Как приготовить стейк"), "ru");
/// assert_eq!(detect_language("ok"), "unknown");
/// ```
pub fn detect_language(text: &str) -> &'static str {
    let mut counts: HashMap<Script, usize> = HashMap::new();
    for script in text.chars().filter_map(Script::of) {
        *counts.entry(script).or_default() += 1;
    }

    let letters: usize = counts.values().sum();
    if letters < MIN_LETTERS {
        return UNKNOWN_LANGUAGE;
    }

    let Some((&dominant, _)) = counts
        .iter()
        .max_by_key(|(script, count)| (**count, Reverse(**script)))
    else {
        return UNKNOWN_LANGUAGE;
    };

    // Japanese mixes kanji with kana; any kana at all decides it.
    if dominant == Script::Han && counts.contains_key(&Script::Kana) {
        return "ja";
    }

    match dominant.language() {
        Some(code) => code,
        None => vote_latin(text),
    }
}

fn vote_latin(text: &str) -> &'static str {
    let words: Vec<String> = text.unicode_words().map(str::to_lowercase).collect();

    let mut best: Option<(&'static str, usize)> = None;
    let mut tied = false;
    for (code, stop_words) in STOP_WORDS {
        let hits = words
            .iter()
            .filter(|w| stop_words.contains(&w.as_str()))
            .count();
        match best {
            Some((_, top)) if hits == top => tied = true,
            Some((_, top)) if hits < top => {}
            _ => {
                best = Some((code, hits));
                tied = false;
            }
        }
    }

    match best {
        Some((code, hits)) if hits > 0 && !tied => code,
        _ => UNKNOWN_LANGUAGE,
    }
}
