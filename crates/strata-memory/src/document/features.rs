//! Tag extraction: function mentions, concept categories, difficulty.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{ContentType, Difficulty};

/// Functions recognized in bare call form, e.g. `sound("bd")`.
const CALL_FORMS: &[&str] = &["sound", "note", "setcpm", "samples", "n", "freq"];

/// Marker that opens a pattern line.
const PATTERN_MARKER: &str = "$:";

/// Concept categories and their keywords, matched as lowercase substrings.
pub const CONCEPT_TAXONOMY: &[(&str, &[&str])] = &[
    (
        "rhythm_timing",
        &["rhythm", "beat", "tempo", "cycle", "timing", "euclidean", "polyrhythm", "polymeter"],
    ),
    (
        "melody_harmony",
        &["note", "chord", "scale", "pitch", "melody", "harmony", "interval", "key", "mode"],
    ),
    (
        "audio_effects",
        &["reverb", "delay", "echo", "chorus", "phaser", "distortion", "filter", "eq", "compression"],
    ),
    (
        "synthesis",
        &["oscillator", "waveform", "fm", "additive", "subtractive", "wavetable", "granular"],
    ),
    (
        "sampling",
        &["sample", "bank", "loop", "chop", "slice", "drum machine", "break", "one-shot"],
    ),
    (
        "pattern_structure",
        &["sequence", "pattern", "stack", "layer", "parallel", "alternation", "repetition"],
    ),
    (
        "live_coding",
        &["live coding", "improvisation", "performance", "real-time", "interactive"],
    ),
    (
        "mini_notation",
        &["mini-notation", "brackets", "angles", "multiplication", "subdivision", "euclidean"],
    ),
];

const BEGINNER_KEYWORDS: &[&str] = &[
    "first",
    "basic",
    "introduction",
    "getting started",
    "simple",
    "beginner",
];

/// Matched as whole words, so `osc` does not fire on "oscillator".
const ADVANCED_KEYWORDS: &[&str] = &[
    "advanced",
    "complex",
    "synthesis",
    "fm",
    "wavetable",
    "midi",
    "osc",
];

/// A code example sharing no function with its chunk is still kept while
/// fewer than this many have been kept.
const MIN_CODE_EXAMPLES: usize = 3;

static ADVANCED_RE: LazyLock<Regex> = LazyLock::new(|| {
    let words = ADVANCED_KEYWORDS.join("|");
    Regex::new(&format!(r"\b({words})\b")).expect("advanced keyword regex is valid")
});

static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let names = CALL_FORMS.join("|");
    Regex::new(&format!(r"\b({names})\(")).expect("call form regex is valid")
});

static METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(\w+)\(").expect("method chain regex is valid"));

static ESCAPED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\([\[\]*~+\-()<>,:!@&|/])").expect("escape regex is valid")
});

/// Undo double-escaped markup left over from scraping, e.g. `\[` becomes `[`.
#[must_use]
pub fn unescape_markup(text: &str) -> String {
    ESCAPED_RE.replace_all(text, "$1").into_owned()
}

/// Sorted, de-duplicated function names mentioned in `text`.
#[must_use]
pub fn extract_functions(text: &str) -> Vec<String> {
    let mut found = BTreeSet::new();
    for caps in CALL_RE.captures_iter(text) {
        found.insert(caps[1].to_owned());
    }
    for caps in METHOD_RE.captures_iter(text) {
        found.insert(caps[1].to_owned());
    }
    if text.contains(PATTERN_MARKER) {
        found.insert(PATTERN_MARKER.to_owned());
    }
    found.into_iter().collect()
}

/// Concept categories with at least one keyword in `text`, in taxonomy order.
#[must_use]
pub fn extract_concepts(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    CONCEPT_TAXONOMY
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(name, _)| (*name).to_owned())
        .collect()
}

#[must_use]
pub fn classify_difficulty(text: &str, function_count: usize) -> Difficulty {
    let lower = text.to_lowercase();
    if ADVANCED_RE.is_match(&lower) || function_count > 8 {
        Difficulty::Advanced
    } else if function_count > 4 {
        Difficulty::Intermediate
    } else if BEGINNER_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Difficulty::Beginner
    } else {
        Difficulty::Intermediate
    }
}

#[must_use]
pub fn content_type(functions: &[String]) -> ContentType {
    if functions.len() >= 2 {
        ContentType::Code
    } else {
        ContentType::Text
    }
}

/// Code examples relevant to a chunk mentioning `functions`.
#[must_use]
pub fn select_code_examples(examples: &[String], functions: &[String]) -> Vec<String> {
    let mut kept = Vec::new();
    for example in examples {
        let shares_function = extract_functions(example)
            .iter()
            .any(|f| functions.contains(f));
        if shares_function || kept.len() < MIN_CODE_EXAMPLES {
            kept.push(example.clone());
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_removes_backslashes() {
        assert_eq!(unescape_markup(r"\[bd sd\]\*2"), "[bd sd]*2");
        assert_eq!(unescape_markup(r"\<a b\> \, c\:d"), "<a b> , c:d");
        assert_eq!(unescape_markup(r"x \n y"), r"x \n y");
    }

    #[test]
    fn extracts_call_and_method_forms() {
        let text = r#"$: sound("bd sd").bank("tr909").lpf(800)"#;
        let f = extract_functions(text);
        assert_eq!(f, vec!["$:", "bank", "lpf", "sound"]);
    }

    #[test]
    fn call_form_requires_word_boundary() {
        assert!(extract_functions("often(").is_empty());
        assert_eq!(extract_functions("n(\"0 2\")"), vec!["n"]);
    }

    #[test]
    fn method_chain_adds_unknown_methods() {
        let f = extract_functions("x.customThing(1)");
        assert_eq!(f, vec!["customThing"]);
    }

    #[test]
    fn no_functions_in_prose() {
        assert!(extract_functions("Plain prose without calls.").is_empty());
    }

    #[test]
    fn concepts_in_taxonomy_order() {
        let c = extract_concepts("Add some Reverb to the drum machine beat");
        assert_eq!(c, vec!["rhythm_timing", "audio_effects", "sampling"]);
    }

    #[test]
    fn concepts_empty_text() {
        assert!(extract_concepts("").is_empty());
    }

    #[test]
    fn difficulty_advanced_keyword_wins() {
        assert_eq!(
            classify_difficulty("A basic intro to FM", 0),
            Difficulty::Advanced
        );
    }

    #[test]
    fn advanced_keywords_match_whole_words() {
        assert_eq!(
            classify_difficulty("A simple oscillator and some formants", 0),
            Difficulty::Beginner
        );
        assert_eq!(
            classify_difficulty("A simple way to send OSC messages", 0),
            Difficulty::Advanced
        );
        assert_eq!(
            classify_difficulty("basic midi input", 0),
            Difficulty::Advanced
        );
    }

    #[test]
    fn difficulty_by_function_count() {
        assert_eq!(classify_difficulty("text", 9), Difficulty::Advanced);
        assert_eq!(classify_difficulty("basic text", 5), Difficulty::Intermediate);
        assert_eq!(classify_difficulty("basic text", 2), Difficulty::Beginner);
        assert_eq!(classify_difficulty("text", 2), Difficulty::Intermediate);
    }

    #[test]
    fn content_type_threshold() {
        assert_eq!(content_type(&["a".into()]), ContentType::Text);
        assert_eq!(content_type(&["a".into(), "b".into()]), ContentType::Code);
    }

    #[test]
    fn code_examples_relevance() {
        let examples: Vec<String> = vec![
            "a.x()".into(),
            "b.y()".into(),
            "c.z()".into(),
            "d.w()".into(),
            "sound(\"bd\")".into(),
        ];
        let kept = select_code_examples(&examples, &["sound".to_owned()]);
        assert_eq!(kept, vec!["a.x()", "b.y()", "c.z()", "sound(\"bd\")"]);
    }
}
