//! Trigger-phrase classification
//!
//! The wake phrase is a greeting with many phonetic spellings, and the
//! recognizer mangles it freely. Transcripts are lowercased, stripped of
//! everything outside Cyrillic а-я (plus ё) and Latin a-z, and matched
//! by substring containment against the known spellings.

/// Spellings recognized as the wake phrase
pub const TRIGGER_WORDS: &[&str] = &[
    "салам",
    "салям",
    "салями",
    "сәлем",
    "селям",
    "селам",
    "саламчик",
    "салем",
    "саламка",
    "салямка",
    "салямчик",
    "саламалейкум",
    "салямалейкум",
];

/// Lowercase and keep only Cyrillic а-я, ё and Latin a-z
#[must_use]
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| matches!(c, 'а'..='я' | 'ё' | 'a'..='z'))
        .collect()
}

/// Whether a transcript contains any trigger spelling
#[must_use]
pub fn is_trigger(text: &str) -> bool {
    let normalized = normalize(text);
    TRIGGER_WORDS.iter().any(|word| normalized.contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_punctuation_and_digits() {
        assert_eq!(normalize("Салам, мир! 123"), "саламмир");
        assert_eq!(normalize("  ё-моё  "), "ёмоё");
        assert_eq!(normalize("hello_WORLD"), "helloworld");
    }

    #[test]
    fn trigger_survives_recognizer_punctuation() {
        assert!(is_trigger("Салям!"));
        assert!(is_trigger("са-лам"));
        assert!(is_trigger("САЛАМ АЛЕЙКУМ"));
    }

    #[test]
    fn trigger_matches_inside_a_sentence() {
        assert!(is_trigger("ну салам тебе добрый человек"));
        assert!(is_trigger("я сказал салямчик"));
    }

    #[test]
    fn ordinary_speech_does_not_trigger() {
        assert!(!is_trigger("привет мир"));
        assert!(!is_trigger("как дела"));
        assert!(!is_trigger(""));
        assert!(!is_trigger("сала"));
    }
}
