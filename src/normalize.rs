//! Exercise name normalization and phonetic keys
//!
//! `normalize` is the single canonical string form used for exact lookups,
//! index keys and the store's uniqueness constraint. Everything that touches
//! a name goes through it first.

use crate::constants::PHONETIC_KEY_LEN;

/// Normalize a free-text exercise phrase
///
/// Lower-cases, strips punctuation, collapses runs of whitespace to single
/// spaces. Digits are preserved ("21s" is a real curl variation). Pure
/// function; empty input yields an empty string.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true;

    for c in raw.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }

    while out.ends_with(' ') {
        out.pop();
    }

    out
}

/// Fixed-length consonant-skeleton phonetic key
///
/// Keeps the leading character, drops subsequent vowels, collapses repeated
/// consonants, pads with '0' to [`PHONETIC_KEY_LEN`]. Spaces are ignored so
/// "pullup" and "pull up" share a key.
pub fn phonetic_key(name: &str) -> String {
    let normalized = normalize(name);
    let mut key = String::with_capacity(PHONETIC_KEY_LEN);
    let mut prev: Option<char> = None;

    for c in normalized.chars() {
        if key.len() >= PHONETIC_KEY_LEN {
            break;
        }
        if c == ' ' || c.is_numeric() {
            prev = None;
            continue;
        }

        let is_vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u');
        if key.is_empty() {
            key.push(c);
        } else if !is_vowel && prev != Some(c) {
            key.push(c);
        }
        prev = Some(c);
    }

    while key.len() < PHONETIC_KEY_LEN {
        key.push('0');
    }

    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("Dumbbell Bench Press"), "dumbbell bench press");
        assert_eq!(normalize("  BARBELL   squat "), "barbell squat");
    }

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize("farmer's carry"), "farmer s carry");
        assert_eq!(normalize("push-up (weighted)"), "push up weighted");
    }

    #[test]
    fn test_normalize_preserves_digits() {
        assert_eq!(normalize("21s Barbell Curl"), "21s barbell curl");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  --  "), "");
    }

    #[test]
    fn test_phonetic_key_fixed_length() {
        assert_eq!(phonetic_key("squat").len(), PHONETIC_KEY_LEN);
        assert_eq!(phonetic_key("x").len(), PHONETIC_KEY_LEN);
        assert_eq!(phonetic_key("").len(), PHONETIC_KEY_LEN);
    }

    #[test]
    fn test_phonetic_key_ignores_spacing() {
        assert_eq!(phonetic_key("pull up"), phonetic_key("pullup"));
        assert_eq!(phonetic_key("chin-up"), phonetic_key("chinup"));
    }

    #[test]
    fn test_phonetic_key_collapses_duplicates() {
        // "dumbbell" -> d, m, b, l: duplicate b run collapses
        let key = phonetic_key("dumbbell");
        assert_eq!(key, "dmbl00");
    }
}
