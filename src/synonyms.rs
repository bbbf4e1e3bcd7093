//! Synonym expansion for exercise names
//!
//! An ordered table of substitution patterns turns gym shorthand into the
//! phrasings users actually say: equipment abbreviations, unilateral vs
//! bilateral wording, and common movement aliases. Expansion runs to a
//! fixpoint so chained rewrites compose ("db flat bench" -> "dumbbell flat
//! bench" -> "dumbbell flat bench press").
//!
//! A generative text service can propose extra phrasings; that path is
//! advisory only and silently shrinks the set on any failure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::constants::{GENERATIVE_SYNONYM_TIMEOUT_MS, MAX_GENERATIVE_SYNONYMS};
use crate::normalize::normalize;

/// Hard cap on expanded variants per name; keeps fuzzy scans bounded
const MAX_VARIANTS: usize = 48;

/// Expansion rounds; two compose abbreviation + alias rewrites
const MAX_ROUNDS: usize = 3;

/// Ordered substitution patterns (token-boundary matches, both directions
/// listed explicitly where useful).
///
/// Grouped: equipment abbreviations, movement shorthand, unilateral and
/// bilateral phrasing, spelling and position aliases.
pub const SUBSTITUTION_PATTERNS: &[(&str, &str)] = &[
    // --- equipment abbreviations ---
    ("db", "dumbbell"),
    ("dumbbell", "db"),
    ("dbs", "dumbbells"),
    ("bb", "barbell"),
    ("barbell", "bb"),
    ("kb", "kettlebell"),
    ("kettlebell", "kb"),
    ("tb", "trap bar"),
    ("trap bar", "hex bar"),
    ("hex bar", "trap bar"),
    ("ez", "ez bar"),
    ("bw", "bodyweight"),
    ("bodyweight", "bw"),
    ("sm", "smith machine"),
    ("smith", "smith machine"),
    ("res band", "resistance band"),
    ("band", "resistance band"),
    ("machine", "mach"),
    ("mach", "machine"),
    // --- movement shorthand ---
    ("ohp", "overhead press"),
    ("overhead press", "ohp"),
    ("rdl", "romanian deadlift"),
    ("romanian deadlift", "rdl"),
    ("sldl", "stiff leg deadlift"),
    ("stiff legged deadlift", "stiff leg deadlift"),
    ("bss", "bulgarian split squat"),
    ("bulgarian split squat", "bss"),
    ("ghr", "glute ham raise"),
    ("glute ham raise", "ghr"),
    ("hsp", "handstand push up"),
    ("dl", "deadlift"),
    ("deadlift", "dead lift"),
    ("dead lift", "deadlift"),
    ("gm", "good morning"),
    ("lat pull", "lat pulldown"),
    ("pulldown", "pull down"),
    ("pull down", "pulldown"),
    ("military press", "overhead press"),
    ("shoulder press", "overhead press"),
    ("strict press", "overhead press"),
    ("bench", "bench press"),
    ("flat bench", "flat bench press"),
    ("incline bench", "incline bench press"),
    ("decline bench", "decline bench press"),
    ("hip thrusts", "hip thrust"),
    ("glute bridge", "hip thrust"),
    ("back squat", "squat"),
    ("squat", "back squat"),
    ("air squat", "bodyweight squat"),
    ("farmers walk", "farmer carry"),
    ("farmer s walk", "farmer carry"),
    ("farmers carry", "farmer carry"),
    ("farmer s carry", "farmer carry"),
    // --- unilateral / bilateral phrasing ---
    ("single arm", "one arm"),
    ("one arm", "single arm"),
    ("single leg", "one leg"),
    ("one leg", "single leg"),
    ("unilateral", "single arm"),
    ("alternating", "alt"),
    ("alt", "alternating"),
    ("two arm", "double arm"),
    ("double arm", "two arm"),
    // --- spelling / position aliases ---
    ("flye", "fly"),
    ("fly", "flye"),
    ("flyes", "flies"),
    ("chin up", "chinup"),
    ("chinup", "chin up"),
    ("pull up", "pullup"),
    ("pullup", "pull up"),
    ("push up", "pushup"),
    ("pushup", "push up"),
    ("sit up", "situp"),
    ("situp", "sit up"),
    ("skullcrusher", "skull crusher"),
    ("skull crusher", "lying triceps extension"),
    ("tricep", "triceps"),
    ("triceps pushdown", "triceps press down"),
    ("bicep", "biceps"),
    ("upright row", "high pull"),
    ("bent over row", "barbell row"),
    ("bent row", "barbell row"),
    ("seated row", "seated cable row"),
    ("calf raises", "calf raise"),
    ("rear delt", "reverse"),
    ("hyperextension", "back extension"),
    ("45 degree back extension", "back extension"),
];

/// Replace `from` with `to` at token boundaries; None if `from` absent
fn replace_tokens(name: &str, from: &str, to: &str) -> Option<String> {
    let padded = format!(" {name} ");
    let needle = format!(" {from} ");
    if !padded.contains(&needle) {
        return None;
    }
    let replacement = format!(" {to} ");
    let replaced = padded.replace(&needle, &replacement);
    Some(normalize(&replaced))
}

/// Expand a name into its alternate phrasings
///
/// Output always contains the normalized input, even for empty strings.
pub fn expand(name: &str) -> BTreeSet<String> {
    let base = normalize(name);
    let mut variants: BTreeSet<String> = BTreeSet::new();
    variants.insert(base);

    for _ in 0..MAX_ROUNDS {
        let mut added = false;
        let snapshot: Vec<String> = variants.iter().cloned().collect();

        for variant in &snapshot {
            for (from, to) in SUBSTITUTION_PATTERNS {
                if variants.len() >= MAX_VARIANTS {
                    return variants;
                }
                if let Some(rewritten) = replace_tokens(variant, from, to) {
                    if !rewritten.is_empty() && variants.insert(rewritten) {
                        added = true;
                    }
                }
            }
        }

        if !added {
            break;
        }
    }

    variants
}

// =============================================================================
// Generative augmentation (advisory)
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for the generative-text service used to propose extra phrasings
///
/// Failures, timeouts and unparseable output all degrade to "no extra
/// synonyms"; the caller never observes an error from this path.
pub struct GenerativeSynonyms {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl GenerativeSynonyms {
    /// Returns None when no endpoint is configured
    pub fn from_config(endpoint: &str, model: &str) -> Option<Self> {
        if endpoint.is_empty() {
            return None;
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(GENERATIVE_SYNONYM_TIMEOUT_MS))
            .build()
            .ok()?;
        Some(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Propose additional phrasings for an exercise name
    pub async fn propose(&self, name: &str) -> Vec<String> {
        let prompt = format!(
            "List up to {MAX_GENERATIVE_SYNONYMS} alternate gym names for the exercise \"{name}\". \
             One name per line, no numbering, no commentary."
        );
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
        };

        let url = format!("{}/api/generate", self.endpoint);
        let response = match self.client.post(&url).json(&request).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!("generative synonyms returned status {}", r.status());
                return Vec::new();
            }
            Err(e) => {
                tracing::debug!("generative synonyms unavailable: {}", e);
                return Vec::new();
            }
        };

        let body: GenerateResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("generative synonyms malformed response: {}", e);
                return Vec::new();
            }
        };

        parse_proposals(&body.response)
    }
}

/// Normalize and bound raw model output
fn parse_proposals(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| normalize(line.trim_start_matches(['-', '*', '.', ' '])))
        .filter(|s| !s.is_empty() && s.split_whitespace().count() <= 8)
        .take(MAX_GENERATIVE_SYNONYMS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_table_size() {
        assert!(SUBSTITUTION_PATTERNS.len() >= 60);
    }

    #[test]
    fn test_expand_contains_input() {
        let variants = expand("Goblet Squat");
        assert!(variants.contains("goblet squat"));
    }

    #[test]
    fn test_expand_empty_is_nonempty_set() {
        let variants = expand("");
        assert_eq!(variants.len(), 1);
        assert!(variants.contains(""));
    }

    #[test]
    fn test_expand_equipment_abbreviation() {
        let variants = expand("DB Flat Bench");
        assert!(variants.contains("dumbbell flat bench"));
        // chained rewrite: flat bench -> flat bench press
        assert!(variants.contains("dumbbell flat bench press"));
    }

    #[test]
    fn test_expand_is_token_bounded() {
        // "db" must not fire inside "deadbug"
        let variants = expand("deadbug");
        assert_eq!(variants.len(), 1);
    }

    #[test]
    fn test_expand_unilateral_phrasing() {
        let variants = expand("single arm db row");
        assert!(variants.contains("one arm dumbbell row"));
    }

    #[test]
    fn test_expand_movement_alias() {
        let variants = expand("ohp");
        assert!(variants.contains("overhead press"));
    }

    #[test]
    fn test_expand_deterministic() {
        let a: Vec<String> = expand("kb single arm press").into_iter().collect();
        let b: Vec<String> = expand("kb single arm press").into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_proposals_caps_and_cleans() {
        let raw = "- Chest Flye\n* Pec Fly\n\n1. something way too long to be a real exercise name at all honestly\nCable Crossover";
        let proposals = parse_proposals(raw);
        assert!(proposals.contains(&"chest flye".to_string()));
        assert!(proposals.contains(&"cable crossover".to_string()));
        assert!(proposals.len() <= MAX_GENERATIVE_SYNONYMS);
    }
}
