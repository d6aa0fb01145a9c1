use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use super::tokenize;

/// Word polarity, -3 (very negative) to +3 (very positive)
static LEXICON: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    let entries: &[(&str, f64)] = &[
        // positive
        ("good", 2.0),
        ("great", 3.0),
        ("excellent", 3.0),
        ("awesome", 3.0),
        ("amazing", 3.0),
        ("happy", 2.5),
        ("glad", 2.0),
        ("pleased", 2.0),
        ("thanks", 2.0),
        ("thank", 2.0),
        ("appreciate", 2.0),
        ("appreciated", 2.0),
        ("love", 3.0),
        ("nice", 2.0),
        ("perfect", 3.0),
        ("success", 2.0),
        ("successful", 2.0),
        ("resolved", 1.5),
        ("approved", 1.5),
        ("complete", 1.0),
        ("completed", 1.0),
        ("congratulations", 3.0),
        ("welcome", 1.5),
        ("helpful", 2.0),
        ("easy", 1.0),
        ("fine", 1.0),
        ("ok", 0.5),
        ("on-time", 1.5),
        ("improved", 1.5),
        ("win", 2.0),
        ("benefit", 1.5),
        ("enjoy", 2.0),
        ("excited", 2.5),
        ("confirm", 0.5),
        ("confirmed", 1.0),
        // negative
        ("bad", -2.5),
        ("poor", -2.0),
        ("terrible", -3.0),
        ("awful", -3.0),
        ("horrible", -3.0),
        ("angry", -3.0),
        ("upset", -2.0),
        ("disappointed", -2.0),
        ("disappointing", -2.0),
        ("unhappy", -2.0),
        ("sorry", -1.0),
        ("problem", -1.5),
        ("problems", -1.5),
        ("issue", -1.0),
        ("issues", -1.0),
        ("error", -1.5),
        ("errors", -1.5),
        ("fail", -2.0),
        ("failed", -2.0),
        ("failure", -2.0),
        ("broken", -2.0),
        ("late", -1.5),
        ("delay", -1.5),
        ("delayed", -1.5),
        ("overdue", -2.0),
        ("urgent", -1.0),
        ("complaint", -2.0),
        ("cancel", -1.0),
        ("cancelled", -1.5),
        ("rejected", -2.0),
        ("damage", -2.0),
        ("damaged", -2.0),
        ("missing", -1.5),
        ("wrong", -2.0),
        ("worse", -2.5),
        ("worst", -3.0),
        ("hate", -3.0),
        ("unacceptable", -3.0),
        ("frustrated", -2.5),
        ("concern", -1.0),
        ("concerned", -1.5),
        ("risk", -1.0),
        ("unfortunately", -1.5),
    ];
    entries.iter().copied().collect()
});

static NEGATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "not", "no", "never", "none", "nothing", "neither", "nor", "without", "dont", "don't",
        "doesn't", "didn't", "isn't", "wasn't", "aren't", "weren't", "won't", "can't", "cannot",
        "couldn't", "shouldn't", "wouldn't", "hasn't", "haven't",
    ]
    .into_iter()
    .collect()
});

/// A negation flips polarity of sentiment words within this many tokens
const NEGATION_WINDOW: usize = 3;

/// Normalization constant, larger values flatten the curve
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Sentiment of a text in [-1, 1]; 0 when no sentiment word is found
pub fn score(text: &str) -> f64 {
    let tokens = tokenize(text);
    let mut total = 0.0;
    let mut negation_left = 0usize;

    for token in &tokens {
        if NEGATIONS.contains(token.as_str()) {
            negation_left = NEGATION_WINDOW;
            continue;
        }

        if let Some(&weight) = LEXICON.get(token.as_str()) {
            total += if negation_left > 0 { -weight * 0.75 } else { weight };
        }

        negation_left = negation_left.saturating_sub(1);
    }

    normalize(total)
}

fn normalize(total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    total / (total * total + NORMALIZATION_ALPHA).sqrt()
}
