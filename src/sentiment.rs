// src/sentiment.rs
//! Deterministic lexicon scorer for headline text.
//!
//! Each token found in the embedded lexicon contributes its valence. A negator
//! in the previous 1..=3 tokens flips and dampens it, and a booster/dampener
//! directly in front scales it. The raw sum is squashed into (-1, 1) with
//! `s / sqrt(s^2 + ALPHA)`. No clock, no randomness, no I/O: the same text
//! always yields the same score.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

static LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid sentiment lexicon")
});

/// Normalization constant for the compound score.
const ALPHA: f64 = 15.0;
/// Applied to a valence when a negator precedes it.
const NEGATION_SCALAR: f64 = -0.74;
/// Added (or removed) magnitude for boosters/dampeners.
const BOOST_STEP: f64 = 0.293;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreError {
    #[error("cannot score empty text")]
    EmptyText,
}

/// Seam between the orchestrator and the scoring algorithm.
pub trait Scorer: Send + Sync {
    fn score(&self, text: &str) -> Result<f64, ScoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Lexicon valence for a token (0.0 if unknown).
    #[inline]
    fn word_score(&self, w: &str) -> f64 {
        LEXICON.get(w).copied().unwrap_or(0.0)
    }

    /// Returns (raw valence sum, number of tokens).
    pub fn score_text(&self, text: &str) -> (f64, usize) {
        // Collected because negation looks backwards.
        let tokens: Vec<String> = tokenize(text).collect();
        let mut sum = 0.0_f64;

        for i in 0..tokens.len() {
            let mut valence = self.word_score(tokens[i].as_str());
            if valence == 0.0 {
                continue;
            }

            if i >= 1 {
                let step = booster_step(tokens[i - 1].as_str());
                if step != 0.0 {
                    valence += step * valence.signum();
                }
            }

            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            if negated {
                valence *= NEGATION_SCALAR;
            }

            sum += valence;
        }

        (sum, tokens.len())
    }

    /// Compound score in (-1.0, 1.0).
    pub fn compound(&self, text: &str) -> f64 {
        let (sum, _) = self.score_text(text);
        normalize(sum)
    }
}

impl Scorer for SentimentAnalyzer {
    fn score(&self, text: &str) -> Result<f64, ScoreError> {
        if text.trim().is_empty() {
            return Err(ScoreError::EmptyText);
        }
        Ok(self.compound(text))
    }
}

fn normalize(sum: f64) -> f64 {
    if sum == 0.0 {
        return 0.0;
    }
    (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
}

/// Lower-case word tokens; inner apostrophes and hyphens are kept ("isn't", "sell-off").
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}' || c == '-'))
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .map(|t| t.replace('\u{2019}', "'").to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "didn't"
            | "without"
            | "nor"
    )
}

fn booster_step(tok: &str) -> f64 {
    match tok {
        "very" | "sharply" | "deeply" | "hugely" | "extremely" | "significantly" | "massive"
        | "major" | "biggest" | "steep" | "record-breaking" => BOOST_STEP,
        "slightly" | "somewhat" | "marginally" | "barely" | "modest" | "modestly" | "mild" => {
            -BOOST_STEP
        }
        _ => 0.0,
    }
}
