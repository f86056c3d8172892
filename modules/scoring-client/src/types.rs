use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoringError};

/// Accepted deviation of a distribution's sum from 1.0 (or 100.0 for percentages),
/// relative to the expected total.
const SUM_TOLERANCE: f64 = 0.02;

#[derive(Debug, Serialize)]
pub struct ScoreRequest<'a> {
    pub input_text: &'a str,
}

// --- Wire payloads -----------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RawBias {
    pub left: f64,
    #[serde(rename = "lean left")]
    pub lean_left: f64,
    pub center: f64,
    #[serde(rename = "lean right")]
    pub lean_right: f64,
    pub right: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawFakeNews {
    #[serde(rename = "true")]
    pub authentic: f64,
    pub fake: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawSentiment {
    pub sentiment: String,
    pub score: f64,
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

// --- Validated scores ----------------------------------------------------------

/// Five-way distribution over the left/right spectrum. Fractions summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasScores {
    pub left: f64,
    pub lean_left: f64,
    pub center: f64,
    pub lean_right: f64,
    pub right: f64,
}

/// Authentic/fake probabilities. Fractions summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FakeNewsScores {
    pub authentic: f64,
    pub fake: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "Positive"),
            SentimentLabel::Neutral => write!(f, "Neutral"),
            SentimentLabel::Negative => write!(f, "Negative"),
        }
    }
}

impl std::str::FromStr for SentimentLabel {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "neutral" => Ok(SentimentLabel::Neutral),
            "negative" => Ok(SentimentLabel::Negative),
            other => Err(ScoringError::Malformed(format!(
                "unknown sentiment label '{other}'"
            ))),
        }
    }
}

/// Sentiment label, compound score in [-1, 1], and the label distribution as
/// fractions summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub label: SentimentLabel,
    pub score: f64,
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl TryFrom<RawBias> for BiasScores {
    type Error = ScoringError;

    fn try_from(raw: RawBias) -> Result<Self> {
        let [left, lean_left, center, lean_right, right] = normalize_distribution(
            "bias",
            [raw.left, raw.lean_left, raw.center, raw.lean_right, raw.right],
        )?;
        Ok(Self {
            left,
            lean_left,
            center,
            lean_right,
            right,
        })
    }
}

impl TryFrom<RawFakeNews> for FakeNewsScores {
    type Error = ScoringError;

    fn try_from(raw: RawFakeNews) -> Result<Self> {
        let [authentic, fake] = normalize_distribution("fake-news", [raw.authentic, raw.fake])?;
        Ok(Self { authentic, fake })
    }
}

impl TryFrom<RawSentiment> for SentimentScores {
    type Error = ScoringError;

    fn try_from(raw: RawSentiment) -> Result<Self> {
        let label = raw.sentiment.parse()?;
        if !raw.score.is_finite() || !(-1.0..=1.0).contains(&raw.score) {
            return Err(ScoringError::Malformed(format!(
                "sentiment compound score {} outside [-1, 1]",
                raw.score
            )));
        }
        let [positive, neutral, negative] =
            normalize_distribution("sentiment", [raw.positive, raw.neutral, raw.negative])?;
        Ok(Self {
            label,
            score: raw.score,
            positive,
            neutral,
            negative,
        })
    }
}

/// Rescale a probability distribution to fractions.
///
/// The scoring services are inconsistent: the bias model reports fractions,
/// while fake-news and sentiment report percentages. Both shapes are accepted;
/// anything else is rejected as malformed.
pub fn normalize_distribution<const N: usize>(what: &str, parts: [f64; N]) -> Result<[f64; N]> {
    if let Some(bad) = parts.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(ScoringError::Malformed(format!(
            "{what} distribution contains invalid value {bad}"
        )));
    }

    let sum: f64 = parts.iter().sum();
    let near = |total: f64| (sum - total).abs() <= total * SUM_TOLERANCE;
    if !near(1.0) && !near(100.0) {
        return Err(ScoringError::Malformed(format!(
            "{what} distribution sums to {sum}, expected 1.0 or 100.0"
        )));
    }

    Ok(parts.map(|p| p / sum))
}
