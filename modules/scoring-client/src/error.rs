use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoringError>;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Malformed scores: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ScoringError {
    fn from(err: reqwest::Error) -> Self {
        ScoringError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ScoringError {
    fn from(err: serde_json::Error) -> Self {
        ScoringError::Parse(err.to_string())
    }
}
