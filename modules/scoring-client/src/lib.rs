pub mod error;
pub mod types;

pub use error::{Result, ScoringError};
pub use types::{
    BiasScores, FakeNewsScores, RawBias, RawFakeNews, RawSentiment, ScoreRequest,
    SentimentLabel, SentimentScores,
};

use std::time::Duration;

use serde::de::DeserializeOwned;

/// Where each scoring service listens. Each URL is the full POST endpoint.
#[derive(Debug, Clone)]
pub struct ScoringEndpoints {
    pub bias: String,
    pub fake_news: String,
    pub sentiment: String,
}

pub struct ScoringClient {
    client: reqwest::Client,
    endpoints: ScoringEndpoints,
}

impl ScoringClient {
    pub fn new(endpoints: ScoringEndpoints, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, endpoints }
    }

    /// Score political leaning of the given text.
    pub async fn bias(&self, input_text: &str) -> Result<BiasScores> {
        let raw: RawBias = self.post(&self.endpoints.bias, input_text).await?;
        BiasScores::try_from(raw)
    }

    /// Score authenticity of the given text.
    pub async fn fake_news(&self, input_text: &str) -> Result<FakeNewsScores> {
        let raw: RawFakeNews = self.post(&self.endpoints.fake_news, input_text).await?;
        FakeNewsScores::try_from(raw)
    }

    pub async fn sentiment(&self, input_text: &str) -> Result<SentimentScores> {
        let raw: RawSentiment = self.post(&self.endpoints.sentiment, input_text).await?;
        SentimentScores::try_from(raw)
    }

    async fn post<T: DeserializeOwned>(&self, url: &str, input_text: &str) -> Result<T> {
        let resp = self
            .client
            .post(url)
            .json(&ScoreRequest { input_text })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ScoringError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // Read as text first so a payload missing fields surfaces as a parse
        // error rather than a transport error.
        let body = resp.text().await?;
        tracing::debug!(url, bytes = body.len(), "Scoring response received");
        Ok(serde_json::from_str(&body)?)
    }
}
