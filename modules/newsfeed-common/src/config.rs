use std::env;
use std::time::Duration;

use url::Url;

use crate::error::NewsfeedError;
use crate::types::Credential;

/// Service locations and tuning, loaded from environment variables.
/// Defaults match a local deployment of all five services.
#[derive(Debug, Clone)]
pub struct Config {
    // Scoring services
    pub bias_scorer_url: String,
    pub fake_news_scorer_url: String,
    pub sentiment_scorer_url: String,

    // Stores
    pub content_store_url: String,
    pub identity_store_url: String,

    // Dispatch
    pub scoring_timeout: Duration,
    pub max_in_flight: usize,

    // Actor
    pub token: Option<String>,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, NewsfeedError> {
        dotenvy::dotenv().ok();

        let config = Self {
            bias_scorer_url: url_env("BIAS_SCORER_URL", "http://127.0.0.1:3000/analyse")?,
            fake_news_scorer_url: url_env(
                "FAKE_NEWS_SCORER_URL",
                "http://127.0.0.1:4000/analyse_fake_news",
            )?,
            sentiment_scorer_url: url_env(
                "SENTIMENT_SCORER_URL",
                "http://127.0.0.1:7000/analyse_sentiment_analysis",
            )?,
            content_store_url: url_env("CONTENT_STORE_URL", "http://127.0.0.1:5000")?,
            identity_store_url: url_env("IDENTITY_STORE_URL", "http://127.0.0.1:8000/api")?,
            scoring_timeout: Duration::from_secs(number_env("SCORING_TIMEOUT_SECS", 20)?),
            max_in_flight: number_env("DISPATCH_MAX_IN_FLIGHT", 24)? as usize,
            token: env::var("NEWSFEED_TOKEN").ok().filter(|s| !s.is_empty()),
            actor_id: env::var("NEWSFEED_ACTOR_ID").ok().filter(|s| !s.is_empty()),
            actor_name: env::var("NEWSFEED_ACTOR_NAME").ok().filter(|s| !s.is_empty()),
        };

        if config.max_in_flight == 0 {
            return Err(NewsfeedError::Config(
                "DISPATCH_MAX_IN_FLIGHT must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// The actor's credential, if both a token and an actor id are configured.
    pub fn credential(&self) -> Option<Credential> {
        match (&self.token, &self.actor_id) {
            (Some(token), Some(actor_id)) => Some(Credential {
                token: token.clone(),
                actor_id: actor_id.clone(),
                actor_name: self.actor_name.clone(),
            }),
            _ => None,
        }
    }

    pub fn log_redacted(&self) {
        fn preview(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let head: String = v.chars().take(5).collect();
                    format!("{}...({} chars)", head, v.len())
                }
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  BIAS_SCORER_URL: {}", self.bias_scorer_url);
        tracing::info!("  FAKE_NEWS_SCORER_URL: {}", self.fake_news_scorer_url);
        tracing::info!("  SENTIMENT_SCORER_URL: {}", self.sentiment_scorer_url);
        tracing::info!("  CONTENT_STORE_URL: {}", self.content_store_url);
        tracing::info!("  IDENTITY_STORE_URL: {}", self.identity_store_url);
        tracing::info!("  SCORING_TIMEOUT_SECS: {}", self.scoring_timeout.as_secs());
        tracing::info!("  DISPATCH_MAX_IN_FLIGHT: {}", self.max_in_flight);
        tracing::info!("  NEWSFEED_TOKEN: {}", preview(&self.token));
        tracing::info!("  NEWSFEED_ACTOR_ID: {}", preview(&self.actor_id));
    }
}

fn url_env(key: &str, default: &str) -> Result<String, NewsfeedError> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| NewsfeedError::Config(format!("{key} is not a valid URL: {e}")))?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn number_env(key: &str, default: u64) -> Result<u64, NewsfeedError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| NewsfeedError::Config(format!("{key} must be a number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}
