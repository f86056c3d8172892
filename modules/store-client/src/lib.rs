pub mod content;
pub mod error;
pub mod identity;

pub use content::ContentClient;
pub use error::{Result, StoreError};
pub use identity::IdentityClient;

use std::time::Duration;

use newsfeed_common::Item;
use serde::de::DeserializeOwned;
use serde_json::Value;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client")
}

/// Turn a non-2xx response into `StoreError::Api`, otherwise parse the JSON body.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(StoreError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Parse a feed, dropping records that have no id. Content records default
/// `id` to null, and one such record must not cost the whole feed.
async fn read_items(resp: reqwest::Response) -> Result<Vec<Item>> {
    let records: Vec<Value> = read_json(resp).await?;
    let mut items = Vec::with_capacity(records.len());
    for record in records {
        if record.get("id").map_or(true, Value::is_null) {
            tracing::warn!(
                title = record.get("title").and_then(serde_json::Value::as_str).unwrap_or(""),
                "Skipping content record without an id"
            );
            continue;
        }
        items.push(serde_json::from_value(record)?);
    }
    Ok(items)
}
