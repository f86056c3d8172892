use newsfeed_common::{Credential, IdentityAck, ItemId, ItemKind};
use serde_json::json;

use crate::error::Result;
use crate::{http_client, read_json};

/// Client for the identity store, which owns each actor's liked set and
/// comment history. Every call is bearer-authenticated.
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
}

impl IdentityClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Add the item to the actor's liked set. `success: false` in the reply
    /// means it was already there.
    pub async fn like(
        &self,
        credential: &Credential,
        kind: ItemKind,
        id: &ItemId,
    ) -> Result<IdentityAck> {
        let url = format!("{}/user/{}/{}/like", self.base_url, kind.collection(), id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&credential.token)
            .json(&json!({ "userId": credential.actor_id }))
            .send()
            .await?;
        read_json(resp).await
    }

    /// Append a comment to the actor's own profile record.
    pub async fn comment(
        &self,
        credential: &Credential,
        id: &ItemId,
        text: &str,
    ) -> Result<IdentityAck> {
        let url = format!("{}/user/articles/{}/comment", self.base_url, id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&credential.token)
            .json(&json!({ "userId": credential.actor_id, "text": text }))
            .send()
            .await?;
        read_json(resp).await
    }
}
