use newsfeed_common::{Item, ItemId, ItemKind, OutboundComment, Preferences};
use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::{http_client, read_items, read_json};

/// Client for the content store: feeds, single items, like counters, comments.
/// None of these endpoints take credentials.
pub struct ContentClient {
    client: reqwest::Client,
    base_url: String,
}

impl ContentClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Trending feed, newest first.
    pub async fn home(&self) -> Result<Vec<Item>> {
        let url = format!("{}/news", self.base_url);
        let resp = self.client.get(&url).send().await?;
        read_items(resp).await
    }

    /// Feed matching any of the preferred categories or sources.
    pub async fn for_you(&self, preferences: &Preferences) -> Result<Vec<Item>> {
        let url = format!("{}/for_you_news", self.base_url);
        let filter = preference_filter(preferences).to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[("filter", filter.as_str())])
            .send()
            .await?;
        read_items(resp).await
    }

    /// Articles the actor has liked. An empty id list needs no request.
    pub async fn liked(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids
            .iter()
            .map(ItemId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/user_liked_articles", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("articleIds", joined.as_str())])
            .send()
            .await?;
        read_items(resp).await
    }

    pub async fn item(&self, kind: ItemKind, id: &ItemId) -> Result<Item> {
        let url = format!("{}/api/{}/{}", self.base_url, kind.collection(), id);
        let resp = self.client.get(&url).send().await?;
        let mut item: Item = read_json(resp).await?;
        item.kind = kind;
        Ok(item)
    }

    /// Increment the like counter. Returns the updated record with the canonical count.
    pub async fn increment_likes(&self, kind: ItemKind, id: &ItemId) -> Result<Item> {
        let url = format!("{}/api/{}/{}/like", self.base_url, kind.collection(), id);
        let resp = self.client.post(&url).send().await?;
        let mut item: Item = read_json(resp).await?;
        item.kind = kind;
        tracing::debug!(item_id = %id, likes = item.likes, "Like counter incremented");
        Ok(item)
    }

    /// Append a comment to an article's comment list. Returns the updated article.
    pub async fn post_comment(&self, id: &ItemId, comment: &OutboundComment) -> Result<Item> {
        let url = format!("{}/api/articles/{}/comment", self.base_url, id);
        let resp = self.client.post(&url).json(comment).send().await?;
        read_json(resp).await
    }
}

/// `{"category":{"$in":[..]},"source":{"$in":[..]}}`, omitting empty lists.
fn preference_filter(preferences: &Preferences) -> Value {
    let mut filter = Map::new();
    if !preferences.categories.is_empty() {
        filter.insert("category".into(), json!({ "$in": preferences.categories }));
    }
    if !preferences.sources.is_empty() {
        filter.insert("source".into(), json!({ "$in": preferences.sources }));
    }
    Value::Object(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::StoreError;

    fn article(id: &str, likes: u64) -> Value {
        json!({ "id": id, "title": format!("Title {id}"), "content": "Body", "source": "BBC", "likes": likes })
    }

    #[tokio::test]
    async fn home_parses_feed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([article("a", 1), article("b", 2)])),
            )
            .mount(&server)
            .await;

        let items = ContentClient::new(&server.uri()).home().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].likes, 2);
    }

    #[tokio::test]
    async fn records_without_id_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                article("a", 1),
                { "id": null, "title": "Orphan", "likes": 0 },
                { "title": "No id at all" },
                article("b", 2)
            ])))
            .mount(&server)
            .await;

        let items = ContentClient::new(&server.uri()).home().await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn for_you_sends_preference_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/for_you_news"))
            .and(query_param("filter", r#"{"category":{"$in":["Tech"]}}"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([article("t", 0)])))
            .expect(1)
            .mount(&server)
            .await;

        let prefs = Preferences {
            categories: vec!["Tech".into()],
            sources: vec![],
        };
        let items = ContentClient::new(&server.uri()).for_you(&prefs).await.unwrap();
        assert_eq!(items[0].id.as_str(), "t");
    }

    #[tokio::test]
    async fn liked_with_no_ids_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let items = ContentClient::new(&server.uri()).liked(&[]).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn liked_joins_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user_liked_articles"))
            .and(query_param("articleIds", "a,b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([article("a", 0)])))
            .expect(1)
            .mount(&server)
            .await;

        let ids = vec![ItemId::new("a"), ItemId::new("b")];
        let items = ContentClient::new(&server.uri()).liked(&ids).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn increment_likes_returns_canonical_count_for_video() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/videos/v1/like"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "v1", "title": "Clip", "description": "d", "likes": 6
            })))
            .mount(&server)
            .await;

        let item = ContentClient::new(&server.uri())
            .increment_likes(ItemKind::Video, &ItemId::new("v1"))
            .await
            .unwrap();
        assert_eq!(item.likes, 6);
        assert_eq!(item.kind, ItemKind::Video);
    }

    #[tokio::test]
    async fn missing_item_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/articles/nope/like"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "error": "Article not found" })),
            )
            .mount(&server)
            .await;

        let err = ContentClient::new(&server.uri())
            .increment_likes(ItemKind::Article, &ItemId::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn post_comment_forwards_author_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/articles/a/comment"))
            .and(body_json(json!({ "userId": "u1", "userName": "ann", "text": "Nice" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(article("a", 0)))
            .expect(1)
            .mount(&server)
            .await;

        let comment = OutboundComment {
            user_id: "u1".into(),
            user_name: Some("ann".into()),
            text: "Nice".into(),
        };
        ContentClient::new(&server.uri())
            .post_comment(&ItemId::new("a"), &comment)
            .await
            .unwrap();
    }

    #[test]
    fn empty_preferences_produce_empty_filter() {
        assert_eq!(preference_filter(&Preferences::default()), json!({}));
    }
}
