// Trait seams between the engine and the outside world.
//
// FacetScorer  : the three scoring services.
// FeedSource   : content-store reads that produce a batch of items.
// IdentityStore: the actor-owned engagement relation (liked set, comment history).
// ContentStore : content-owned counters and comment lists.
//
// The REST clients implement these directly; tests use the mocks in `testing`.

use anyhow::Result;
use async_trait::async_trait;

use newsfeed_common::{
    Credential, Facet, FacetResult, IdentityAck, Item, ItemId, ItemKind, OutboundComment,
    Preferences,
};
use scoring_client::ScoringClient;
use store_client::{ContentClient, IdentityClient};

// ---------------------------------------------------------------------------
// FacetScorer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FacetScorer: Send + Sync {
    /// Score one facet of one item. The returned result must be for `facet`.
    async fn score(&self, facet: Facet, item: &Item) -> Result<FacetResult>;
}

#[async_trait]
impl FacetScorer for ScoringClient {
    async fn score(&self, facet: Facet, item: &Item) -> Result<FacetResult> {
        let input_text = facet.input_text(item);
        Ok(match facet {
            Facet::Bias => FacetResult::Bias(self.bias(&input_text).await?),
            Facet::FakeNews => FacetResult::FakeNews(self.fake_news(&input_text).await?),
            Facet::Sentiment => FacetResult::Sentiment(self.sentiment(&input_text).await?),
        })
    }
}

// ---------------------------------------------------------------------------
// FeedSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn home(&self) -> Result<Vec<Item>>;

    async fn for_you(&self, preferences: &Preferences) -> Result<Vec<Item>>;

    async fn liked(&self, ids: &[ItemId]) -> Result<Vec<Item>>;

    async fn item(&self, kind: ItemKind, id: &ItemId) -> Result<Item>;
}

#[async_trait]
impl FeedSource for ContentClient {
    async fn home(&self) -> Result<Vec<Item>> {
        Ok(self.home().await?)
    }

    async fn for_you(&self, preferences: &Preferences) -> Result<Vec<Item>> {
        Ok(self.for_you(preferences).await?)
    }

    async fn liked(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        Ok(self.liked(ids).await?)
    }

    async fn item(&self, kind: ItemKind, id: &ItemId) -> Result<Item> {
        Ok(self.item(kind, id).await?)
    }
}

// ---------------------------------------------------------------------------
// IdentityStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Add (actor, item) to the actor's liked set. Idempotent: an existing
    /// pair yields `success: false`, not an error.
    async fn add_like(
        &self,
        credential: &Credential,
        kind: ItemKind,
        id: &ItemId,
    ) -> Result<IdentityAck>;

    /// Append a comment to the actor's own profile record.
    async fn append_comment(
        &self,
        credential: &Credential,
        id: &ItemId,
        text: &str,
    ) -> Result<IdentityAck>;
}

#[async_trait]
impl IdentityStore for IdentityClient {
    async fn add_like(
        &self,
        credential: &Credential,
        kind: ItemKind,
        id: &ItemId,
    ) -> Result<IdentityAck> {
        Ok(self.like(credential, kind, id).await?)
    }

    async fn append_comment(
        &self,
        credential: &Credential,
        id: &ItemId,
        text: &str,
    ) -> Result<IdentityAck> {
        Ok(self.comment(credential, id, text).await?)
    }
}

// ---------------------------------------------------------------------------
// ContentStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Increment the like counter and return the record with the canonical count.
    async fn increment_likes(&self, kind: ItemKind, id: &ItemId) -> Result<Item>;

    async fn post_comment(&self, id: &ItemId, comment: &OutboundComment) -> Result<Item>;
}

#[async_trait]
impl ContentStore for ContentClient {
    async fn increment_likes(&self, kind: ItemKind, id: &ItemId) -> Result<Item> {
        Ok(self.increment_likes(kind, id).await?)
    }

    async fn post_comment(&self, id: &ItemId, comment: &OutboundComment) -> Result<Item> {
        Ok(self.post_comment(id, comment).await?)
    }
}
