use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use scoring_client::{BiasScores, FakeNewsScores, SentimentLabel, SentimentScores};

// =============================================================================
// Items
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Article,
    Video,
}

impl ItemKind {
    /// Path segment used by both stores for this kind of item.
    pub fn collection(&self) -> &'static str {
        match self {
            ItemKind::Article => "articles",
            ItemKind::Video => "videos",
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            ItemKind::Article => "article",
            ItemKind::Video => "video",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "article" | "articles" => Ok(ItemKind::Article),
            "video" | "videos" => Ok(ItemKind::Video),
            other => Err(format!("unknown item kind '{other}'")),
        }
    }
}

/// A comment as the content store returns it: older records are bare strings,
/// newer ones carry the author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Comment {
    Authored {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "userName", default)]
        user_name: Option<String>,
        text: String,
    },
    Text(String),
}

impl Comment {
    pub fn text(&self) -> &str {
        match self {
            Comment::Authored { text, .. } => text,
            Comment::Text(text) => text,
        }
    }
}

/// An article or video as owned by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "content", default)]
    pub body: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Item {
    /// Body text used for scoring. Videos have no body, so fall back to the description.
    pub fn text_body(&self) -> &str {
        if self.body.trim().is_empty() {
            &self.description
        } else {
            &self.body
        }
    }
}

/// Reference to an item in either store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: ItemId,
}

impl ItemRef {
    pub fn article(id: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Article,
            id: ItemId::new(id),
        }
    }

    pub fn video(id: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Video,
            id: ItemId::new(id),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.collection(), self.id)
    }
}

/// Category and source filters for the personalised feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

// =============================================================================
// Facets
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Facet {
    Bias,
    FakeNews,
    Sentiment,
}

impl Facet {
    pub const ALL: [Facet; 3] = [Facet::Bias, Facet::FakeNews, Facet::Sentiment];

    /// The text each scoring service expects for an item.
    pub fn input_text(&self, item: &Item) -> String {
        match self {
            Facet::Bias => format!("{} [SEP] {} [SEP] {}", item.title, item.text_body(), item.source),
            Facet::FakeNews => format!("{} [SEP] {}", item.title, item.text_body()),
            Facet::Sentiment => format!("{}: {}", item.title, item.text_body()),
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Bias => write!(f, "bias"),
            Facet::FakeNews => write!(f, "fake_news"),
            Facet::Sentiment => write!(f, "sentiment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "facet", rename_all = "snake_case")]
pub enum FacetResult {
    Bias(BiasScores),
    FakeNews(FakeNewsScores),
    Sentiment(SentimentScores),
}

impl FacetResult {
    pub fn facet(&self) -> Facet {
        match self {
            FacetResult::Bias(_) => Facet::Bias,
            FacetResult::FakeNews(_) => Facet::FakeNews,
            FacetResult::Sentiment(_) => Facet::Sentiment,
        }
    }
}

/// Identifies one fetch cycle. Responses are applied only to the cycle that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CycleId(pub u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle-{}", self.0)
    }
}

/// An item with whatever facets have resolved so far. Absent facets stay
/// absent until a response arrives; nothing is inferred.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedItem {
    pub item: Item,
    pub bias: Option<BiasScores>,
    pub fake_news: Option<FakeNewsScores>,
    pub sentiment: Option<SentimentScores>,
}

impl EnrichedItem {
    pub fn new(item: Item) -> Self {
        Self {
            item,
            bias: None,
            fake_news: None,
            sentiment: None,
        }
    }

    pub fn apply(&mut self, result: FacetResult) {
        match result {
            FacetResult::Bias(s) => self.bias = Some(s),
            FacetResult::FakeNews(s) => self.fake_news = Some(s),
            FacetResult::Sentiment(s) => self.sentiment = Some(s),
        }
    }

    pub fn has(&self, facet: Facet) -> bool {
        match facet {
            Facet::Bias => self.bias.is_some(),
            Facet::FakeNews => self.fake_news.is_some(),
            Facet::Sentiment => self.sentiment.is_some(),
        }
    }

    pub fn resolved(&self) -> Vec<Facet> {
        Facet::ALL.into_iter().filter(|f| self.has(*f)).collect()
    }

    pub fn is_complete(&self) -> bool {
        Facet::ALL.iter().all(|f| self.has(*f))
    }
}

// =============================================================================
// Engagement
// =============================================================================

/// Bearer credential for the identity store, plus who it belongs to.
#[derive(Clone)]
pub struct Credential {
    pub token: String,
    pub actor_id: String,
    pub actor_name: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("actor_id", &self.actor_id)
            .field("actor_name", &self.actor_name)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Engagement {
    Like,
    Comment { text: String },
}

impl Engagement {
    pub fn label(&self) -> &'static str {
        match self {
            Engagement::Like => "like",
            Engagement::Comment { .. } => "comment",
        }
    }
}

/// One user action against one item. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub id: Uuid,
    pub actor_id: String,
    pub item_kind: ItemKind,
    pub item_id: ItemId,
    pub engagement: Engagement,
    pub at: DateTime<Utc>,
}

impl EngagementRecord {
    pub fn new(actor_id: &str, item: &ItemRef, engagement: Engagement) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id: actor_id.to_string(),
            item_kind: item.kind,
            item_id: item.id.clone(),
            engagement,
            at: Utc::now(),
        }
    }
}

/// Identity store reply to a like or comment write. For likes, `success: false`
/// means the actor already liked the item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAck {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Comment forwarded to the content store's per-item comment list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundComment {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_name: Option<String>,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> Item {
        Item {
            id: ItemId::new("a1"),
            kind: ItemKind::Article,
            title: "Budget passes".into(),
            description: "Short".into(),
            body: "Full text".into(),
            source: "BBC".into(),
            category: "Politics".into(),
            published_at: None,
            likes: 0,
            comments: vec![],
        }
    }

    #[test]
    fn each_facet_composes_its_own_input() {
        let item = item();
        assert_eq!(Facet::Bias.input_text(&item), "Budget passes [SEP] Full text [SEP] BBC");
        assert_eq!(Facet::FakeNews.input_text(&item), "Budget passes [SEP] Full text");
        assert_eq!(Facet::Sentiment.input_text(&item), "Budget passes: Full text");
    }

    #[test]
    fn empty_body_falls_back_to_description() {
        let mut item = item();
        item.body = "  ".into();
        assert_eq!(Facet::FakeNews.input_text(&item), "Budget passes [SEP] Short");
    }

    #[test]
    fn item_parses_content_store_record() {
        let json = serde_json::json!({
            "_id": "x",
            "id": "a1",
            "title": "T",
            "content": "C",
            "source": "Fox",
            "publishedAt": "2025-03-01T10:00:00.000Z",
            "category": "Tech",
            "likes": 5,
            "comments": ["first", {"userId": "u1", "userName": "ann", "text": "second"}],
            "imageUrl": "https://example.com/x.png"
        });
        let item: Item = serde_json::from_value(json).unwrap();
        assert_eq!(item.body, "C");
        assert_eq!(item.kind, ItemKind::Article);
        assert_eq!(item.likes, 5);
        assert_eq!(item.comments.len(), 2);
        assert_eq!(item.comments[1].text(), "second");
        assert!(item.published_at.is_some());
    }

    #[test]
    fn enriched_item_tracks_resolved_facets() {
        let mut enriched = EnrichedItem::new(item());
        assert!(enriched.resolved().is_empty());
        enriched.apply(FacetResult::FakeNews(FakeNewsScores {
            authentic: 0.9,
            fake: 0.1,
        }));
        assert_eq!(enriched.resolved(), vec![Facet::FakeNews]);
        assert!(!enriched.is_complete());
    }

    #[test]
    fn credential_debug_hides_token() {
        let cred = Credential {
            token: "secret-token".into(),
            actor_id: "u1".into(),
            actor_name: None,
        };
        assert!(!format!("{cred:?}").contains("secret-token"));
    }
}
