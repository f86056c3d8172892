// Test mocks for the enrichment and engagement engines.
//
// One mock per trait boundary:
// - MockScorer (FacetScorer): per-(item, facet) scripted behaviour, defaults to success
// - MockFeedSource (FeedSource): fixed item list, filtered like the content store
// - MockIdentityStore (IdentityStore): stateful liked set and comment log
// - MockContentStore (ContentStore): stateful counters with a failure switch
//
// Plus fixtures for items and facet results.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Semaphore;

use newsfeed_common::{
    BiasScores, Comment, Credential, Facet, FacetResult, FakeNewsScores, IdentityAck, Item,
    ItemId, ItemKind, OutboundComment, Preferences, SentimentLabel, SentimentScores,
};

use crate::traits::{ContentStore, FacetScorer, FeedSource, IdentityStore};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn item(id: &str) -> Item {
    Item {
        id: ItemId::new(id),
        kind: ItemKind::Article,
        title: format!("Headline {id}"),
        description: format!("Summary of {id}"),
        body: format!("Full story {id}"),
        source: "BBC".to_string(),
        category: "General".to_string(),
        published_at: None,
        likes: 0,
        comments: Vec::new(),
    }
}

pub fn item_with(id: &str, category: &str, source: &str, likes: u64) -> Item {
    Item {
        category: category.to_string(),
        source: source.to_string(),
        likes,
        ..item(id)
    }
}

pub fn bias(center: f64) -> FacetResult {
    let side = (1.0 - center) / 4.0;
    FacetResult::Bias(BiasScores {
        left: side,
        lean_left: side,
        center,
        lean_right: side,
        right: side,
    })
}

pub fn fake_news(authentic: f64) -> FacetResult {
    FacetResult::FakeNews(FakeNewsScores {
        authentic,
        fake: 1.0 - authentic,
    })
}

pub fn sentiment(label: SentimentLabel, score: f64) -> FacetResult {
    FacetResult::Sentiment(SentimentScores {
        label,
        score,
        positive: 0.3,
        neutral: 0.5,
        negative: 0.2,
    })
}

pub fn sample_bias() -> FacetResult {
    bias(0.6)
}

pub fn sample_fake_news() -> FacetResult {
    fake_news(0.9)
}

pub fn sample_sentiment() -> FacetResult {
    sentiment(SentimentLabel::Neutral, 0.02)
}

pub fn default_result(facet: Facet) -> FacetResult {
    match facet {
        Facet::Bias => sample_bias(),
        Facet::FakeNews => sample_fake_news(),
        Facet::Sentiment => sample_sentiment(),
    }
}

pub fn credential(actor_id: &str) -> Credential {
    Credential {
        token: format!("token-{actor_id}"),
        actor_id: actor_id.to_string(),
        actor_name: Some(format!("name-{actor_id}")),
    }
}

// ---------------------------------------------------------------------------
// MockScorer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Behavior {
    Respond(FacetResult),
    Fail(String),
    /// Never completes. Exercises the per-call timeout.
    Hang,
    /// Waits for a permit on the gate, then responds.
    Gated(Arc<Semaphore>, FacetResult),
    Panic,
}

/// Scripted scorer. Each (item, facet) pair has a queue of behaviours; the
/// last one repeats. Unscripted pairs succeed with `default_result`.
pub struct MockScorer {
    scripts: Mutex<HashMap<(ItemId, Facet), VecDeque<Behavior>>>,
    calls: Mutex<Vec<(ItemId, Facet)>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockScorer {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn script(self, id: &str, facet: Facet, behaviors: Vec<Behavior>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert((ItemId::new(id), facet), behaviors.into());
        self
    }

    pub fn respond(self, id: &str, facet: Facet, result: FacetResult) -> Self {
        self.script(id, facet, vec![Behavior::Respond(result)])
    }

    pub fn fail(self, id: &str, facet: Facet) -> Self {
        self.script(id, facet, vec![Behavior::Fail(format!("{facet} scorer returned 500"))])
    }

    pub fn hang(self, id: &str, facet: Facet) -> Self {
        self.script(id, facet, vec![Behavior::Hang])
    }

    pub fn gated(self, id: &str, facet: Facet, gate: Arc<Semaphore>, result: FacetResult) -> Self {
        self.script(id, facet, vec![Behavior::Gated(gate, result)])
    }

    pub fn panic_on(self, id: &str, facet: Facet) -> Self {
        self.script(id, facet, vec![Behavior::Panic])
    }

    /// Delay every response, so concurrency can be observed.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(ItemId, Facet)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Poll until at least `n` calls have been made. Panics after two seconds.
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..400 {
            if self.call_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("MockScorer: expected {n} calls, saw {}", self.call_count());
    }

    fn next_behavior(&self, id: &ItemId, facet: Facet) -> Behavior {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&(id.clone(), facet)) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or(Behavior::Respond(default_result(facet))),
            None => Behavior::Respond(default_result(facet)),
        }
    }

    async fn run(&self, behavior: Behavior) -> Result<FacetResult> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match behavior {
            Behavior::Respond(result) => Ok(result),
            Behavior::Fail(message) => bail!(message),
            Behavior::Hang => std::future::pending().await,
            Behavior::Gated(gate, result) => {
                let _permit = gate.acquire().await?;
                Ok(result)
            }
            Behavior::Panic => panic!("MockScorer: scripted panic"),
        }
    }
}

impl Default for MockScorer {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FacetScorer for MockScorer {
    async fn score(&self, facet: Facet, item: &Item) -> Result<FacetResult> {
        self.calls.lock().unwrap().push((item.id.clone(), facet));
        let behavior = self.next_behavior(&item.id, facet);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        self.run(behavior).await
    }
}

// ---------------------------------------------------------------------------
// MockFeedSource
// ---------------------------------------------------------------------------

/// Fixed set of items served the way the content store filters them.
pub struct MockFeedSource {
    items: Vec<Item>,
    failing: AtomicBool,
}

impl MockFeedSource {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("MockFeedSource: content store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn home(&self) -> Result<Vec<Item>> {
        self.check()?;
        Ok(self.items.clone())
    }

    async fn for_you(&self, preferences: &Preferences) -> Result<Vec<Item>> {
        self.check()?;
        if preferences.categories.is_empty() && preferences.sources.is_empty() {
            return Ok(self.items.clone());
        }
        Ok(self
            .items
            .iter()
            .filter(|i| {
                preferences.categories.contains(&i.category)
                    || preferences.sources.contains(&i.source)
            })
            .cloned()
            .collect())
    }

    async fn liked(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        self.check()?;
        Ok(self
            .items
            .iter()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn item(&self, kind: ItemKind, id: &ItemId) -> Result<Item> {
        self.check()?;
        self.items
            .iter()
            .find(|i| &i.id == id && i.kind == kind)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockFeedSource: no {kind} registered for {id}"))
    }
}

// ---------------------------------------------------------------------------
// MockIdentityStore
// ---------------------------------------------------------------------------

/// In-memory identity store. Likes are a set keyed by (actor, kind, item).
pub struct MockIdentityStore {
    liked: Mutex<HashSet<(String, ItemKind, ItemId)>>,
    comments: Mutex<Vec<(String, ItemId, String)>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockIdentityStore {
    pub fn new() -> Self {
        Self {
            liked: Mutex::new(HashSet::new()),
            comments: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn has_liked(&self, actor_id: &str, kind: ItemKind, id: &str) -> bool {
        self.liked
            .lock()
            .unwrap()
            .contains(&(actor_id.to_string(), kind, ItemId::new(id)))
    }

    pub fn comments(&self) -> Vec<(String, ItemId, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("MockIdentityStore: identity store unavailable");
        }
        Ok(())
    }
}

impl Default for MockIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for MockIdentityStore {
    async fn add_like(
        &self,
        credential: &Credential,
        kind: ItemKind,
        id: &ItemId,
    ) -> Result<IdentityAck> {
        self.enter()?;
        let added = self
            .liked
            .lock()
            .unwrap()
            .insert((credential.actor_id.clone(), kind, id.clone()));
        Ok(IdentityAck {
            success: added,
            message: Some(if added { "liked" } else { "already liked" }.to_string()),
        })
    }

    async fn append_comment(
        &self,
        credential: &Credential,
        id: &ItemId,
        text: &str,
    ) -> Result<IdentityAck> {
        self.enter()?;
        self.comments
            .lock()
            .unwrap()
            .push((credential.actor_id.clone(), id.clone(), text.to_string()));
        Ok(IdentityAck {
            success: true,
            message: None,
        })
    }
}

// ---------------------------------------------------------------------------
// MockContentStore
// ---------------------------------------------------------------------------

/// In-memory content store holding canonical like counts and comment lists.
pub struct MockContentStore {
    items: Mutex<HashMap<ItemId, Item>>,
    like_calls: AtomicUsize,
    comment_calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            like_calls: AtomicUsize::new(0),
            comment_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_item(self, item: Item) -> Self {
        self.items.lock().unwrap().insert(item.id.clone(), item);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn likes(&self, id: &str) -> Option<u64> {
        self.items.lock().unwrap().get(&ItemId::new(id)).map(|i| i.likes)
    }

    pub fn comments(&self, id: &str) -> Vec<Comment> {
        self.items
            .lock()
            .unwrap()
            .get(&ItemId::new(id))
            .map(|i| i.comments.clone())
            .unwrap_or_default()
    }

    pub fn like_calls(&self) -> usize {
        self.like_calls.load(Ordering::SeqCst)
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn increment_likes(&self, kind: ItemKind, id: &ItemId) -> Result<Item> {
        self.like_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("MockContentStore: content store unavailable");
        }
        let mut items = self.items.lock().unwrap();
        let Some(item) = items.get_mut(id).filter(|i| i.kind == kind) else {
            bail!("MockContentStore: no {kind} registered for {id}");
        };
        item.likes += 1;
        Ok(item.clone())
    }

    async fn post_comment(&self, id: &ItemId, comment: &OutboundComment) -> Result<Item> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("MockContentStore: content store unavailable");
        }
        let mut items = self.items.lock().unwrap();
        let Some(item) = items.get_mut(id) else {
            bail!("MockContentStore: no article registered for {id}");
        };
        item.comments.push(Comment::Authored {
            user_id: comment.user_id.clone(),
            user_name: comment.user_name.clone(),
            text: comment.text.clone(),
        });
        Ok(item.clone())
    }
}
