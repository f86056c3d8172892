//! Feed loading through dispatch and merge, against mock services.
//!
//! Each test builds a `FeedLoader` over a `MockFeedSource` and a scripted
//! `MockScorer`, loads a screen, and checks the merged view once the cycle
//! settles.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use newsfeed_common::{Facet, FacetResult, ItemId, Preferences};
use newsfeed_core::testing::*;
use newsfeed_core::{Dispatcher, EnrichmentStore, FeedLoader, Screen};

fn loader(scorer: Arc<MockScorer>, items: Vec<newsfeed_common::Item>) -> (FeedLoader, Arc<EnrichmentStore>) {
    let store = Arc::new(EnrichmentStore::new());
    let dispatcher = Dispatcher::new(scorer, store.clone()).with_timeout(Duration::from_secs(2));
    (FeedLoader::new(Arc::new(MockFeedSource::new(items)), dispatcher), store)
}

// ---------------------------------------------------------------------------
// Isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_failed_facet_leaves_the_rest_of_the_batch_resolved() {
    let scorer = Arc::new(MockScorer::new().fail("2", Facet::Bias));
    let (loader, store) = loader(scorer, vec![item("1"), item("2"), item("3")]);

    let stats = loader.load(&Screen::Home).await.unwrap().settled().await.unwrap();

    assert_eq!(stats.resolved, 8);
    assert_eq!(stats.unavailable, 1);
    assert!(store.get(&ItemId::new("1")).unwrap().is_complete());
    assert!(store.get(&ItemId::new("3")).unwrap().is_complete());

    let second = store.get(&ItemId::new("2")).unwrap();
    assert_eq!(second.resolved(), vec![Facet::FakeNews, Facet::Sentiment]);
    assert!(second.bias.is_none());
}

#[tokio::test]
async fn every_failure_mode_stays_in_its_unit() {
    let scorer = Arc::new(
        MockScorer::new()
            .fail("a", Facet::Bias)
            .hang("b", Facet::FakeNews)
            .panic_on("c", Facet::Sentiment),
    );
    let store = Arc::new(EnrichmentStore::new());
    let dispatcher = Dispatcher::new(scorer, store.clone()).with_timeout(Duration::from_millis(100));

    let stats = dispatcher
        .dispatch(vec![item("a"), item("b"), item("c"), item("d")])
        .settled()
        .await
        .unwrap();

    assert_eq!(stats.resolved, 9);
    assert_eq!(stats.unavailable, 2);
    assert_eq!(stats.timed_out, 1);
    assert!(store.get(&ItemId::new("d")).unwrap().is_complete());
    for id in ["a", "b", "c"] {
        assert_eq!(store.get(&ItemId::new(id)).unwrap().resolved().len(), 2);
    }
}

// ---------------------------------------------------------------------------
// Cycles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn late_response_from_abandoned_cycle_is_discarded() {
    let gate = Arc::new(Semaphore::new(0));
    let scorer = Arc::new(MockScorer::new().script(
        "x",
        Facet::Bias,
        vec![
            Behavior::Gated(gate.clone(), bias(0.1)),
            Behavior::Respond(bias(0.9)),
        ],
    ));
    let (loader, store) = loader(scorer.clone(), vec![item("x")]);

    let first = loader.load(&Screen::Home).await.unwrap();
    scorer.wait_for_calls(3).await;

    // User navigates away and back before cycle 1's bias response arrives.
    let second = loader.load(&Screen::Home).await.unwrap();
    assert!(second.cycle() > first.cycle());
    let second_stats = second.settled().await.unwrap();
    assert_eq!(second_stats.resolved, 3);

    gate.add_permits(1);
    let first_stats = first.settled().await.unwrap();
    assert!(first_stats.stale >= 1);
    assert_eq!(first_stats.total(), 3);

    let x = store.get(&ItemId::new("x")).unwrap();
    assert_eq!(x.bias.map(FacetResult::Bias), Some(bias(0.9)));
    assert!(x.is_complete());
}

#[tokio::test]
async fn switching_screens_replaces_the_view() {
    let items = vec![
        item_with("p", "Politics", "BBC", 0),
        item_with("s", "Sport", "CNN", 0),
    ];
    let (loader, store) = loader(Arc::new(MockScorer::new()), items);

    loader.load(&Screen::Home).await.unwrap().settled().await.unwrap();
    assert_eq!(store.snapshot().len(), 2);

    let screen = Screen::ForYou(Preferences {
        categories: vec!["Sport".into()],
        sources: vec![],
    });
    loader.load(&screen).await.unwrap().settled().await.unwrap();

    let view = store.snapshot();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].item.id, ItemId::new("s"));
}

#[tokio::test]
async fn liked_screen_with_no_likes_is_empty() {
    let (loader, store) = loader(Arc::new(MockScorer::new()), vec![item("a")]);

    let stats = loader
        .load(&Screen::Liked(vec![]))
        .await
        .unwrap()
        .settled()
        .await
        .unwrap();

    assert_eq!(stats.total(), 0);
    assert!(store.snapshot().is_empty());
}

// ---------------------------------------------------------------------------
// Change notification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscribers_see_one_change_per_applied_patch() {
    let scorer = Arc::new(MockScorer::new().fail("b", Facet::Sentiment));
    let (loader, store) = loader(scorer, vec![item("a"), item("b")]);
    let mut rx = store.subscribe();

    loader.load(&Screen::Home).await.unwrap().settled().await.unwrap();

    assert!(rx.has_changed().unwrap());
    // One bump for the cycle start, one per merged facet.
    assert_eq!(*rx.borrow_and_update(), 1 + 5);
}
