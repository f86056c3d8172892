//! Keyed reducer for asynchronously arriving facet results.
//!
//! `reduce` is a pure state update: it sees every event and patches the
//! per-item view. No I/O, no ordering assumptions between facets or items.
//! `EnrichmentStore` wraps the state for sharing between in-flight requests;
//! each patch is applied under one short lock, so facets of the same item
//! never race on a read-modify-write.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use newsfeed_common::{CycleId, EnrichedItem, FacetResult, Item, ItemId};

/// A response's address: the item it scores and the cycle that requested it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CycleKey {
    pub item_id: ItemId,
    pub cycle: CycleId,
}

#[derive(Debug, Clone)]
pub enum EnrichmentEvent {
    /// A fetch cycle began. Replaces the whole view; every facet starts absent.
    CycleStarted { cycle: CycleId, items: Vec<Item> },
    FacetResolved { key: CycleKey, result: FacetResult },
    /// Canonical like count reported by the content store.
    LikesUpdated { item_id: ItemId, likes: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// Superseded: the response belongs to an older cycle, the cycle start is
    /// not newer than the current one, or the like count is lower than shown.
    Stale,
    /// The item is not in the current view at all.
    Unknown,
}

#[derive(Debug, Clone)]
struct Entry {
    cycle: CycleId,
    view: EnrichedItem,
}

#[derive(Debug, Default)]
pub struct FeedState {
    entries: HashMap<ItemId, Entry>,
    order: Vec<ItemId>,
    latest: Option<CycleId>,
}

impl FeedState {
    /// Most recent cycle whose start was applied.
    pub fn latest_cycle(&self) -> Option<CycleId> {
        self.latest
    }

    fn next_cycle(&self) -> CycleId {
        CycleId(self.latest.map_or(1, |c| c.0 + 1))
    }

    pub fn get(&self, id: &ItemId) -> Option<&EnrichedItem> {
        self.entries.get(id).map(|e| &e.view)
    }

    pub fn cycle_of(&self, id: &ItemId) -> Option<CycleId> {
        self.entries.get(id).map(|e| e.cycle)
    }

    /// Items in feed order.
    pub fn items(&self) -> impl Iterator<Item = &EnrichedItem> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| &e.view))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub fn reduce(state: &mut FeedState, event: EnrichmentEvent) -> MergeOutcome {
    match event {
        EnrichmentEvent::CycleStarted { cycle, items } => {
            if state.latest.is_some_and(|latest| cycle <= latest) {
                return MergeOutcome::Stale;
            }
            state.latest = Some(cycle);
            state.entries.clear();
            state.order.clear();
            let mut seen = HashSet::new();
            for item in items {
                if !seen.insert(item.id.clone()) {
                    continue;
                }
                state.order.push(item.id.clone());
                state.entries.insert(
                    item.id.clone(),
                    Entry {
                        cycle,
                        view: EnrichedItem::new(item),
                    },
                );
            }
            MergeOutcome::Applied
        }
        EnrichmentEvent::FacetResolved { key, result } => match state.entries.get_mut(&key.item_id) {
            Some(entry) if entry.cycle == key.cycle => {
                entry.view.apply(result);
                MergeOutcome::Applied
            }
            Some(_) => MergeOutcome::Stale,
            None => MergeOutcome::Unknown,
        },
        // Counts only grow; a lower count is an older confirmation arriving late.
        EnrichmentEvent::LikesUpdated { item_id, likes } => match state.entries.get_mut(&item_id) {
            Some(entry) if likes < entry.view.item.likes => MergeOutcome::Stale,
            Some(entry) => {
                entry.view.item.likes = likes;
                MergeOutcome::Applied
            }
            None => MergeOutcome::Unknown,
        },
    }
}

/// Shared view-model for one screen's feed.
pub struct EnrichmentStore {
    state: Mutex<FeedState>,
    version: watch::Sender<u64>,
}

impl EnrichmentStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: Mutex::new(FeedState::default()),
            version,
        }
    }

    /// Start a new cycle over `items`, replacing the current view. Duplicate
    /// ids keep their first occurrence.
    ///
    /// The id is allocated under the same lock that applies the start, so
    /// concurrent callers apply their cycles in id order.
    pub fn begin_cycle(&self, items: Vec<Item>) -> CycleId {
        let cycle = {
            let mut state = self.lock();
            let cycle = state.next_cycle();
            reduce(&mut state, EnrichmentEvent::CycleStarted { cycle, items });
            cycle
        };
        self.version.send_modify(|v| *v += 1);
        cycle
    }

    pub fn merge(&self, key: &CycleKey, result: FacetResult) -> MergeOutcome {
        self.apply(EnrichmentEvent::FacetResolved {
            key: key.clone(),
            result,
        })
    }

    pub fn set_likes(&self, item_id: &ItemId, likes: u64) -> MergeOutcome {
        self.apply(EnrichmentEvent::LikesUpdated {
            item_id: item_id.clone(),
            likes,
        })
    }

    pub fn get(&self, id: &ItemId) -> Option<EnrichedItem> {
        self.lock().get(id).cloned()
    }

    pub fn cycle_of(&self, id: &ItemId) -> Option<CycleId> {
        self.lock().cycle_of(id)
    }

    /// Current view in feed order.
    pub fn snapshot(&self) -> Vec<EnrichedItem> {
        self.lock().items().cloned().collect()
    }

    /// Version counter bumped on every applied patch. Views re-render on change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn apply(&self, event: EnrichmentEvent) -> MergeOutcome {
        let outcome = reduce(&mut self.lock(), event);
        if outcome == MergeOutcome::Applied {
            self.version.send_modify(|v| *v += 1);
        }
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EnrichmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{item, sample_bias, sample_fake_news, sample_sentiment};
    use newsfeed_common::Facet;

    fn started(cycle: u64, ids: &[&str]) -> FeedState {
        let mut state = FeedState::default();
        reduce(
            &mut state,
            EnrichmentEvent::CycleStarted {
                cycle: CycleId(cycle),
                items: ids.iter().map(|id| item(id)).collect(),
            },
        );
        state
    }

    fn resolved(id: &str, cycle: u64, result: FacetResult) -> EnrichmentEvent {
        EnrichmentEvent::FacetResolved {
            key: CycleKey {
                item_id: ItemId::new(id),
                cycle: CycleId(cycle),
            },
            result,
        }
    }

    #[test]
    fn cycle_start_leaves_every_facet_absent() {
        let state = started(1, &["a", "b"]);
        assert_eq!(state.len(), 2);
        assert!(state.items().all(|i| i.resolved().is_empty()));
    }

    #[test]
    fn facet_order_does_not_change_final_state() {
        let results = [sample_bias(), sample_fake_news(), sample_sentiment()];
        let permutations = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        let finals: Vec<EnrichedItem> = permutations
            .iter()
            .map(|perm| {
                let mut state = started(1, &["a"]);
                for &i in perm {
                    assert_eq!(
                        reduce(&mut state, resolved("a", 1, results[i])),
                        MergeOutcome::Applied
                    );
                }
                state.get(&ItemId::new("a")).cloned().unwrap()
            })
            .collect();

        assert!(finals[0].is_complete());
        assert!(finals.iter().all(|f| *f == finals[0]));
    }

    #[test]
    fn response_from_earlier_cycle_is_stale() {
        let mut state = started(1, &["a"]);
        reduce(
            &mut state,
            EnrichmentEvent::CycleStarted {
                cycle: CycleId(2),
                items: vec![item("a")],
            },
        );

        assert_eq!(
            reduce(&mut state, resolved("a", 1, sample_bias())),
            MergeOutcome::Stale
        );
        assert!(!state.get(&ItemId::new("a")).unwrap().has(Facet::Bias));
    }

    #[test]
    fn response_for_item_no_longer_in_view_is_unknown() {
        let mut state = started(1, &["a"]);
        reduce(
            &mut state,
            EnrichmentEvent::CycleStarted {
                cycle: CycleId(2),
                items: vec![item("b")],
            },
        );
        assert_eq!(
            reduce(&mut state, resolved("a", 1, sample_bias())),
            MergeOutcome::Unknown
        );
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let mut first = item("a");
        first.title = "first".into();
        let mut second = item("a");
        second.title = "second".into();

        let mut state = FeedState::default();
        reduce(
            &mut state,
            EnrichmentEvent::CycleStarted {
                cycle: CycleId(1),
                items: vec![first, second],
            },
        );
        assert_eq!(state.len(), 1);
        assert_eq!(state.get(&ItemId::new("a")).unwrap().item.title, "first");
    }

    #[test]
    fn store_bumps_version_only_on_applied_patches() {
        let store = EnrichmentStore::new();
        let rx = store.subscribe();
        let cycle = store.begin_cycle(vec![item("a")]);
        assert_eq!(*rx.borrow(), 1);

        let key = CycleKey {
            item_id: ItemId::new("a"),
            cycle,
        };
        store.merge(&key, sample_bias());
        assert_eq!(*rx.borrow(), 2);

        let stale = CycleKey {
            item_id: ItemId::new("a"),
            cycle: CycleId(cycle.0 + 10),
        };
        assert_eq!(store.merge(&stale, sample_sentiment()), MergeOutcome::Stale);
        assert_eq!(*rx.borrow(), 2);
    }

    #[test]
    fn set_likes_patches_only_known_items() {
        let store = EnrichmentStore::new();
        store.begin_cycle(vec![item("a")]);
        assert_eq!(store.set_likes(&ItemId::new("a"), 6), MergeOutcome::Applied);
        assert_eq!(store.get(&ItemId::new("a")).unwrap().item.likes, 6);
        assert_eq!(store.set_likes(&ItemId::new("zz"), 1), MergeOutcome::Unknown);
    }

    #[test]
    fn cycles_are_strictly_increasing() {
        let store = EnrichmentStore::new();
        let c1 = store.begin_cycle(vec![item("a")]);
        let c2 = store.begin_cycle(vec![item("a")]);
        assert!(c2 > c1);
        assert_eq!(store.cycle_of(&ItemId::new("a")), Some(c2));
    }

    #[test]
    fn older_cycle_start_does_not_replace_newer_view() {
        let mut state = started(2, &["new"]);

        let outcome = reduce(
            &mut state,
            EnrichmentEvent::CycleStarted {
                cycle: CycleId(1),
                items: vec![item("old")],
            },
        );

        assert_eq!(outcome, MergeOutcome::Stale);
        assert_eq!(state.latest_cycle(), Some(CycleId(2)));
        assert_eq!(state.cycle_of(&ItemId::new("new")), Some(CycleId(2)));
        assert!(state.get(&ItemId::new("old")).is_none());
        assert_eq!(
            reduce(&mut state, resolved("new", 2, sample_bias())),
            MergeOutcome::Applied
        );
    }

    #[test]
    fn concurrent_cycle_starts_end_on_the_highest_cycle() {
        let store = std::sync::Arc::new(EnrichmentStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| store.begin_cycle(vec![item(&format!("t{t}-{i}"))]))
                        .max()
                        .unwrap()
                })
            })
            .collect();
        let highest = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .max()
            .unwrap();

        assert_eq!(highest, CycleId(400));
        let view = store.snapshot();
        assert_eq!(view.len(), 1);
        assert_eq!(store.cycle_of(&view[0].item.id), Some(highest));
    }

    #[test]
    fn lower_like_count_arriving_late_is_ignored() {
        let store = EnrichmentStore::new();
        store.begin_cycle(vec![item("a")]);
        let rx = store.subscribe();

        assert_eq!(store.set_likes(&ItemId::new("a"), 7), MergeOutcome::Applied);
        assert_eq!(store.set_likes(&ItemId::new("a"), 6), MergeOutcome::Stale);

        assert_eq!(store.get(&ItemId::new("a")).unwrap().item.likes, 7);
        assert_eq!(*rx.borrow(), 2);
    }
}
