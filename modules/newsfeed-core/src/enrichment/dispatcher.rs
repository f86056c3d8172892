use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use newsfeed_common::{CycleId, Facet, Item};

use crate::enrichment::merger::{CycleKey, EnrichmentStore, MergeOutcome};
use crate::traits::FacetScorer;

/// Per-call deadline. A facet that takes longer stays absent for the cycle.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Max scoring calls in flight per cycle, across all items and facets.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 24;

/// Counts for one settled cycle. Every (item, facet) unit lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub resolved: usize,
    pub unavailable: usize,
    pub timed_out: usize,
    pub stale: usize,
}

impl DispatchStats {
    pub fn total(&self) -> usize {
        self.resolved + self.unavailable + self.timed_out + self.stale
    }

    fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Resolved => self.resolved += 1,
            UnitOutcome::Unavailable => self.unavailable += 1,
            UnitOutcome::TimedOut => self.timed_out += 1,
            UnitOutcome::Stale => self.stale += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum UnitOutcome {
    Resolved,
    Unavailable,
    TimedOut,
    Stale,
}

struct Unit {
    key: CycleKey,
    facet: Facet,
    item: Arc<Item>,
}

/// A running dispatch cycle. Dropping the handle does not cancel the cycle.
#[derive(Debug)]
pub struct DispatchHandle {
    cycle: CycleId,
    task: JoinHandle<DispatchStats>,
}

impl DispatchHandle {
    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    /// Wait for every unit in the cycle to resolve, fail, or time out.
    pub async fn settled(self) -> Result<DispatchStats> {
        Ok(self.task.await?)
    }

    /// Stop issuing requests for this cycle. Already-merged facets stay.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Fans a batch out to the scoring services and folds results into the store.
pub struct Dispatcher {
    scorer: Arc<dyn FacetScorer>,
    store: Arc<EnrichmentStore>,
    timeout: Duration,
    max_in_flight: usize,
}

impl Dispatcher {
    pub fn new(scorer: Arc<dyn FacetScorer>, store: Arc<EnrichmentStore>) -> Self {
        Self {
            scorer,
            store,
            timeout: DEFAULT_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn store(&self) -> &Arc<EnrichmentStore> {
        &self.store
    }

    /// Start a cycle over `items` and return without waiting for any response.
    ///
    /// The store holds every item, all facets absent, before this returns.
    /// One scoring call per (item, facet) then runs in a spawned task; each
    /// call's failure is contained to its own unit. Must be called from within
    /// a Tokio runtime.
    pub fn dispatch(&self, items: Vec<Item>) -> DispatchHandle {
        let mut seen = HashSet::new();
        let items: Vec<Item> = items
            .into_iter()
            .filter(|item| seen.insert(item.id.clone()))
            .collect();

        let cycle = self.store.begin_cycle(items.clone());

        let units: Vec<Unit> = items
            .into_iter()
            .map(Arc::new)
            .flat_map(|item| {
                Facet::ALL.into_iter().map(move |facet| Unit {
                    key: CycleKey {
                        item_id: item.id.clone(),
                        cycle,
                    },
                    facet,
                    item: Arc::clone(&item),
                })
            })
            .collect();

        info!(%cycle, units = units.len(), "Dispatching facet analysis");

        let scorer = Arc::clone(&self.scorer);
        let store = Arc::clone(&self.store);
        let timeout = self.timeout;
        let max_in_flight = self.max_in_flight;

        let task = tokio::spawn(async move {
            let mut stats = DispatchStats::default();
            let mut outcomes = stream::iter(units.into_iter().map(|unit| {
                score_unit(Arc::clone(&scorer), Arc::clone(&store), timeout, unit)
            }))
            .buffer_unordered(max_in_flight);

            while let Some(outcome) = outcomes.next().await {
                stats.record(outcome);
            }

            info!(
                %cycle,
                resolved = stats.resolved,
                unavailable = stats.unavailable,
                timed_out = stats.timed_out,
                stale = stats.stale,
                "Dispatch cycle settled"
            );
            stats
        });

        DispatchHandle { cycle, task }
    }
}

/// Score one (item, facet) unit and merge the result. Never fails: every error,
/// timeout, or panic becomes an outcome and the facet stays absent.
async fn score_unit(
    scorer: Arc<dyn FacetScorer>,
    store: Arc<EnrichmentStore>,
    timeout: Duration,
    unit: Unit,
) -> UnitOutcome {
    let item_id = &unit.key.item_id;
    let facet = unit.facet;

    let scored = AssertUnwindSafe(tokio::time::timeout(
        timeout,
        scorer.score(facet, &unit.item),
    ))
    .catch_unwind()
    .await;

    let result = match scored {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(e))) => {
            warn!(%item_id, %facet, error = %e, "Facet unavailable");
            return UnitOutcome::Unavailable;
        }
        Ok(Err(_)) => {
            warn!(%item_id, %facet, timeout_ms = timeout.as_millis() as u64, "Facet scoring timed out");
            return UnitOutcome::TimedOut;
        }
        Err(_) => {
            warn!(%item_id, %facet, "Facet scorer panicked");
            return UnitOutcome::Unavailable;
        }
    };

    if result.facet() != facet {
        warn!(%item_id, %facet, got = %result.facet(), "Scorer returned the wrong facet");
        return UnitOutcome::Unavailable;
    }

    match store.merge(&unit.key, result) {
        MergeOutcome::Applied => {
            debug!(%item_id, %facet, cycle = %unit.key.cycle, "Facet merged");
            UnitOutcome::Resolved
        }
        MergeOutcome::Stale | MergeOutcome::Unknown => {
            debug!(%item_id, %facet, cycle = %unit.key.cycle, "Discarding response from abandoned cycle");
            UnitOutcome::Stale
        }
    }
}
