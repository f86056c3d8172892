pub mod engagement;
pub mod enrichment;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use engagement::{
    EngagementCoordinator, EngagementJournal, EngagementOutcome, EngagementReport,
    EngagementState, Notice, NoticeLevel, Session,
};
pub use enrichment::{
    CycleKey, DispatchHandle, DispatchStats, Dispatcher, EnrichmentStore, FeedLoader, MergeOutcome,
    Screen,
};
