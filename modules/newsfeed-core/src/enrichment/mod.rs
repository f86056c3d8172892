pub mod dispatcher;
pub mod feed;
pub mod merger;

pub use dispatcher::{DispatchHandle, DispatchStats, Dispatcher};
pub use feed::{FeedLoader, Screen};
pub use merger::{reduce, CycleKey, EnrichmentEvent, EnrichmentStore, FeedState, MergeOutcome};
