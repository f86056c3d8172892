pub mod coordinator;
pub mod journal;
pub mod session;
pub mod state;

pub use coordinator::EngagementCoordinator;
pub use journal::{EngagementJournal, JournalEntry};
pub use session::Session;
pub use state::{EngagementOutcome, EngagementReport, EngagementState, Notice, NoticeLevel};
