use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use newsfeed_common::EngagementRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    pub record: EngagementRecord,
    /// False when the identity write succeeded but the content store never
    /// confirmed. These are the records a reconciliation pass would retry.
    pub content_confirmed: bool,
}

/// Append-only log of identity-accepted engagements.
#[derive(Debug, Default)]
pub struct EngagementJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl EngagementJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: EngagementRecord, content_confirmed: bool) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(JournalEntry {
                record,
                content_confirmed,
            });
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Identity-accepted records the content store has not confirmed.
    pub fn unconfirmed(&self) -> Vec<EngagementRecord> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| !e.content_confirmed)
            .map(|e| e.record.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsfeed_common::{Engagement, ItemRef};

    #[test]
    fn unconfirmed_lists_only_unconfirmed_records() {
        let journal = EngagementJournal::new();
        journal.append(
            EngagementRecord::new("u1", &ItemRef::article("a"), Engagement::Like),
            true,
        );
        journal.append(
            EngagementRecord::new("u1", &ItemRef::article("b"), Engagement::Like),
            false,
        );

        assert_eq!(journal.len(), 2);
        let pending = journal.unconfirmed();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].item_id.as_str(), "b");
    }
}
