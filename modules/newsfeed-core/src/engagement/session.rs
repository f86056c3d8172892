use std::collections::HashSet;

use newsfeed_common::{Credential, ItemId, ItemKind, ItemRef};

/// The acting user as the coordinator sees them: an optional credential and a
/// local mirror of the identity store's liked set.
#[derive(Debug, Clone, Default)]
pub struct Session {
    credential: Option<Credential>,
    liked: HashSet<ItemRef>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
            liked: HashSet::new(),
        }
    }

    /// Seed the mirror, e.g. from the liked items returned at login.
    pub fn with_liked(mut self, items: impl IntoIterator<Item = ItemRef>) -> Self {
        self.liked.extend(items);
        self
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn has_liked(&self, item: &ItemRef) -> bool {
        self.liked.contains(item)
    }

    /// Liked items of every kind, articles first, each kind sorted by id.
    pub fn liked(&self) -> Vec<ItemRef> {
        let mut items: Vec<ItemRef> = self.liked.iter().cloned().collect();
        items.sort_by(|a, b| {
            (a.kind.collection(), &a.id).cmp(&(b.kind.collection(), &b.id))
        });
        items
    }

    /// Liked article ids in sorted order. The liked screen only lists articles.
    pub fn liked_articles(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .liked
            .iter()
            .filter(|r| r.kind == ItemKind::Article)
            .map(|r| r.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub(crate) fn record_like(&mut self, item: &ItemRef) {
        self.liked.insert(item.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::credential;

    #[test]
    fn anonymous_session_has_no_credential() {
        assert!(Session::anonymous().credential().is_none());
    }

    #[test]
    fn liked_articles_are_sorted() {
        let session = Session::authenticated(credential("u1")).with_liked([
            ItemRef::article("c"),
            ItemRef::article("a"),
            ItemRef::article("b"),
        ]);
        assert_eq!(
            session.liked_articles(),
            vec![ItemId::new("a"), ItemId::new("b"), ItemId::new("c")]
        );
        assert!(session.has_liked(&ItemRef::article("b")));
    }

    #[test]
    fn article_and_video_with_same_id_are_distinct() {
        let session =
            Session::authenticated(credential("u1")).with_liked([ItemRef::video("x")]);

        assert!(session.has_liked(&ItemRef::video("x")));
        assert!(!session.has_liked(&ItemRef::article("x")));
        assert!(session.liked_articles().is_empty());

        let session = session.with_liked([ItemRef::article("x")]);
        assert_eq!(
            session.liked(),
            vec![ItemRef::article("x"), ItemRef::video("x")]
        );
        assert_eq!(session.liked_articles(), vec![ItemId::new("x")]);
    }
}
