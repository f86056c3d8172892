use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use newsfeed_common::{ItemId, ItemKind, Preferences};

use crate::engagement::session::Session;
use crate::enrichment::dispatcher::{DispatchHandle, Dispatcher};
use crate::traits::FeedSource;

/// Which batch of items to show.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Home,
    ForYou(Preferences),
    /// The actor's profile page: items whose ids are in their liked set.
    Liked(Vec<ItemId>),
    Detail { kind: ItemKind, id: ItemId },
}

impl Screen {
    /// The profile screen for `session`. Only liked articles are listed.
    pub fn liked_by(session: &Session) -> Self {
        Screen::Liked(session.liked_articles())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Screen::Home => "home",
            Screen::ForYou(_) => "for_you",
            Screen::Liked(_) => "liked",
            Screen::Detail { .. } => "detail",
        }
    }
}

/// Fetches a screen's batch and starts a dispatch cycle over it.
pub struct FeedLoader {
    source: Arc<dyn FeedSource>,
    dispatcher: Dispatcher,
}

impl FeedLoader {
    pub fn new(source: Arc<dyn FeedSource>, dispatcher: Dispatcher) -> Self {
        Self { source, dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Fetch the batch for `screen` and dispatch it. A fetch failure is
    /// returned as-is and leaves the current view untouched.
    pub async fn load(&self, screen: &Screen) -> Result<DispatchHandle> {
        let items = match screen {
            Screen::Home => self.source.home().await,
            Screen::ForYou(preferences) => self.source.for_you(preferences).await,
            Screen::Liked(ids) => self.source.liked(ids).await,
            Screen::Detail { kind, id } => self.source.item(*kind, id).await.map(|item| vec![item]),
        }
        .with_context(|| format!("Failed to load {} feed", screen.name()))?;

        info!(screen = screen.name(), items = items.len(), "Feed loaded");
        Ok(self.dispatcher.dispatch(items))
    }
}
