//! Two-step engagement writes: identity store first, then content store.
//!
//! The identity step is the idempotency gate. Only a genuinely new identity
//! acceptance is forwarded to the content store. A content failure after an
//! accepted identity write is reported and journaled, never rolled back.

use std::sync::Arc;

use tracing::{info, warn};

use newsfeed_common::{Engagement, EngagementRecord, ItemKind, ItemRef, OutboundComment};

use crate::engagement::journal::EngagementJournal;
use crate::engagement::session::Session;
use crate::engagement::state::{
    EngagementOutcome, EngagementReport, EngagementState, Notice, Saga,
};
use crate::enrichment::merger::EnrichmentStore;
use crate::traits::{ContentStore, IdentityStore};

pub struct EngagementCoordinator {
    identity: Arc<dyn IdentityStore>,
    content: Arc<dyn ContentStore>,
    view: Option<Arc<EnrichmentStore>>,
    journal: Arc<EngagementJournal>,
}

impl EngagementCoordinator {
    pub fn new(identity: Arc<dyn IdentityStore>, content: Arc<dyn ContentStore>) -> Self {
        Self {
            identity,
            content,
            view: None,
            journal: Arc::new(EngagementJournal::new()),
        }
    }

    /// Patch confirmed like counts into this view.
    pub fn with_view(mut self, view: Arc<EnrichmentStore>) -> Self {
        self.view = Some(view);
        self
    }

    pub fn journal(&self) -> &Arc<EngagementJournal> {
        &self.journal
    }

    pub async fn like(&self, session: &mut Session, target: &ItemRef) -> EngagementReport {
        let mut saga = Saga::start(target);

        let Some(credential) = session.credential().cloned() else {
            info!(%target, "Like attempted without a credential");
            saga.advance(EngagementState::Unauthenticated);
            return saga.finish(
                EngagementOutcome::Unauthenticated,
                Notice::login_to_like(target.kind),
            );
        };

        saga.advance(EngagementState::IdentityPending);
        let ack = match self
            .identity
            .add_like(&credential, target.kind, &target.id)
            .await
        {
            Ok(ack) => ack,
            Err(e) => {
                warn!(%target, actor_id = %credential.actor_id, error = %e, "Identity store like failed");
                saga.advance(EngagementState::IdentityFailed);
                return saga.finish(
                    EngagementOutcome::IdentityFailed {
                        error: format!("{e:#}"),
                    },
                    Notice::failed(target, "like"),
                );
            }
        };

        // Either way the pair is now in the identity store's liked set.
        session.record_like(target);

        if !ack.success {
            info!(%target, actor_id = %credential.actor_id, "Already liked");
            saga.advance(EngagementState::IdentityRejected);
            return saga.finish(EngagementOutcome::AlreadyEngaged, Notice::already_liked(target));
        }

        saga.advance(EngagementState::IdentityAccepted);
        let record = EngagementRecord::new(&credential.actor_id, target, Engagement::Like);

        saga.advance(EngagementState::ContentPending);
        match self.content.increment_likes(target.kind, &target.id).await {
            Ok(item) => {
                self.journal.append(record, true);
                if let Some(view) = &self.view {
                    view.set_likes(&target.id, item.likes);
                }
                info!(%target, likes = item.likes, "Like recorded");
                saga.advance(EngagementState::ContentAccepted);
                let notice = Notice::liked(saga.target(), &item.title);
                saga.finish(
                    EngagementOutcome::Liked {
                        title: item.title,
                        likes: item.likes,
                    },
                    notice,
                )
            }
            Err(e) => {
                warn!(
                    %target,
                    actor_id = %credential.actor_id,
                    error = %e,
                    "Content store like failed after identity accepted; identity write stands"
                );
                self.journal.append(record, false);
                saga.advance(EngagementState::ContentFailed);
                saga.finish(
                    EngagementOutcome::ContentWriteFailed {
                        error: format!("{e:#}"),
                    },
                    Notice::not_recorded(target, "like"),
                )
            }
        }
    }

    /// Append a comment to the actor's profile, then forward it to the
    /// article's comment list. Input is validated before the credential check.
    pub async fn comment(&self, session: &Session, target: &ItemRef, text: &str) -> EngagementReport {
        let mut saga = Saga::start(target);
        let text = text.trim();

        if target.kind != ItemKind::Article {
            return invalid(saga, "Comments are only supported on articles.");
        }
        if text.is_empty() {
            return invalid(saga, "Comment cannot be empty.");
        }

        let Some(credential) = session.credential().cloned() else {
            info!(%target, "Comment attempted without a credential");
            saga.advance(EngagementState::Unauthenticated);
            return saga.finish(EngagementOutcome::Unauthenticated, Notice::login_to_comment());
        };

        saga.advance(EngagementState::IdentityPending);
        let rejected = match self
            .identity
            .append_comment(&credential, &target.id, text)
            .await
        {
            Ok(ack) if ack.success => None,
            Ok(ack) => Some(
                ack.message
                    .unwrap_or_else(|| "identity store rejected the comment".to_string()),
            ),
            Err(e) => Some(format!("{e:#}")),
        };
        if let Some(error) = rejected {
            warn!(%target, actor_id = %credential.actor_id, %error, "Identity store comment failed");
            saga.advance(EngagementState::IdentityFailed);
            return saga.finish(
                EngagementOutcome::IdentityFailed { error },
                Notice::failed(target, "comment on"),
            );
        }

        saga.advance(EngagementState::IdentityAccepted);
        let record = EngagementRecord::new(
            &credential.actor_id,
            target,
            Engagement::Comment {
                text: text.to_string(),
            },
        );
        let outbound = OutboundComment {
            user_id: credential.actor_id.clone(),
            user_name: credential.actor_name.clone(),
            text: text.to_string(),
        };

        saga.advance(EngagementState::ContentPending);
        match self.content.post_comment(&target.id, &outbound).await {
            Ok(item) => {
                self.journal.append(record, true);
                info!(%target, comments = item.comments.len(), "Comment recorded");
                saga.advance(EngagementState::ContentAccepted);
                let notice = Notice::commented(saga.target(), &item.title);
                saga.finish(
                    EngagementOutcome::Commented {
                        title: item.title,
                        comments: item.comments,
                    },
                    notice,
                )
            }
            Err(e) => {
                warn!(
                    %target,
                    actor_id = %credential.actor_id,
                    error = %e,
                    "Content store comment failed after identity accepted; identity write stands"
                );
                self.journal.append(record, false);
                saga.advance(EngagementState::ContentFailed);
                saga.finish(
                    EngagementOutcome::ContentWriteFailed {
                        error: format!("{e:#}"),
                    },
                    Notice::not_recorded(target, "comment"),
                )
            }
        }
    }
}

fn invalid(saga: Saga, reason: &str) -> EngagementReport {
    let notice = Notice::invalid(saga.target(), reason);
    saga.finish(
        EngagementOutcome::InvalidInput {
            reason: reason.to_string(),
        },
        notice,
    )
}
