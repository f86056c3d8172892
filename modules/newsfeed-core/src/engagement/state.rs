//! States, outcomes and notices of one engagement action.
//!
//! An action walks `Idle -> IdentityPending -> ... -> ContentAccepted` (or
//! stops early). The walk is recorded as the report's `path`, so callers and
//! tests can see exactly which steps ran.

use std::fmt;

use serde::Serialize;

use newsfeed_common::{Comment, ItemKind, ItemRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementState {
    Idle,
    Unauthenticated,
    IdentityPending,
    IdentityAccepted,
    /// The identity store already had the pair. Terminal and benign.
    IdentityRejected,
    IdentityFailed,
    ContentPending,
    ContentAccepted,
    /// Identity write stands; the content store never confirmed.
    ContentFailed,
}

impl EngagementState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngagementState::Unauthenticated
                | EngagementState::IdentityRejected
                | EngagementState::IdentityFailed
                | EngagementState::ContentAccepted
                | EngagementState::ContentFailed
        )
    }
}

impl fmt::Display for EngagementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngagementState::Idle => "idle",
            EngagementState::Unauthenticated => "unauthenticated",
            EngagementState::IdentityPending => "identity_pending",
            EngagementState::IdentityAccepted => "identity_accepted",
            EngagementState::IdentityRejected => "identity_rejected",
            EngagementState::IdentityFailed => "identity_failed",
            EngagementState::ContentPending => "content_pending",
            EngagementState::ContentAccepted => "content_accepted",
            EngagementState::ContentFailed => "content_failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EngagementOutcome {
    /// Content store confirmed; `likes` is its canonical count.
    Liked { title: String, likes: u64 },
    Commented { title: String, comments: Vec<Comment> },
    AlreadyEngaged,
    Unauthenticated,
    /// Rejected locally before any network call.
    InvalidInput { reason: String },
    IdentityFailed { error: String },
    ContentWriteFailed { error: String },
}

impl EngagementOutcome {
    /// Failures the caller should surface as errors. Notices like
    /// `AlreadyEngaged` are not failures.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            EngagementOutcome::InvalidInput { .. }
                | EngagementOutcome::IdentityFailed { .. }
                | EngagementOutcome::ContentWriteFailed { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// User-facing message. Notices sharing a `dedupe_key` replace each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub dedupe_key: String,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>, dedupe_key: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            dedupe_key: dedupe_key.into(),
        }
    }

    pub(crate) fn login_to_like(kind: ItemKind) -> Self {
        Self::new(
            NoticeLevel::Error,
            format!("Login to like {}s.", kind.noun()),
            "login-first",
        )
    }

    pub(crate) fn login_to_comment() -> Self {
        Self::new(NoticeLevel::Error, "Login to add comment.", "login-first-comment")
    }

    pub(crate) fn already_liked(target: &ItemRef) -> Self {
        Self::new(
            NoticeLevel::Info,
            format!("You've already liked this {}", target.kind.noun()),
            format!("already-liked-{}", target.id),
        )
    }

    pub(crate) fn liked(target: &ItemRef, title: &str) -> Self {
        Self::new(
            NoticeLevel::Success,
            format!("Liked \"{title}\""),
            format!("liked-{}", target.id),
        )
    }

    pub(crate) fn commented(target: &ItemRef, title: &str) -> Self {
        Self::new(
            NoticeLevel::Success,
            format!("Comment added to {} \"{title}\"", target.kind.noun()),
            format!("comment-added-{}", target.id),
        )
    }

    pub(crate) fn invalid(target: &ItemRef, reason: &str) -> Self {
        Self::new(NoticeLevel::Error, reason, format!("invalid-{}", target.id))
    }

    pub(crate) fn failed(target: &ItemRef, action: &str) -> Self {
        Self::new(
            NoticeLevel::Error,
            format!("Failed to {action} {}. Please try again.", target.kind.noun()),
            format!("{}-failed-{}", action.replace(' ', "-"), target.id),
        )
    }

    pub(crate) fn not_recorded(target: &ItemRef, action: &str) -> Self {
        Self::new(
            NoticeLevel::Error,
            format!(
                "Your {action} was saved to your profile but the {} could not be updated.",
                target.kind.noun()
            ),
            format!("{action}-unconfirmed-{}", target.id),
        )
    }
}

/// Everything one coordinator call did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementReport {
    pub target: ItemRef,
    /// States visited, starting at `Idle`.
    pub path: Vec<EngagementState>,
    pub outcome: EngagementOutcome,
    pub notice: Notice,
}

impl EngagementReport {
    pub fn final_state(&self) -> EngagementState {
        self.path.last().copied().unwrap_or(EngagementState::Idle)
    }
}

/// Records the state walk of one action and seals it into a report.
pub(crate) struct Saga {
    target: ItemRef,
    path: Vec<EngagementState>,
}

impl Saga {
    pub(crate) fn start(target: &ItemRef) -> Self {
        Self {
            target: target.clone(),
            path: vec![EngagementState::Idle],
        }
    }

    pub(crate) fn advance(&mut self, state: EngagementState) {
        self.path.push(state);
    }

    pub(crate) fn target(&self) -> &ItemRef {
        &self.target
    }

    pub(crate) fn finish(self, outcome: EngagementOutcome, notice: Notice) -> EngagementReport {
        EngagementReport {
            target: self.target,
            path: self.path,
            outcome,
            notice,
        }
    }
}
