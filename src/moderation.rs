//! Comment moderation: the global moderation level and the visibility state machine.
//!
//! Everything here is a pure function of its arguments. The current level is
//! loaded by the caller and passed in; the submitter's history is counted by
//! the repository and passed in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{Actor, Comment, CommentVisibility, ModerationChoice, ModerationConfigResponse, Review},
};

// --- Moderation level ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i64")]
pub enum ModerationLevel {
    /// Every comment is visible immediately.
    #[default]
    Open = 0,
    /// Every comment starts hidden until an administrator allows it.
    Moderated = 1,
    /// Visible immediately if the submitter already has an approved comment.
    TrustedAuto = 2,
}

impl ModerationLevel {
    pub const ALL: [ModerationLevel; 3] = [
        ModerationLevel::Open,
        ModerationLevel::Moderated,
        ModerationLevel::TrustedAuto,
    ];

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn label(self) -> &'static str {
        match self {
            ModerationLevel::Open => "Publish without moderation",
            ModerationLevel::Moderated => "Publish only after moderation",
            ModerationLevel::TrustedAuto => {
                "Publish automatically if the user has already been approved"
            }
        }
    }

    /// `(value, label)` for every level, in value order.
    pub fn choices() -> Vec<ModerationChoice> {
        Self::ALL
            .iter()
            .map(|level| ModerationChoice {
                value: level.as_i16(),
                label: level.label().to_string(),
            })
            .collect()
    }
}

impl TryFrom<i64> for ModerationLevel {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ModerationLevel::Open),
            1 => Ok(ModerationLevel::Moderated),
            2 => Ok(ModerationLevel::TrustedAuto),
            other => Err(AppError::InvalidLevel(other)),
        }
    }
}

impl From<ModerationLevel> for i16 {
    fn from(level: ModerationLevel) -> Self {
        level.as_i16()
    }
}

/// ModerationConfig
///
/// In-memory holder for the moderation level. Loading and saving go through
/// `Repository::get_moderation_config` / `save_moderation_config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModerationConfig {
    moderation_level: ModerationLevel,
}

impl ModerationConfig {
    pub fn new(level: ModerationLevel) -> Self {
        Self {
            moderation_level: level,
        }
    }

    pub fn get(&self) -> ModerationLevel {
        self.moderation_level
    }

    /// Integer form of the current level, one of {0, 1, 2}.
    pub fn level_value(&self) -> i16 {
        self.moderation_level.as_i16()
    }

    /// Replaces the level. On `InvalidLevel` the held level is untouched.
    pub fn set(&mut self, value: i64) -> Result<(), AppError> {
        self.moderation_level = ModerationLevel::try_from(value)?;
        Ok(())
    }

    pub fn to_response(&self) -> ModerationConfigResponse {
        ModerationConfigResponse {
            moderation_level: self.level_value(),
            label: self.moderation_level.label().to_string(),
            choices: ModerationLevel::choices(),
        }
    }
}

// --- Workflow ---

/// CommentState
///
/// `Pending` and `Disallowed` persist identically (hidden, no reviewer); they are
/// kept apart so callers can tell an auto-hidden comment from a rejected one at
/// the moment of the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentState {
    Pending,
    /// `None` when reached by auto-approval, `Some` when reached by review.
    Allowed(Option<Review>),
    Disallowed,
}

impl CommentState {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CommentState::Allowed(_))
    }

    pub fn review(&self) -> Option<&Review> {
        match self {
            CommentState::Allowed(review) => review.as_ref(),
            CommentState::Pending | CommentState::Disallowed => None,
        }
    }

    pub fn visibility(&self) -> CommentVisibility {
        let review = self.review();
        CommentVisibility {
            allowed: self.is_allowed(),
            allowed_by: review.map(|r| r.allowed_by),
            allowed_at: review.map(|r| r.allowed_at),
        }
    }
}

/// SubmitterHistory
///
/// What the workflow needs to know about a submitter's past comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitterHistory {
    /// Prior comments that were explicitly approved by an administrator.
    pub approved_comments: u64,
}

impl SubmitterHistory {
    pub fn new(approved_comments: u64) -> Self {
        Self { approved_comments }
    }

    pub fn is_trusted(&self) -> bool {
        self.approved_comments > 0
    }
}

/// ReviewAction
///
/// The two outcomes of an explicit review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Allow,
    Disallow,
}

impl ReviewAction {
    /// Parses the `{action}` path segment. Only the exact literal `allow` allows;
    /// every other literal, `disallow` included, disallows.
    pub fn from_literal(literal: &str) -> Self {
        match literal {
            "allow" => ReviewAction::Allow,
            "disallow" => ReviewAction::Disallow,
            other => {
                tracing::warn!(action = other, "unknown review action, treating as disallow");
                ReviewAction::Disallow
            }
        }
    }
}

/// initial_state
///
/// State of a freshly submitted comment. Never yields a reviewer.
pub fn initial_state(level: ModerationLevel, history: &SubmitterHistory) -> CommentState {
    match level {
        ModerationLevel::Open => CommentState::Allowed(None),
        ModerationLevel::Moderated => CommentState::Pending,
        ModerationLevel::TrustedAuto if history.is_trusted() => CommentState::Allowed(None),
        ModerationLevel::TrustedAuto => CommentState::Pending,
    }
}

/// compute_initial_comment_state
///
/// `initial_state` in its external shape. The submitter is taken for symmetry
/// with `review`; only their history influences the result.
pub fn compute_initial_comment_state(
    config: &ModerationConfig,
    submitter: &Actor,
    history: &SubmitterHistory,
) -> CommentVisibility {
    let state = initial_state(config.get(), history);
    tracing::debug!(
        submitter = %submitter.id,
        level = config.level_value(),
        allowed = state.is_allowed(),
        "computed initial comment state"
    );
    state.visibility()
}

/// review
///
/// Explicit administrator review. Callers must already have checked that
/// `reviewer` is an administrator.
pub fn review(
    comment: &Comment,
    action: ReviewAction,
    reviewer: &Actor,
    now: DateTime<Utc>,
) -> CommentState {
    let next = match action {
        ReviewAction::Allow => CommentState::Allowed(Some(Review {
            allowed_by: reviewer.id,
            allowed_at: now,
        })),
        ReviewAction::Disallow => CommentState::Disallowed,
    };

    tracing::info!(
        comment_id = comment.id,
        reviewer = %reviewer.id,
        was_allowed = comment.allowed(),
        allowed = next.is_allowed(),
        "comment reviewed"
    );

    next
}
