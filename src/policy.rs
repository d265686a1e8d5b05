//! Access policy for posts.
//!
//! Each `PostAction` variant owns one predicate. Adding an action means adding a
//! variant and its arm in `decide`; there is no fallback arm.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{Actor, Post},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PostAction {
    Show,
    Edit,
    Delete,
}

impl PostAction {
    pub const ALL: [PostAction; 3] = [PostAction::Show, PostAction::Edit, PostAction::Delete];

    /// Message surfaced to the caller when this action is denied.
    pub fn denial_reason(self) -> &'static str {
        match self {
            PostAction::Show => "Posts can only be shown to their authors.",
            PostAction::Edit => "Posts can only be edited by their authors.",
            PostAction::Delete => "Posts can only be deleted by their authors.",
        }
    }
}

impl fmt::Display for PostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PostAction::Show => "show",
            PostAction::Edit => "edit",
            PostAction::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

fn can_show(actor: &Actor, post: &Post) -> bool {
    post.is_authored_by(actor) || actor.is_admin()
}

// Ownership only; administrators get no implicit edit right.
fn can_edit(actor: &Actor, post: &Post) -> bool {
    post.is_authored_by(actor)
}

fn can_delete(actor: &Actor, post: &Post) -> bool {
    post.is_authored_by(actor) || actor.is_admin()
}

/// decide
///
/// Pure verdict for `actor` performing `action` on `post`.
pub fn decide(actor: &Actor, post: &Post, action: PostAction) -> Decision {
    let permitted = match action {
        PostAction::Show => can_show(actor, post),
        PostAction::Edit => can_edit(actor, post),
        PostAction::Delete => can_delete(actor, post),
    };

    if permitted {
        Decision::Allow
    } else {
        Decision::Deny {
            reason: action.denial_reason().to_string(),
        }
    }
}

/// authorize
///
/// `decide`, lifted into the crate's error type for use with `?` in handlers.
pub fn authorize(actor: &Actor, post: &Post, action: PostAction) -> Result<(), AppError> {
    match decide(actor, post, action) {
        Decision::Allow => Ok(()),
        Decision::Deny { reason } => {
            tracing::warn!(
                actor_id = %actor.id,
                post_id = post.id,
                %action,
                "access denied"
            );
            Err(AppError::AccessDenied { action, reason })
        }
    }
}
