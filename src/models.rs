use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::moderation::CommentState;

// --- Identity ---

/// Role
///
/// The roles an actor can hold. Only `Admin` carries any weight in the policy;
/// `User` is the baseline every authenticated principal has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    User,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Actor
///
/// An authenticated principal. Supplied by the `AuthUser` extractor; the policy
/// core never looks anything up itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Actor {
    pub id: Uuid,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(id: Uuid, roles: Vec<Role>) -> Self {
        Self { id, roles }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

/// ActorRow
///
/// Raw row from the `users` table. Roles are stored as `TEXT[]`.
#[derive(Debug, Clone, FromRow)]
pub struct ActorRow {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl From<ActorRow> for Actor {
    fn from(row: ActorRow) -> Self {
        let roles = row
            .roles
            .iter()
            .filter_map(|raw| match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(e) => {
                    tracing::warn!(actor_id = %row.id, "ignoring role: {}", e);
                    None
                }
            })
            .collect();

        Actor { id: row.id, roles }
    }
}

// --- Posts ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Post
///
/// A blog post. The author is fixed by the constructor and has no setter.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Post {
    pub id: i64,
    author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Vec<Tag>,
}

impl Post {
    /// Builds a post owned by `author_id`. Tags are attached separately by the repository.
    pub fn new(id: i64, author_id: Uuid, req: CreatePostRequest) -> Self {
        Self {
            id,
            author_id,
            title: req.title,
            slug: req.slug,
            summary: req.summary,
            content: req.content,
            published_at: req.published_at,
            tags: Vec::new(),
        }
    }

    pub fn author_id(&self) -> Uuid {
        self.author_id
    }

    pub fn is_authored_by(&self, actor: &Actor) -> bool {
        self.author_id == actor.id
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }
}

/// PostRow
///
/// Raw row from the `posts` table, before tags are joined in.
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: i64,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl PostRow {
    pub fn into_post(self, tags: Vec<Tag>) -> Post {
        Post {
            id: self.id,
            author_id: self.author_id,
            title: self.title,
            slug: self.slug,
            summary: self.summary,
            content: self.content,
            published_at: self.published_at,
            tags,
        }
    }
}

// --- Comments ---

/// Review
///
/// Who approved a comment and when. Reviewer and timestamp only exist together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Review {
    pub allowed_by: Uuid,
    #[ts(type = "string")]
    pub allowed_at: DateTime<Utc>,
}

/// Comment
///
/// Visibility fields are private: the only way to change them is `apply`, which
/// writes `allowed`, `allowed_by` and `allowed_at` as one unit. The reviewer and
/// the timestamp are either both set or both null.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: Uuid,
    pub content: String,
    #[ts(type = "string")]
    pub published_at: DateTime<Utc>,
    allowed: bool,
    allowed_by: Option<Uuid>,
    #[ts(type = "string | null")]
    allowed_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(
        id: i64,
        post_id: i64,
        author_id: Uuid,
        content: String,
        published_at: DateTime<Utc>,
        state: CommentState,
    ) -> Self {
        let mut comment = Self {
            id,
            post_id,
            author_id,
            content,
            published_at,
            allowed: false,
            allowed_by: None,
            allowed_at: None,
        };
        comment.apply(state);
        comment
    }

    pub fn allowed(&self) -> bool {
        self.allowed
    }

    pub fn review(&self) -> Option<Review> {
        self.allowed_by
            .zip(self.allowed_at)
            .map(|(allowed_by, allowed_at)| Review {
                allowed_by,
                allowed_at,
            })
    }

    /// True when an administrator explicitly approved this comment.
    pub fn is_approved(&self) -> bool {
        self.allowed && self.review().is_some()
    }

    pub fn apply(&mut self, state: CommentState) {
        let review = state.review();
        self.allowed = state.is_allowed();
        self.allowed_by = review.map(|r| r.allowed_by);
        self.allowed_at = review.map(|r| r.allowed_at);
    }

    pub fn visibility(&self) -> CommentVisibility {
        CommentVisibility {
            allowed: self.allowed,
            allowed_by: self.allowed_by,
            allowed_at: self.allowed_at,
        }
    }
}

// Incoming JSON has the row shape; a half-set review is dropped on the way in.
impl<'de> Deserialize<'de> for Comment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        CommentRow::deserialize(deserializer).map(Comment::from)
    }
}

/// CommentRow
///
/// Raw row from the `comments` table. A row with only one of `allowed_by` /
/// `allowed_at` set is read as unreviewed.
#[derive(Debug, Clone, Deserialize, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: Uuid,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub allowed: bool,
    pub allowed_by: Option<Uuid>,
    pub allowed_at: Option<DateTime<Utc>>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        let (allowed_by, allowed_at) = row
            .allowed_by
            .zip(row.allowed_at)
            .map_or((None, None), |(by, at)| (Some(by), Some(at)));

        Comment {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            content: row.content,
            published_at: row.published_at,
            allowed: row.allowed,
            allowed_by,
            allowed_at,
        }
    }
}

/// CommentVisibility
///
/// The flat `{allowed, allowed_by, allowed_at}` triple returned by the moderation
/// endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentVisibility {
    pub allowed: bool,
    pub allowed_by: Option<Uuid>,
    #[ts(type = "string | null")]
    pub allowed_at: Option<DateTime<Utc>>,
}

// --- Request Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    /// Tag names; unknown names are created.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// UpdatePostRequest
///
/// Partial update. `tags`, when present, replaces the whole tag set.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// UpdateConfigRequest
///
/// Carries the raw integer so that out-of-range values reach `ModerationConfig::set`
/// and fail there with `InvalidLevel`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateConfigRequest {
    pub moderation_level: i64,
}

// --- Responses ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ModerationChoice {
    pub value: i16,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ModerationConfigResponse {
    pub moderation_level: i16,
    pub label: String,
    pub choices: Vec<ModerationChoice>,
}

/// AdminIndexResponse
///
/// Backend landing page: the current actor's posts plus the moderation setting.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminIndexResponse {
    pub posts: Vec<Post>,
    pub config: ModerationConfigResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostDetails {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// ReviewResponse
///
/// Outcome of an explicit review, together with the refreshed parent post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReviewResponse {
    pub comment_id: i64,
    pub visibility: CommentVisibility,
    pub post: PostDetails,
}
