use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    error::AppError,
    moderation::{ModerationConfig, ModerationLevel},
    models::{
        Actor, ActorRow, Comment, CommentRow, CommentVisibility, CreatePostRequest, Post,
        PostRow, Tag, UpdatePostRequest,
    },
};

/// Repository Trait
///
/// Persistence contract for the controller layer. The policy and moderation
/// core never call this; handlers load entities, run the core, and write back.
///
/// Writes are last-write-wins: each state change is one statement, with no
/// version check.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Actors ---
    async fn get_actor(&self, id: Uuid) -> Result<Option<Actor>, AppError>;

    // --- Moderation config ---
    /// Returns the default (OPEN) config when nothing has been stored yet.
    async fn get_moderation_config(&self) -> Result<ModerationConfig, AppError>;
    async fn save_moderation_config(&self, config: &ModerationConfig) -> Result<(), AppError>;

    // --- Posts ---
    /// Posts owned by `author_id`, newest publication first.
    async fn get_posts_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, AppError>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>, AppError>;
    async fn create_post(&self, author_id: Uuid, req: CreatePostRequest) -> Result<Post, AppError>;
    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> Result<Option<Post>, AppError>;
    /// Removes the post's tag associations, then the post itself.
    async fn delete_post(&self, post: &Post) -> Result<bool, AppError>;

    // --- Comments ---
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError>;
    /// Every comment on a post, hidden ones included.
    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError>;
    /// Only the comments whose `allowed` flag is set.
    async fn get_visible_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError>;
    /// Inserts a comment with the visibility computed by the moderation workflow.
    async fn add_comment(
        &self,
        post_id: i64,
        author_id: Uuid,
        content: String,
        initial: CommentVisibility,
    ) -> Result<Comment, AppError>;
    /// Persists `allowed`, `allowed_by` and `allowed_at` together.
    async fn save_comment_state(&self, comment: &Comment) -> Result<(), AppError>;
    /// Number of `author_id`'s comments an administrator explicitly approved.
    async fn count_approved_comments(&self, author_id: Uuid) -> Result<u64, AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are checked at runtime so the crate
/// builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const POST_COLUMNS: &str = "id, author_id, title, slug, summary, content, published_at";
const COMMENT_COLUMNS: &str =
    "id, post_id, author_id, content, published_at, allowed, allowed_by, allowed_at";

#[derive(FromRow)]
struct TagLink {
    post_id: i64,
    id: i64,
    name: String,
}

async fn tags_for(
    pool: &PgPool,
    post_ids: &[i64],
) -> Result<HashMap<i64, Vec<Tag>>, sqlx::Error> {
    let links = sqlx::query_as::<_, TagLink>(
        r#"
        SELECT pt.post_id, t.id, t.name
        FROM post_tags pt
        JOIN tags t ON t.id = pt.tag_id
        WHERE pt.post_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;

    let mut by_post: HashMap<i64, Vec<Tag>> = HashMap::new();
    for link in links {
        by_post.entry(link.post_id).or_default().push(Tag {
            id: link.id,
            name: link.name,
        });
    }
    Ok(by_post)
}

/// Stored levels outside {0, 1, 2} surface as `Internal`, never as `InvalidLevel`.
fn level_from_storage(value: i16) -> Result<ModerationLevel, AppError> {
    ModerationLevel::try_from(i64::from(value)).map_err(|_| {
        AppError::Internal(format!("stored moderation level {} is out of range", value))
    })
}

/// Replaces a post's tag set, creating unknown tag names on the way.
async fn replace_tags(
    conn: &mut PgConnection,
    post_id: i64,
    names: &[String],
) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(tag.id)
        .execute(&mut *conn)
        .await?;

        tags.push(tag);
    }
    Ok(tags)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_actor(&self, id: Uuid) -> Result<Option<Actor>, AppError> {
        let row = sqlx::query_as::<_, ActorRow>("SELECT id, roles FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Actor::from))
    }

    async fn get_moderation_config(&self) -> Result<ModerationConfig, AppError> {
        let level = sqlx::query_scalar::<_, i16>(
            "SELECT moderation_level FROM moderation_config WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match level {
            Some(value) => Ok(ModerationConfig::new(level_from_storage(value)?)),
            None => Ok(ModerationConfig::default()),
        }
    }

    async fn save_moderation_config(&self, config: &ModerationConfig) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO moderation_config (id, moderation_level) VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET moderation_level = EXCLUDED.moderation_level
            "#,
        )
        .bind(config.level_value())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_posts_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, AppError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts
            WHERE author_id = $1
            ORDER BY published_at DESC NULLS LAST
            "#
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut tags = tags_for(&self.pool, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let post_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_post(post_tags)
            })
            .collect())
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let tags = tags_for(&self.pool, &[row.id])
                    .await?
                    .remove(&row.id)
                    .unwrap_or_default();
                Ok(Some(row.into_post(tags)))
            }
            None => Ok(None),
        }
    }

    async fn create_post(&self, author_id: Uuid, req: CreatePostRequest) -> Result<Post, AppError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO posts (author_id, title, slug, summary, content, published_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(author_id)
        .bind(&req.title)
        .bind(&req.slug)
        .bind(&req.summary)
        .bind(&req.content)
        .bind(req.published_at)
        .fetch_one(&mut *tx)
        .await?;

        let tag_names = req.tags.clone();
        let tags = replace_tags(&mut *tx, id, &tag_names).await?;
        tx.commit().await?;

        let mut post = Post::new(id, author_id, req);
        post.tags = tags;
        Ok(post)
    }

    async fn update_post(&self, id: i64, req: UpdatePostRequest) -> Result<Option<Post>, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                summary = COALESCE($3, summary),
                content = COALESCE($4, content),
                published_at = COALESCE($5, published_at)
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(req.title)
        .bind(req.summary)
        .bind(req.content)
        .bind(req.published_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if let Some(names) = req.tags {
            replace_tags(&mut *tx, id, &names).await?;
        }
        tx.commit().await?;

        let tags = tags_for(&self.pool, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(row.into_post(tags)))
    }

    async fn delete_post(&self, post: &Post) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post.id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post.id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        tx.commit().await?;
        Ok(deleted)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Comment::from))
    }

    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY published_at ASC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn get_visible_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE post_id = $1 AND allowed = true
            ORDER BY published_at ASC
            "#
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn add_comment(
        &self,
        post_id: i64,
        author_id: Uuid,
        content: String,
        initial: CommentVisibility,
    ) -> Result<Comment, AppError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            INSERT INTO comments
                (post_id, author_id, content, published_at, allowed, allowed_by, allowed_at)
            VALUES ($1, $2, $3, NOW(), $4, $5, $6)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .bind(initial.allowed)
        .bind(initial.allowed_by)
        .bind(initial.allowed_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(Comment::from(row))
    }

    async fn save_comment_state(&self, comment: &Comment) -> Result<(), AppError> {
        let visibility = comment.visibility();
        sqlx::query(
            "UPDATE comments SET allowed = $2, allowed_by = $3, allowed_at = $4 WHERE id = $1",
        )
        .bind(comment.id)
        .bind(visibility.allowed)
        .bind(visibility.allowed_by)
        .bind(visibility.allowed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_approved_comments(&self, author_id: Uuid) -> Result<u64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM comments
            WHERE author_id = $1 AND allowed = true AND allowed_by IS NOT NULL
            "#,
        )
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
