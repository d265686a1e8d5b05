use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::AppError,
    moderation::{self, ReviewAction, SubmitterHistory},
    models::{
        AdminIndexResponse, Comment, CreateCommentRequest, CreatePostRequest,
        ModerationConfigResponse, Post, PostDetails, ReviewResponse, UpdateConfigRequest,
        UpdatePostRequest,
    },
    policy::{self, PostAction},
};

async fn load_post(state: &AppState, id: i64) -> Result<Post, AppError> {
    state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", id)))
}

async fn post_details(state: &AppState, post: Post) -> Result<PostDetails, AppError> {
    let comments = state.repo.get_comments(post.id).await?;
    Ok(PostDetails { post, comments })
}

// --- Public & authenticated comment routes ---

/// get_visible_comments
///
/// [Public Route] Comments of a post that are currently allowed.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Visible comments", body = [Comment]),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_visible_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let post = load_post(&state, post_id).await?;
    Ok(Json(state.repo.get_visible_comments(post.id).await?))
}

/// add_comment
///
/// [Authenticated Route] Submits a comment. Its initial visibility comes from the
/// stored moderation level and, under TRUSTED_AUTO, the submitter's history of
/// approved comments.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 404, description = "Post not found")
    )
)]
pub async fn add_comment(
    AuthUser { actor }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let post = load_post(&state, post_id).await?;

    let config = state.repo.get_moderation_config().await?;
    let history = SubmitterHistory::new(state.repo.count_approved_comments(actor.id).await?);
    let initial = moderation::compute_initial_comment_state(&config, &actor, &history);

    let comment = state
        .repo
        .add_comment(post.id, actor.id, payload.content, initial)
        .await?;

    tracing::info!(
        comment_id = comment.id,
        post_id = post.id,
        allowed = comment.allowed(),
        "comment submitted"
    );
    Ok((StatusCode::CREATED, Json(comment)))
}

// --- Admin backend ---

/// admin_index
///
/// [Admin Route] The current actor's posts, newest first, with the moderation setting.
#[utoipa::path(
    get,
    path = "/admin/post",
    responses(
        (status = 200, description = "Backend index", body = AdminIndexResponse),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn admin_index(
    AdminUser { actor }: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<AdminIndexResponse>, AppError> {
    let posts = state.repo.get_posts_by_author(actor.id).await?;
    let config = state.repo.get_moderation_config().await?;
    Ok(Json(AdminIndexResponse {
        posts,
        config: config.to_response(),
    }))
}

/// get_config
///
/// [Admin Route] Current moderation level and the available choices.
#[utoipa::path(
    get,
    path = "/admin/config",
    responses(
        (status = 200, description = "Moderation config", body = ModerationConfigResponse),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn get_config(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ModerationConfigResponse>, AppError> {
    let config = state.repo.get_moderation_config().await?;
    Ok(Json(config.to_response()))
}

/// update_config
///
/// [Admin Route] Sets the moderation level. Values outside {0, 1, 2} are rejected
/// before anything is written.
#[utoipa::path(
    put,
    path = "/admin/config",
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Updated", body = ModerationConfigResponse),
        (status = 400, description = "Invalid moderation level"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn update_config(
    AdminUser { actor }: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateConfigRequest>,
) -> Result<Json<ModerationConfigResponse>, AppError> {
    let mut config = state.repo.get_moderation_config().await?;
    config.set(payload.moderation_level)?;
    state.repo.save_moderation_config(&config).await?;

    tracing::info!(
        admin = %actor.id,
        level = config.level_value(),
        "moderation level updated"
    );
    Ok(Json(config.to_response()))
}

/// create_post
///
/// [Admin Route] Creates a post owned by the current actor.
#[utoipa::path(
    post,
    path = "/admin/post",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn create_post(
    AdminUser { actor }: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state.repo.create_post(actor.id, payload).await?;
    tracing::info!(post_id = post.id, author = %actor.id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// show_post
///
/// [Admin Route] A post with all of its comments, hidden ones included.
#[utoipa::path(
    get,
    path = "/admin/post/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostDetails),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Not found")
    )
)]
pub async fn show_post(
    AdminUser { actor }: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostDetails>, AppError> {
    let post = load_post(&state, id).await?;
    policy::authorize(&actor, &post, PostAction::Show)?;
    Ok(Json(post_details(&state, post).await?))
}

/// edit_post
///
/// [Admin Route] Partial update. Only the author may edit; the administrator role
/// alone does not grant it.
#[utoipa::path(
    put,
    path = "/admin/post/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not an administrator, or not the author"),
        (status = 404, description = "Not found")
    )
)]
pub async fn edit_post(
    AdminUser { actor }: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let post = load_post(&state, id).await?;
    policy::authorize(&actor, &post, PostAction::Edit)?;

    let updated = state
        .repo
        .update_post(post.id, payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", id)))?;

    tracing::info!(post_id = updated.id, "post updated");
    Ok(Json(updated))
}

/// delete_post
///
/// [Admin Route] Clears the post's tags, then deletes it.
#[utoipa::path(
    delete,
    path = "/admin/post/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_post(
    AdminUser { actor }: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let mut post = load_post(&state, id).await?;
    policy::authorize(&actor, &post, PostAction::Delete)?;

    post.clear_tags();
    if !state.repo.delete_post(&post).await? {
        return Err(AppError::NotFound(format!("post {}", id)));
    }

    tracing::info!(post_id = id, actor = %actor.id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// moderate_comment
///
/// [Admin Route] Allows or disallows a comment. `action` is taken literally:
/// `allow` allows, anything else disallows.
#[utoipa::path(
    put,
    path = "/admin/post/{id}/{comment_id}/{action}",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("comment_id" = i64, Path, description = "Comment ID"),
        ("action" = String, Path, description = "`allow` or `disallow`")
    ),
    responses(
        (status = 200, description = "Reviewed", body = ReviewResponse),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Post or comment not found")
    )
)]
pub async fn moderate_comment(
    AdminUser { actor }: AdminUser,
    State(state): State<AppState>,
    Path((post_id, comment_id, action)): Path<(i64, i64, String)>,
) -> Result<Json<ReviewResponse>, AppError> {
    let post = load_post(&state, post_id).await?;

    let mut comment = state
        .repo
        .get_comment(comment_id)
        .await?
        .filter(|c| c.post_id == post.id)
        .ok_or_else(|| AppError::NotFound(format!("comment {} on post {}", comment_id, post_id)))?;

    let next = moderation::review(
        &comment,
        ReviewAction::from_literal(&action),
        &actor,
        Utc::now(),
    );
    comment.apply(next);
    state.repo.save_comment_state(&comment).await?;

    Ok(Json(ReviewResponse {
        comment_id: comment.id,
        visibility: comment.visibility(),
        post: post_details(&state, post).await?,
    }))
}
