use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Nested under `/admin` and wrapped in the authentication layer. Every handler
/// takes `AdminUser`, so the whole backend requires the administrator role. Post
/// routes then also consult the access policy, which keeps edit ownership-only.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET  /admin/post: the current actor's posts plus the moderation setting.
        // POST /admin/post: new post authored by the current actor.
        .route(
            "/post",
            get(handlers::admin_index).post(handlers::create_post),
        )
        // GET/PUT /admin/config: read or change the moderation level.
        .route(
            "/config",
            get(handlers::get_config).put(handlers::update_config),
        )
        // GET/PUT/DELETE /admin/post/{id}: show, edit, delete under the access policy.
        .route(
            "/post/{id}",
            get(handlers::show_post)
                .put(handlers::edit_post)
                .delete(handlers::delete_post),
        )
        // PUT /admin/post/{id}/{comment_id}/{action}: explicit comment review.
        .route(
            "/post/{id}/{comment_id}/{action}",
            put(handlers::moderate_comment),
        )
}
