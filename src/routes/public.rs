use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Reading visible comments needs no credentials. Submitting one does: the
/// `AuthUser` extractor on `add_comment` rejects anonymous requests with 401.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(|| async { "ok" }))
        // GET  /posts/{id}/comments: allowed comments only.
        // POST /posts/{id}/comments: initial visibility decided by the moderation level.
        .route(
            "/posts/{id}/comments",
            get(handlers::get_visible_comments).post(handlers::add_comment),
        )
}
