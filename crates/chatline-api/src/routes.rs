use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::dispatch;
use crate::state::AppState;

/// Default request body cap; import payloads are the largest bodies we take.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// The whole API on one path. CORS answers preflight `OPTIONS` itself and
/// stamps `Access-Control-Allow-Origin: *` on every response.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(false);

    Router::new()
        .route(
            "/",
            get(dispatch::realtime_key)
                .post(dispatch::handle_post)
                .fallback(dispatch::method_not_allowed),
        )
        .fallback(dispatch::not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(state)
}
