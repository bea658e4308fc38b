//! Authenticated diagnostics.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::get_verify;
use crate::http::server::AppState;

pub use handlers::{run_verification, VerifyReport};

/// Admin routes, merged into the main router only when `admin.enabled`.
pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/verify", get(get_verify))
        .layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
