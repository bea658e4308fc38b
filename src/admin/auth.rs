use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::server::AppState;

/// Reject requests without `Authorization: Bearer {admin.api_key}`.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(key) if !state.admin.api_key.is_empty() && key == state.admin.api_key => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!(uri = %request.uri(), "Rejected admin request");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
