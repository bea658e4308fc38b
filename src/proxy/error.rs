//! Proxy failure taxonomy.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Terminal failures of a proxy request.
///
/// Each variant maps to one status code. Responses carry no body and
/// `Cache-Control: no-store`; the detail only reaches the logs.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("missing query parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("encoded_url is not valid base64 of a UTF-8 URL")]
    MalformedEncoding,

    #[error("target host is not allow-listed")]
    DisallowedHost,

    #[error("signing secret is not configured")]
    SecretUnavailable,

    #[error("signature does not match")]
    SignatureMismatch,

    #[error("upstream fetch failed: {0}")]
    UpstreamFetchFailed(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::MalformedEncoding | Self::DisallowedHost => {
                StatusCode::BAD_REQUEST
            }
            Self::SecretUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SignatureMismatch => StatusCode::FORBIDDEN,
            Self::UpstreamFetchFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), [(header::CACHE_CONTROL, "no-store")]).into_response()
    }
}
