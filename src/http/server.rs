//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build shared state (proxy, signer, media source) from config
//! - Create the Axum router with all handlers
//! - Wire up middleware (request id, tracing, timeout)
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::{AdminConfig, ServiceConfig};
use crate::http::request::{request_id_of, MakeRequestUuid, X_REQUEST_ID};
use crate::media::MediaSource;
use crate::proxy::ImageProxy;
use crate::render::{render_empty, render_grid};
use crate::signing::{Secret, UrlSigner};

const DEFAULT_FEED_LIMIT: usize = 12;
const DEFAULT_FEED_COLS: u32 = 4;
const DEFAULT_FEED_SIZE: &str = "m";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ImageProxy>,
    pub signer: Arc<UrlSigner>,
    pub media: Arc<MediaSource>,
    pub admin: AdminConfig,
}

impl AppState {
    /// Build every subsystem from `config`. The secret is shared by the
    /// proxy (verification) and the signer (minting).
    pub fn from_config(config: &ServiceConfig, secret: Option<Secret>) -> Result<Self, reqwest::Error> {
        let proxy = ImageProxy::from_config(config, secret.clone())?;
        let signer = UrlSigner::from_config(&config.signing, secret);
        let media = MediaSource::from_config(&config.media, config.fetch.system_proxy)?;

        Ok(Self {
            proxy: Arc::new(proxy),
            signer: Arc::new(signer),
            media: Arc::new(media),
            admin: config.admin.clone(),
        })
    }
}

/// HTTP server for the feed and image proxy.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig, secret: Option<Secret>) -> Result<Self, reqwest::Error> {
        let state = AppState::from_config(&config, secret)?;
        Ok(Self::with_state(config, state))
    }

    /// Create a server around pre-built state.
    pub fn with_state(config: ServiceConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/proxy", get(proxy_handler))
            .route("/feed", get(feed_handler))
            .route("/health", get(health_handler));

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id_of(request),
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    no_store_unless_success,
                ))
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            admin_enabled = self.config.admin.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Failures must never be cached, including ones produced by middleware
/// (timeouts, auth) rather than by a handler.
fn no_store_unless_success(response: &Response) -> Option<HeaderValue> {
    (!response.status().is_success()).then(|| HeaderValue::from_static("no-store"))
}

async fn proxy_handler(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    state.proxy.respond(query.as_deref()).await
}

/// Query of `GET /feed`. Unparseable values fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FeedQuery {
    limit: usize,
    cols: u32,
    size: String,
}

impl FeedQuery {
    fn parse(query: Option<&str>) -> Self {
        let mut parsed = Self {
            limit: DEFAULT_FEED_LIMIT,
            cols: DEFAULT_FEED_COLS,
            size: DEFAULT_FEED_SIZE.to_string(),
        };
        let Some(query) = query else {
            return parsed;
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "limit" => {
                    if let Ok(n) = value.trim().parse::<i64>() {
                        parsed.limit = n.max(0) as usize;
                    }
                }
                "cols" => {
                    if let Ok(n) = value.trim().parse::<i64>() {
                        parsed.cols = n.clamp(0, u32::MAX as i64) as u32;
                    }
                }
                "size" => parsed.size = value.into_owned(),
                _ => {}
            }
        }
        parsed
    }
}

async fn feed_handler(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let query = FeedQuery::parse(query.as_deref());
    let items = state.media.fetch_media(query.limit, &query.size).await;

    let html = if items.is_empty() {
        let reason = state
            .media
            .last_error()
            .unwrap_or_else(|| "no items".to_string());
        render_empty(&reason)
    } else {
        render_grid(&items, &state.signer, query.cols, &query.size)
    };

    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response()
}

async fn health_handler() -> &'static str {
    "ok"
}
