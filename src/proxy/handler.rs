//! The signed image proxy request pipeline.
//!
//! decode → validate → authenticate → fetch → transform → respond, failing
//! closed at every step.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::ServiceConfig;
use crate::observability::metrics;
use crate::proxy::allowlist::HostAllowList;
use crate::proxy::decode::decode_target;
use crate::proxy::error::ProxyError;
use crate::proxy::fetch::{FetchedImage, ImageFetcher};
use crate::proxy::size::SizeClass;
use crate::proxy::transform::{backend_for, ImageBackend, TransformError};
use crate::signing::{Secret, PARAM_ENCODED_URL, PARAM_SIGNATURE, PARAM_SIZE_CLASS};

/// `Cache-Control` on successful responses.
pub const CACHE_CONTROL_OK: &str = "public, max-age=86400";

/// Content type assumed when upstream does not declare one.
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Query parameters of a proxy request, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyParams {
    pub encoded_url: Option<String>,
    pub signature: Option<String>,
    pub size_class: Option<String>,
}

impl ProxyParams {
    /// Parse a raw query string. The first occurrence of a key wins.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                PARAM_ENCODED_URL => &mut params.encoded_url,
                PARAM_SIGNATURE => &mut params.signature,
                PARAM_SIZE_CLASS => &mut params.size_class,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// Image bytes ready to be written to the client.
#[derive(Debug, Clone)]
pub struct ProxiedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl IntoResponse for ProxiedImage {
    fn into_response(self) -> Response {
        let content_type = HeaderValue::from_str(&self.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type),
                (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_OK)),
                (
                    header::HeaderName::from_static("cross-origin-resource-policy"),
                    HeaderValue::from_static("cross-origin"),
                ),
                (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// Stateless proxy: everything it holds is read-only after construction.
pub struct ImageProxy {
    allow_list: HostAllowList,
    secret: Option<Secret>,
    fetcher: ImageFetcher,
    backend: Box<dyn ImageBackend>,
}

impl ImageProxy {
    pub fn new(
        allow_list: HostAllowList,
        secret: Option<Secret>,
        fetcher: ImageFetcher,
        backend: Box<dyn ImageBackend>,
    ) -> Self {
        Self {
            allow_list,
            secret,
            fetcher,
            backend,
        }
    }

    pub fn from_config(config: &ServiceConfig, secret: Option<Secret>) -> Result<Self, reqwest::Error> {
        let allow_list = HostAllowList::new(&config.proxy.allowed_hosts);
        let fetcher = ImageFetcher::new(&config.fetch, &allow_list)?;
        let backend = backend_for(config.proxy.transform, config.proxy.quality);
        tracing::info!(
            backend = backend.name(),
            allowed_hosts = ?config.proxy.allowed_hosts,
            secret_loaded = secret.is_some(),
            "Image proxy configured"
        );
        Ok(Self::new(allow_list, secret, fetcher, backend))
    }

    /// Handle a raw query string and produce the HTTP response.
    pub async fn respond(&self, query: Option<&str>) -> Response {
        let result = self.serve(ProxyParams::from_query(query)).await;
        let status = match &result {
            Ok(_) => StatusCode::OK,
            Err(err) => err.status(),
        };
        metrics::record_proxy_response(status.as_u16());

        match result {
            Ok(image) => image.into_response(),
            Err(err) => {
                match &err {
                    ProxyError::SecretUnavailable | ProxyError::UpstreamFetchFailed(_) => {
                        tracing::warn!(status = status.as_u16(), error = %err, "Proxy request failed")
                    }
                    _ => tracing::debug!(status = status.as_u16(), error = %err, "Proxy request rejected"),
                }
                err.into_response()
            }
        }
    }

    /// Run the pipeline for already-parsed parameters.
    pub async fn serve(&self, params: ProxyParams) -> Result<ProxiedImage, ProxyError> {
        let encoded_url = params
            .encoded_url
            .filter(|v| !v.is_empty())
            .ok_or(ProxyError::MissingParameter(PARAM_ENCODED_URL))?;
        let signature = params
            .signature
            .filter(|v| !v.is_empty())
            .ok_or(ProxyError::MissingParameter(PARAM_SIGNATURE))?;
        let size = SizeClass::normalize(params.size_class.as_deref().unwrap_or_default());

        // Reject malformed or foreign targets before doing any crypto work.
        let target = decode_target(&encoded_url, &self.allow_list)?;

        let secret = self.secret.as_ref().ok_or(ProxyError::SecretUnavailable)?;
        if !secret.verify(&target, &signature) {
            return Err(ProxyError::SignatureMismatch);
        }

        let fetched = self
            .fetcher
            .fetch(&target)
            .await
            .map_err(|e| ProxyError::UpstreamFetchFailed(e.to_string()))?;

        Ok(self.transform(fetched, size))
    }

    fn transform(&self, fetched: FetchedImage, size: SizeClass) -> ProxiedImage {
        match self.backend.transform(&fetched.bytes, size.max_dimension()) {
            Ok(out) => {
                metrics::record_transform("resized");
                tracing::debug!(
                    size = %size,
                    width = out.width,
                    height = out.height,
                    content_type = out.content_type,
                    "Image transformed"
                );
                ProxiedImage {
                    bytes: out.bytes,
                    content_type: out.content_type.to_string(),
                }
            }
            Err(err) => {
                metrics::record_transform("passthrough");
                if !matches!(err, TransformError::Unsupported) {
                    tracing::debug!(error = %err, "Transform failed, serving original bytes");
                }
                ProxiedImage {
                    content_type: passthrough_content_type(fetched.content_type.as_deref()),
                    bytes: fetched.bytes,
                }
            }
        }
    }
}

/// Content type for untransformed bytes. Anything that does not claim to be
/// an image is served as opaque binary.
fn passthrough_content_type(declared: Option<&str>) -> String {
    match declared {
        None => DEFAULT_CONTENT_TYPE.to_string(),
        Some(ct) if ct.starts_with("image/") => ct.to_string(),
        Some(_) => "application/octet-stream".to_string(),
    }
}
