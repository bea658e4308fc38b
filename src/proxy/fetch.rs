//! Outbound image fetch.
//!
//! One primary attempt and, when enabled, one fallback attempt with a plain
//! client. Both run under a single hard deadline; dropping the future (for
//! example when the client disconnects) aborts the in-flight request.

use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{redirect, Client, StatusCode};
use thiserror::Error;
use tokio::time::timeout;

use crate::config::FetchConfig;
use crate::observability::metrics;
use crate::proxy::allowlist::HostAllowList;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 5;

/// User-Agent of the fallback client.
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0";

/// Raw bytes from upstream plus the declared media type (parameters
/// stripped, lowercased).
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Why an upstream fetch produced nothing usable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned {0}")]
    Status(StatusCode),

    #[error("upstream returned an empty body")]
    Empty,

    #[error("upstream body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// HTTP client pair used to pull images from allow-listed CDNs.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    primary: Client,
    fallback: Option<Client>,
    deadline: Duration,
    max_body_bytes: usize,
}

impl ImageFetcher {
    /// Build the clients. Redirects are only followed while the next hop is
    /// still on the allow-list.
    pub fn new(config: &FetchConfig, allow_list: &HostAllowList) -> Result<Self, reqwest::Error> {
        let deadline = Duration::from_secs(config.timeout_secs);
        let primary = build_client(config, allow_list, &config.user_agent, deadline)?;
        let fallback = if config.fallback {
            Some(build_client(config, allow_list, FALLBACK_USER_AGENT, deadline)?)
        } else {
            None
        };

        Ok(Self {
            primary,
            fallback,
            deadline,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Fetch `url`, trying the fallback client once if the primary fails.
    pub async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let start = Instant::now();
        let result = match timeout(self.deadline, self.fetch_with_fallback(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.deadline)),
        };
        metrics::record_fetch(if result.is_ok() { "ok" } else { "error" }, start);
        result
    }

    async fn fetch_with_fallback(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let err = match self.attempt(&self.primary, url, true).await {
            Ok(image) => return Ok(image),
            Err(err) => err,
        };

        let Some(fallback) = &self.fallback else {
            return Err(err);
        };
        tracing::debug!(error = %err, "Primary image fetch failed, trying fallback client");
        self.attempt(fallback, url, false).await
    }

    async fn attempt(
        &self,
        client: &Client,
        url: &str,
        accept_images: bool,
    ) -> Result<FetchedImage, FetchError> {
        let mut request = client.get(url);
        if accept_images {
            request = request.header(ACCEPT, "image/*");
        }

        let mut response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(FetchError::TooLarge(self.max_body_bytes));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > self.max_body_bytes {
                return Err(FetchError::TooLarge(self.max_body_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(FetchError::Empty);
        }

        Ok(FetchedImage { bytes, content_type })
    }
}

fn build_client(
    config: &FetchConfig,
    allow_list: &HostAllowList,
    user_agent: &str,
    deadline: Duration,
) -> Result<Client, reqwest::Error> {
    let allow_list = allow_list.clone();
    let policy = redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS || !allow_list.permits(attempt.url()) {
            attempt.stop()
        } else {
            attempt.follow()
        }
    });

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(deadline)
        .redirect(policy);
    if !config.system_proxy {
        builder = builder.no_proxy();
    }
    builder.build()
}
