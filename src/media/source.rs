//! Cached, failure-tolerant access to a user's media list.
//!
//! Nothing here returns an error to the caller. Failures leave an empty list
//! and a short machine-readable reason in the cache, readable through
//! [`MediaSource::last_error`] for diagnostics.

use std::sync::Arc;
use std::time::Duration;

use crate::config::MediaConfig;
use crate::media::cache::{CacheStore, MemoryCache};
use crate::media::graph::{GraphClient, GraphError};
use crate::media::types::{GraphMedia, MediaItem, MediaType};
use crate::observability::metrics;
use crate::proxy::SizeClass;

/// Largest number of items a caller may ask for.
pub const MAX_LIMIT: usize = 20;

const ACCOUNT_ID_KEY: &str = "ig_user_id";
const LAST_ERROR_KEY: &str = "last_error";

const ACCOUNT_ID_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const ERROR_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_MEDIA_TTL_SECS: i64 = 30 * 60;

const DEFAULT_CAPTION: &str = "Instagram photo";

/// Clamp a requested item count into `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

fn media_key(limit: usize, size: SizeClass) -> String {
    format!("media_{}_{}", limit, size.as_wire())
}

pub struct MediaSource {
    graph: GraphClient,
    cache: Arc<dyn CacheStore>,
    config: MediaConfig,
}

impl MediaSource {
    pub fn new(graph: GraphClient, cache: Arc<dyn CacheStore>, config: MediaConfig) -> Self {
        Self { graph, cache, config }
    }

    /// Source with an in-memory cache.
    pub fn from_config(config: &MediaConfig, system_proxy: bool) -> Result<Self, reqwest::Error> {
        let graph = GraphClient::new(&config.graph_base_url, system_proxy)?;
        Ok(Self::new(graph, Arc::new(MemoryCache::new()), config.clone()))
    }

    /// Access token: inline config value, else the configured env var.
    pub fn token(&self) -> Option<String> {
        if !self.config.access_token.is_empty() {
            return Some(self.config.access_token.clone());
        }
        if self.config.access_token_env.is_empty() {
            return None;
        }
        std::env::var(&self.config.access_token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    /// Business account id: configured value, cached value, or a fresh
    /// `/me/accounts` lookup (cached for a day).
    pub async fn account_id(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }
        if !self.config.account_id.is_empty() {
            return Some(self.config.account_id.clone());
        }
        if let Some(cached) = self.cache.get(ACCOUNT_ID_KEY).filter(|id| !id.is_empty()) {
            return Some(cached);
        }

        match self.graph.resolve_account_id(token).await {
            Ok(Some(id)) => {
                tracing::info!(account_id = %id, "Resolved Instagram business account");
                self.cache.set(ACCOUNT_ID_KEY, id.clone(), ACCOUNT_ID_TTL);
                Some(id)
            }
            Ok(None) => {
                tracing::warn!("No page exposes an Instagram business account");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Account id lookup failed");
                None
            }
        }
    }

    /// Drop the cached account id so the next lookup hits the API.
    pub fn forget_account_id(&self) {
        self.cache.delete(ACCOUNT_ID_KEY);
    }

    /// Reason recorded by the most recent failed load, if still fresh.
    pub fn last_error(&self) -> Option<String> {
        self.cache.get(LAST_ERROR_KEY)
    }

    /// Normalized media, newest first as returned by the API.
    ///
    /// `limit` is clamped to `1..=20`; unknown sizes become `m`. Results are
    /// cached per `(limit, size)`.
    pub async fn fetch_media(&self, limit: usize, size: &str) -> Vec<MediaItem> {
        let limit = clamp_limit(limit);
        let size = SizeClass::normalize(size);
        let key = media_key(limit, size);

        if let Some(items) = self
            .cache
            .get(&key)
            .and_then(|raw| serde_json::from_str::<Vec<MediaItem>>(&raw).ok())
        {
            metrics::record_media_fetch("cached");
            return items;
        }

        match self.load(limit).await {
            Ok(items) => {
                metrics::record_media_fetch("ok");
                match serde_json::to_string(&items) {
                    Ok(raw) => self.cache.set(&key, raw, self.media_ttl()),
                    Err(e) => tracing::warn!(error = %e, "Could not serialize media for cache"),
                }
                self.cache.delete(LAST_ERROR_KEY);
                items
            }
            Err(reason) => {
                metrics::record_media_fetch("error");
                tracing::warn!(reason = %reason, "Media fetch failed");
                self.cache.set(LAST_ERROR_KEY, reason, ERROR_TTL);
                Vec::new()
            }
        }
    }

    /// Remove every key this source may have written.
    pub fn purge(&self) {
        for limit in 1..=MAX_LIMIT {
            for size in SizeClass::ALL {
                self.cache.delete(&media_key(limit, size));
            }
        }
        self.cache.delete(ACCOUNT_ID_KEY);
        self.cache.delete(LAST_ERROR_KEY);
    }

    async fn load(&self, limit: usize) -> Result<Vec<MediaItem>, String> {
        let token = self.token().ok_or_else(|| "no_token".to_string())?;
        let account_id = self
            .account_id(&token)
            .await
            .ok_or_else(|| "no_ig_user_id".to_string())?;

        // Over-fetch: videos without thumbnails and incomplete entries are skipped.
        let raw = self
            .graph
            .list_media(&account_id, &token, limit * 2)
            .await
            .map_err(|e| match e {
                GraphError::Status { status, message } => {
                    message.unwrap_or_else(|| format!("media_api_{}", status.as_u16()))
                }
                // A 2xx whose body is not a media list.
                GraphError::Decode(_) => "no_media_data".to_string(),
                GraphError::Request(_) | GraphError::Url(_) => "media_request_error".to_string(),
            })?;

        if raw.is_empty() {
            return Err("no_media_data".to_string());
        }
        Ok(normalize(raw, limit))
    }

    fn media_ttl(&self) -> Duration {
        let secs = if self.config.cache_ttl_secs > 0 {
            self.config.cache_ttl_secs
        } else {
            DEFAULT_MEDIA_TTL_SECS
        };
        Duration::from_secs(secs as u64)
    }
}

/// Turn raw Graph entries into grid items, keeping at most `limit`.
pub fn normalize(raw: Vec<GraphMedia>, limit: usize) -> Vec<MediaItem> {
    raw.into_iter()
        .filter_map(normalize_one)
        .take(limit)
        .collect()
}

fn normalize_one(media: GraphMedia) -> Option<MediaItem> {
    let media_type = media.media_type.unwrap_or_default();
    let image_url = match media_type {
        MediaType::Video => media.thumbnail_url,
        _ => media.media_url,
    }
    .filter(|u| !u.is_empty())?;
    let permalink = media.permalink.filter(|p| !p.is_empty())?;

    Some(MediaItem {
        image_url,
        permalink,
        caption: media
            .caption
            .map(|c| strip_tags(&c))
            .unwrap_or_else(|| DEFAULT_CAPTION.to_string()),
        timestamp: media.timestamp.unwrap_or_default(),
        media_type,
    })
}

/// Remove HTML tags and trim.
///
/// A `<` only opens a tag when followed by a letter, `/`, `!` or `?`, so
/// text such as `Sale < $20` survives.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_tag {
            if c == '>' {
                in_tag = false;
            }
        } else if c == '<' && chars.peek().is_some_and(|&n| opens_tag(n)) {
            in_tag = true;
        } else {
            out.push(c);
        }
    }
    out.trim().to_string()
}

fn opens_tag(next: char) -> bool {
    next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?')
}
