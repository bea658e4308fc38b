//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files, and
//! every section falls back to its `Default` so a minimal file is valid.

use serde::{Deserialize, Serialize};

/// Host suffixes the proxy will fetch from when nothing else is configured.
pub const DEFAULT_ALLOWED_HOSTS: [&str; 3] = ["cdninstagram.com", "fbcdn.net", "instagram.com"];

/// Root configuration for the feed service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Shared secret and proxy URL layout.
    pub signing: SigningConfig,

    /// Image proxy policy.
    pub proxy: ImageProxyConfig,

    /// Outbound image fetch settings.
    pub fetch: FetchConfig,

    /// Graph API media source settings.
    pub media: MediaConfig,

    /// Diagnostic endpoint settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for any request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Shared secret and the shape of minted proxy URLs.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Inline secret. Takes precedence over `secret_env`.
    pub secret: String,

    /// Environment variable consulted when `secret` is empty.
    pub secret_env: String,

    /// Path (or absolute URL) the proxy is mounted at.
    pub proxy_base_url: String,

    /// Optional CDN origin placed in front of `proxy_base_url`.
    pub cdn_origin: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            secret_env: "IG_PROXY_SECRET".to_string(),
            proxy_base_url: "/proxy".to_string(),
            cdn_origin: String::new(),
        }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("secret", &if self.secret.is_empty() { "" } else { "<redacted>" })
            .field("secret_env", &self.secret_env)
            .field("proxy_base_url", &self.proxy_base_url)
            .field("cdn_origin", &self.cdn_origin)
            .finish()
    }
}

/// Image proxy policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageProxyConfig {
    /// Host suffixes a decoded URL must belong to.
    pub allowed_hosts: Vec<String>,

    /// Resize and re-encode fetched images. When false bytes pass through.
    pub transform: bool,

    /// Encoder quality (1-100).
    pub quality: u8,
}

impl Default for ImageProxyConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect(),
            transform: true,
            quality: 82,
        }
    }
}

/// Outbound image fetch settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Hard deadline for all fetch attempts of one request, in seconds.
    pub timeout_secs: u64,

    /// Upstream bodies larger than this are treated as a failed fetch.
    pub max_body_bytes: usize,

    /// User-Agent sent by the primary client.
    pub user_agent: String,

    /// Try a plain second client once when the primary attempt fails.
    pub fallback: bool,

    /// Honour HTTP(S)_PROXY environment variables.
    pub system_proxy: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_body_bytes: 16 * 1024 * 1024,
            user_agent: "Mozilla/5.0 (compatible; IG-Feed-Proxy/1)".to_string(),
            fallback: true,
            system_proxy: true,
        }
    }
}

/// Graph API media source settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Graph API root including version.
    pub graph_base_url: String,

    /// Inline long-lived access token.
    pub access_token: String,

    /// Environment variable consulted when `access_token` is empty.
    pub access_token_env: String,

    /// Business account id. Resolved through `/me/accounts` when empty.
    pub account_id: String,

    /// Lifetime of cached media lists, in seconds.
    pub cache_ttl_secs: i64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            graph_base_url: "https://graph.facebook.com/v24.0".to_string(),
            access_token: String::new(),
            access_token_env: "IG_ACCESS_TOKEN".to_string(),
            account_id: String::new(),
            cache_ttl_secs: 1800,
        }
    }
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("graph_base_url", &self.graph_base_url)
            .field("access_token", &if self.access_token.is_empty() { "" } else { "<redacted>" })
            .field("access_token_env", &self.access_token_env)
            .field("account_id", &self.account_id)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}

/// Diagnostic endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount `/admin/verify`.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// `pretty` or `json`.
    pub log_format: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
