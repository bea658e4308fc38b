//! Minting signed proxy URLs.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::config::SigningConfig;
use crate::proxy::SizeClass;
use crate::signing::Secret;

/// Query parameter carrying the base64 of the remote URL.
pub const PARAM_ENCODED_URL: &str = "encoded_url";
/// Query parameter carrying the hex HMAC.
pub const PARAM_SIGNATURE: &str = "signature";
/// Query parameter carrying the size tier.
pub const PARAM_SIZE_CLASS: &str = "size_class";

/// Builds proxy URLs for remote images.
///
/// Holding no secret is a valid state: every call to [`UrlSigner::sign`]
/// then returns an empty string and callers fall back to the raw URL.
#[derive(Debug, Clone)]
pub struct UrlSigner {
    secret: Option<Secret>,
    base_url: String,
}

impl UrlSigner {
    pub fn new(secret: Option<Secret>, base_url: impl Into<String>) -> Self {
        Self {
            secret,
            base_url: base_url.into(),
        }
    }

    /// Build a signer from the signing section of the config. `cdn_origin`,
    /// when set, is prefixed to the proxy path.
    pub fn from_config(config: &SigningConfig, secret: Option<Secret>) -> Self {
        Self::new(secret, proxy_base_url(config))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a secret is loaded and URLs can be minted.
    pub fn is_available(&self) -> bool {
        self.secret.is_some()
    }

    /// Signed proxy URL for `raw_url`, or an empty string when no secret is
    /// loaded or `raw_url` is empty. Unknown size values map to `m`.
    pub fn sign(&self, raw_url: &str, size_class: &str) -> String {
        let Some(secret) = &self.secret else {
            return String::new();
        };
        if raw_url.is_empty() {
            return String::new();
        }
        let size = SizeClass::normalize(size_class);

        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(PARAM_ENCODED_URL, &URL_SAFE_NO_PAD.encode(raw_url))
            .append_pair(PARAM_SIGNATURE, &secret.sign(raw_url))
            .append_pair(PARAM_SIZE_CLASS, size.as_wire())
            .finish();

        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.base_url, separator, query)
    }
}

fn proxy_base_url(config: &SigningConfig) -> String {
    let cdn = config.cdn_origin.trim();
    if cdn.is_empty() {
        return config.proxy_base_url.clone();
    }
    let path = if config.proxy_base_url.starts_with('/') {
        config.proxy_base_url.clone()
    } else {
        format!("/{}", config.proxy_base_url)
    };
    format!("{}{}", cdn.trim_end_matches('/'), path)
}
