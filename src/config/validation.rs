//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values that parse but cannot work
//! (unparseable addresses, zero timeouts, an empty allow-list). Every problem
//! is collected so the operator sees them all at once.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `fetch.timeout_secs`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    } else if config.timeouts.request_secs <= config.fetch.timeout_secs {
        // Otherwise the server-wide timeout answers a slow upstream before
        // the proxy can map it to 502.
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must be greater than fetch.timeout_secs ({})",
                config.fetch.timeout_secs
            ),
        ));
    }

    if config.signing.proxy_base_url.trim().is_empty() {
        errors.push(ValidationError::new("signing.proxy_base_url", "must not be empty"));
    }

    if !config.signing.cdn_origin.is_empty() && !is_http_url(&config.signing.cdn_origin) {
        errors.push(ValidationError::new("signing.cdn_origin", "must be an http(s) URL"));
    }

    if config.proxy.allowed_hosts.is_empty() {
        errors.push(ValidationError::new("proxy.allowed_hosts", "must list at least one host"));
    }
    for host in &config.proxy.allowed_hosts {
        if !is_bare_host(host) {
            errors.push(ValidationError::new(
                "proxy.allowed_hosts",
                format!("'{}' is not a bare lowercase host name (optionally host:port)", host),
            ));
        }
    }

    if !(1..=100).contains(&config.proxy.quality) {
        errors.push(ValidationError::new("proxy.quality", "must be between 1 and 100"));
    }

    if config.fetch.timeout_secs == 0 {
        errors.push(ValidationError::new("fetch.timeout_secs", "must be greater than 0"));
    }

    if config.fetch.max_body_bytes == 0 {
        errors.push(ValidationError::new("fetch.max_body_bytes", "must be greater than 0"));
    }

    if !is_http_url(&config.media.graph_base_url) {
        errors.push(ValidationError::new("media.graph_base_url", "must be an http(s) URL"));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new(
            "admin.api_key",
            "must be set when the admin endpoint is enabled",
        ));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "must be 'pretty' or 'json'",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// `host` or `host:port`, lowercase, no scheme or path.
fn is_bare_host(entry: &str) -> bool {
    let host = match entry.rsplit_once(':') {
        Some((host, port)) => {
            if port.parse::<u16>().is_err() {
                return false;
            }
            host
        }
        None => entry,
    };
    !host.is_empty()
        && !host.starts_with('.')
        && !host.ends_with('.')
        && host
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}
