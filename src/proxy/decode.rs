//! Decoding of the `encoded_url` parameter.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::proxy::allowlist::HostAllowList;
use crate::proxy::error::ProxyError;

/// Decode `encoded_url` and check the result against the allow-list.
///
/// Accepts URL-safe or standard alphabet, with or without padding. A `+`
/// that arrived as a space (form decoding) is restored first.
pub fn decode_target(encoded: &str, allow_list: &HostAllowList) -> Result<String, ProxyError> {
    let mut normalized: String = encoded
        .chars()
        .map(|c| match c {
            ' ' => '+',
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let padding = (4 - normalized.len() % 4) % 4;
    normalized.extend(std::iter::repeat('=').take(padding));

    let bytes = STANDARD
        .decode(normalized.as_bytes())
        .map_err(|_| ProxyError::MalformedEncoding)?;
    let target = String::from_utf8(bytes).map_err(|_| ProxyError::MalformedEncoding)?;
    if target.is_empty() {
        return Err(ProxyError::MalformedEncoding);
    }

    if !allow_list.permits_str(&target) {
        return Err(ProxyError::DisallowedHost);
    }
    Ok(target)
}
