//! The process-wide signing key and HMAC primitives.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SigningConfig;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded SHA-256 MAC.
const SIGNATURE_HEX_LEN: usize = 64;

/// Symmetric key shared by the URL signer and the proxy.
///
/// Loaded once at startup. `Debug` never prints the key material.
#[derive(Clone)]
pub struct Secret {
    key: Vec<u8>,
}

impl Secret {
    /// Wrap raw key bytes. Returns `None` for an empty key.
    pub fn new(key: impl Into<Vec<u8>>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() {
            None
        } else {
            Some(Self { key })
        }
    }

    /// Resolve the secret from configuration: the inline value first, then
    /// the environment variable named by `secret_env`.
    pub fn from_config(config: &SigningConfig) -> Option<Self> {
        if !config.secret.is_empty() {
            return Self::new(config.secret.as_bytes());
        }
        if config.secret_env.is_empty() {
            return None;
        }
        std::env::var(&config.secret_env)
            .ok()
            .and_then(|value| Self::new(value.into_bytes()))
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    /// Lowercase hex HMAC-SHA256 of `message`.
    pub fn sign(&self, message: &str) -> String {
        let mut mac = self.mac();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of a hex signature over `message`.
    ///
    /// Only the exact form [`Secret::sign`] produces is accepted: 64
    /// lowercase hex digits. Anything else is rejected without comparing.
    pub fn verify(&self, message: &str, signature_hex: &str) -> bool {
        if !is_lowercase_hex_digest(signature_hex) {
            return false;
        }
        let Ok(expected) = hex::decode(signature_hex) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(message.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

fn is_lowercase_hex_digest(value: &str) -> bool {
    value.len() == SIGNATURE_HEX_LEN
        && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret").field("key", &"<redacted>").finish()
    }
}
