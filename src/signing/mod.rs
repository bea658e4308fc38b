//! URL signing.
//!
//! The HMAC is a capability token: a proxy URL is only honoured if it was
//! minted by a holder of the shared [`Secret`]. The same secret verifies
//! signatures inside the proxy handler.

pub mod secret;
pub mod signer;

pub use secret::Secret;
pub use signer::{UrlSigner, PARAM_ENCODED_URL, PARAM_SIGNATURE, PARAM_SIZE_CLASS};
