//! Signed image proxy.
//!
//! # Data Flow
//! ```text
//! GET /proxy?encoded_url=…&signature=…&size_class=…
//!     → handler.rs (presence check, size normalization)
//!     → decode.rs + allowlist.rs (base64 → URL → host allow-list)   400
//!     → signing::Secret (constant-time HMAC check)                  500 / 403
//!     → fetch.rs (primary + fallback client, hard deadline)         502
//!     → transform.rs (resize + re-encode, or passthrough)
//!     → 200 with long-lived cache headers
//! ```
//!
//! # Design Decisions
//! - No state survives a request; the secret and allow-list are immutable
//! - Every failure response is `no-store` with an empty body
//! - A failed transform is never fatal

pub mod allowlist;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod size;
pub mod transform;

pub use allowlist::HostAllowList;
pub use error::ProxyError;
pub use fetch::{FetchError, FetchedImage, ImageFetcher};
pub use handler::{ImageProxy, ProxiedImage, ProxyParams};
pub use size::SizeClass;
pub use transform::{ImageBackend, PassthroughBackend, ResizingBackend, TransformError};
