//! Graph API media source.
//!
//! # Data Flow
//! ```text
//! fetch_media(limit, size)
//!     → cache.rs (hit? return)
//!     → source.rs (token → account id → media list)
//!     → graph.rs (HTTP to graph.facebook.com)
//!     → source.rs (normalize, cache, clear last error)
//! ```

pub mod cache;
pub mod graph;
pub mod source;
pub mod types;

pub use cache::{CacheStore, MemoryCache};
pub use graph::{GraphClient, GraphError};
pub use source::{clamp_limit, MediaSource, MAX_LIMIT};
pub use types::{MediaItem, MediaType};
