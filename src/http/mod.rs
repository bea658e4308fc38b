//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request id, trace span, timeout)
//!     → /proxy        → proxy::ImageProxy
//!     → /feed         → media::MediaSource → render::render_grid
//!     → /admin/verify → admin (Bearer auth)
//!     → /health
//! ```

pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
