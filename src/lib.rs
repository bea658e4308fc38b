//! Instagram feed service with a signed image proxy.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod media;
pub mod observability;
pub mod proxy;
pub mod render;
pub mod signing;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
