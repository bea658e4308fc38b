//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → shared by value/Arc with every subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; the signing secret never changes while
//!   the process runs
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, FetchConfig, ImageProxyConfig, ListenerConfig, MediaConfig,
    ObservabilityConfig, ServiceConfig, SigningConfig, TimeoutConfig,
};
pub use validation::ValidationError;
