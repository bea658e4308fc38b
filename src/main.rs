//! Instagram feed service.
//!
//! # Architecture Overview
//!
//! ```text
//!   Browser                         ig-feed-proxy
//!   ───────                         ─────────────
//!   GET /feed ───────────────▶ media::MediaSource ──▶ Graph API
//!                                   │ (cached list)
//!                                   ▼
//!             ◀── HTML grid ── render::render_grid ── signing::UrlSigner
//!
//!   GET /proxy?encoded_url&signature&size_class
//!             ───────────────▶ proxy::ImageProxy
//!                                   │ decode → allow-list → HMAC verify
//!                                   ▼
//!                              fetch (reqwest) ──▶ Instagram CDN
//!                                   │
//!             ◀── image bytes ─ transform (resize / re-encode)
//! ```

use std::path::PathBuf;

use clap::Parser;

use ig_feed_proxy::config::{load_config, ServiceConfig};
use ig_feed_proxy::lifecycle::startup;
use ig_feed_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "ig-feed-proxy")]
#[command(about = "Instagram feed renderer and signed image proxy", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "ig-feed-proxy starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
