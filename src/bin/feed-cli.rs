use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use ig_feed_proxy::config::{load_config, ServiceConfig};
use ig_feed_proxy::signing::{Secret, UrlSigner};

#[derive(Parser)]
#[command(name = "feed-cli")]
#[command(about = "Signing and diagnostics CLI for ig-feed-proxy", long_about = None)]
struct Cli {
    /// Server base URL for `verify` and `check`.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key for `verify`.
    #[arg(short, long, default_value = "")]
    key: String,

    /// Configuration file supplying the signing secret for `sign`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a signed proxy URL for a remote image
    Sign {
        /// Remote image URL
        image_url: String,
        /// Size class (t, m, l, full)
        #[arg(short, long, default_value = "m")]
        size: String,
    },
    /// Run the server's end-to-end verification
    Verify,
    /// Fetch a proxy URL and print status and headers
    Check {
        /// Signed path or absolute URL, e.g. `/proxy?encoded_url=...`
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign { image_url, size } => {
            let config = match &cli.config {
                Some(path) => load_config(path)?,
                None => ServiceConfig::default(),
            };
            let secret = Secret::from_config(&config.signing)
                .ok_or("no signing secret: set signing.secret or the configured env var")?;
            let signed = UrlSigner::from_config(&config.signing, Some(secret)).sign(&image_url, &size);
            if signed.is_empty() {
                return Err("image URL must not be empty".into());
            }
            println!("{}", signed);
        }
        Commands::Verify => {
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
            );
            let res = reqwest::Client::new()
                .get(format!("{}/admin/verify", cli.url.trim_end_matches('/')))
                .headers(headers)
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Check { target } => {
            let target = if target.starts_with("http://") || target.starts_with("https://") {
                target
            } else {
                format!("{}/{}", cli.url.trim_end_matches('/'), target.trim_start_matches('/'))
            };
            let res = reqwest::Client::new().get(&target).send().await?;
            println!("{} {}", res.status(), target);
            for (name, value) in res.headers() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            let body = res.bytes().await?;
            println!("({} bytes)", body.len());
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
