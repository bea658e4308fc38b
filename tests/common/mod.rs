//! Shared utilities for integration tests: a scriptable upstream and a
//! helper that starts the service on an ephemeral port.

#![allow(dead_code)]

use std::future::Future;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use ig_feed_proxy::config::ServiceConfig;
use ig_feed_proxy::signing::Secret;
use ig_feed_proxy::{HttpServer, Shutdown};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Canned upstream reply.
#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
    pub delay: Duration,
    pub location: Option<String>,
}

impl MockResponse {
    pub fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type),
            body,
            delay: Duration::ZERO,
            location: None,
        }
    }

    pub fn redirect(location: String) -> Self {
        Self {
            status: 302,
            content_type: None,
            body: Vec::new(),
            delay: Duration::ZERO,
            location: Some(location),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: Some("text/plain"),
            body: body.as_bytes().to_vec(),
            delay: Duration::ZERO,
            location: None,
        }
    }

    pub fn json(body: serde_json::Value) -> Self {
        Self::ok("application/json", body.to_string().into_bytes())
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Running mock upstream.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockUpstream {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start an HTTP/1.1 upstream on an ephemeral port. `respond` receives the
/// request target (path and query) of every request.
pub async fn start_upstream<F, Fut>(respond: F) -> MockUpstream
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let respond = Arc::new(respond);

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let respond = respond.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                let Some(target) = read_request_target(&mut socket).await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let reply = respond(target).await;
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }

                let mut head = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                    reply.status,
                    reason_phrase(reply.status),
                    reply.body.len()
                );
                if let Some(ct) = reply.content_type {
                    head.push_str(&format!("Content-Type: {}\r\n", ct));
                }
                if let Some(location) = &reply.location {
                    head.push_str(&format!("Location: {}\r\n", location));
                }
                head.push_str("\r\n");

                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&reply.body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockUpstream { addr, hits }
}

async fn read_request_target(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    let request_line = head.lines().next()?;
    request_line.split_whitespace().nth(1).map(str::to_string)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Config for local testing: no system proxy, no secrets from the
/// environment. Loopback is allowed only on default ports, so mocks must be
/// opted in with [`proxy_config`].
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.proxy.allowed_hosts = vec!["127.0.0.1".into()];
    config.fetch.system_proxy = false;
    config.fetch.timeout_secs = 2;
    config.signing.secret_env = String::new();
    config.media.access_token_env = String::new();
    config
}

/// [`test_config`] with each upstream's `127.0.0.1:port` on the allow-list.
pub fn proxy_config(upstreams: &[&MockUpstream]) -> ServiceConfig {
    let mut config = test_config();
    config.proxy.allowed_hosts = upstreams
        .iter()
        .map(|u| format!("127.0.0.1:{}", u.addr.port()))
        .collect();
    config
}

/// Running service under test.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_server(config: ServiceConfig, secret: Option<&str>) -> TestServer {
    let secret = secret.and_then(Secret::new);
    let server = HttpServer::new(config, secret).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestServer { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Opaque gradient PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// PNG with a transparent left half.
pub fn png_with_alpha(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        Rgba([200, 10, 10, if x < width / 2 { 0 } else { 255 }])
    });
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}
