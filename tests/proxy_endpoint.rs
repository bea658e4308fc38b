//! End-to-end tests for `GET /proxy`.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use ig_feed_proxy::signing::{Secret, UrlSigner};

mod common;
use common::{
    client, dimensions, png, png_with_alpha, proxy_config, start_server, start_upstream, test_config,
    MockResponse, TEST_SECRET,
};

fn signer() -> UrlSigner {
    UrlSigner::new(Secret::new(TEST_SECRET), "/proxy")
}

#[tokio::test]
async fn test_signed_url_round_trip() {
    let upstream = start_upstream(|_| async { MockResponse::ok("image/png", png(1000, 500)) }).await;
    let server = start_server(proxy_config(&[&upstream]), Some(TEST_SECRET)).await;

    let signed = signer().sign(&upstream.url("/media/a.png?stp=dst-jpg"), "t");
    let res = client().get(server.url(&signed)).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "image/jpeg");
    assert_eq!(res.headers()["cache-control"], "public, max-age=86400");
    assert_eq!(res.headers()["cross-origin-resource-policy"], "cross-origin");
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    assert!(res.headers().contains_key("x-request-id"));

    let body = res.bytes().await.unwrap();
    assert_eq!(dimensions(&body), (150, 75));
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_full_size_never_upscales() {
    let upstream = start_upstream(|_| async { MockResponse::ok("image/png", png(50, 50)) }).await;
    let server = start_server(proxy_config(&[&upstream]), Some(TEST_SECRET)).await;

    let signed = signer().sign(&upstream.url("/small.png"), "full");
    let res = client().get(server.url(&signed)).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(dimensions(&res.bytes().await.unwrap()), (50, 50));
}

#[tokio::test]
async fn test_alpha_survives_transform() {
    let upstream = start_upstream(|_| async { MockResponse::ok("image/png", png_with_alpha(400, 400)) }).await;
    let server = start_server(proxy_config(&[&upstream]), Some(TEST_SECRET)).await;

    let signed = signer().sign(&upstream.url("/logo.png"), "t");
    let res = client().get(server.url(&signed)).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "image/webp");
    let img = image::load_from_memory(&res.bytes().await.unwrap()).unwrap();
    assert_eq!((img.width(), img.height()), (150, 150));
    assert!(img.color().has_alpha());
}

#[tokio::test]
async fn test_undecodable_body_passes_through() {
    let upstream = start_upstream(|_| async { MockResponse::ok("image/avif", b"not really avif".to_vec()) }).await;
    let server = start_server(proxy_config(&[&upstream]), Some(TEST_SECRET)).await;

    let signed = signer().sign(&upstream.url("/x.avif"), "m");
    let res = client().get(server.url(&signed)).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "image/avif");
    assert_eq!(&res.bytes().await.unwrap()[..], b"not really avif");
}

#[tokio::test]
async fn test_tampering_is_rejected() {
    let upstream = start_upstream(|_| async { MockResponse::ok("image/png", png(10, 10)) }).await;
    let server = start_server(proxy_config(&[&upstream]), Some(TEST_SECRET)).await;
    let raw = upstream.url("/a.png");
    let signature = Secret::new(TEST_SECRET).unwrap().sign(&raw);

    // Signature over a different allowed URL.
    let other = URL_SAFE_NO_PAD.encode(upstream.url("/b.png"));
    let res = client()
        .get(server.url(&format!("/proxy?encoded_url={other}&signature={signature}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
    assert_eq!(res.headers()["cache-control"], "no-store");

    // Flipped signature digit.
    let mut flipped = signature.clone();
    let last = if flipped.ends_with('0') { "1" } else { "0" };
    flipped.replace_range(flipped.len() - 1.., last);
    let encoded = URL_SAFE_NO_PAD.encode(&raw);
    let res = client()
        .get(server.url(&format!("/proxy?encoded_url={encoded}&signature={flipped}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    // Same digest, uppercase hex.
    let res = client()
        .get(server.url(&format!(
            "/proxy?encoded_url={encoded}&signature={}",
            signature.to_uppercase()
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
    assert_eq!(res.headers()["cache-control"], "no-store");

    // Garbage encoding.
    let res = client()
        .get(server.url(&format!("/proxy?encoded_url=%25%25%25&signature={signature}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_disallowed_host_with_valid_signature() {
    let server = start_server(test_config(), Some(TEST_SECRET)).await;

    let signed = signer().sign("https://evil.example/x.jpg", "m");
    let res = client().get(server.url(&signed)).send().await.unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(res.headers()["cache-control"], "no-store");
}

#[tokio::test]
async fn test_unlisted_port_is_rejected() {
    let upstream = start_upstream(|_| async { MockResponse::ok("image/png", png(10, 10)) }).await;
    // Loopback is allowed, but only on the default port.
    let server = start_server(test_config(), Some(TEST_SECRET)).await;

    let signed = signer().sign(&upstream.url("/a.png"), "m");
    let res = client().get(server.url(&signed)).send().await.unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_missing_signature_never_fetches() {
    let upstream = start_upstream(|_| async { MockResponse::ok("image/png", png(10, 10)) }).await;
    let server = start_server(proxy_config(&[&upstream]), Some(TEST_SECRET)).await;

    let encoded = URL_SAFE_NO_PAD.encode(upstream.url("/a.png"));
    let res = client()
        .get(server.url(&format!("/proxy?encoded_url={encoded}")))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(res.headers()["cache-control"], "no-store");
    assert!(res.bytes().await.unwrap().is_empty());
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_upstream_failures_map_to_bad_gateway() {
    let upstream = start_upstream(|target| async move {
        match target.as_str() {
            "/missing.jpg" => MockResponse::status(404, "upstream secret detail"),
            "/broken.jpg" => MockResponse::status(500, "stack trace here"),
            "/empty.jpg" => MockResponse::ok("image/jpeg", Vec::new()),
            _ => MockResponse::ok("image/png", png(10, 10)).delayed(Duration::from_secs(5)),
        }
    })
    .await;
    let server = start_server(proxy_config(&[&upstream]), Some(TEST_SECRET)).await;

    for path in ["/missing.jpg", "/broken.jpg", "/empty.jpg", "/slow.jpg"] {
        let signed = signer().sign(&upstream.url(path), "m");
        let res = client().get(server.url(&signed)).send().await.unwrap();
        assert_eq!(res.status(), 502, "{path}");
        assert_eq!(res.headers()["cache-control"], "no-store");
        let body = res.text().await.unwrap();
        assert!(!body.contains("detail") && !body.contains("stack"), "{path}");
    }
}

#[tokio::test]
async fn test_server_timeout_is_not_cacheable() {
    let upstream = start_upstream(|_| async {
        MockResponse::ok("image/png", png(10, 10)).delayed(Duration::from_secs(3))
    })
    .await;
    // Deliberately invalid: the server-wide timeout fires before the fetch deadline.
    let mut config = proxy_config(&[&upstream]);
    config.timeouts.request_secs = 1;
    config.fetch.timeout_secs = 5;
    let server = start_server(config, Some(TEST_SECRET)).await;

    let signed = signer().sign(&upstream.url("/slow.png"), "m");
    let res = client().get(server.url(&signed)).send().await.unwrap();

    assert_eq!(res.status(), 408);
    assert_eq!(res.headers()["cache-control"], "no-store");
}

#[tokio::test]
async fn test_redirects_stay_on_allowed_hosts() {
    let upstream = start_upstream(|target| async move {
        match target.as_str() {
            "/final.png" => MockResponse::ok("image/png", png(20, 10)),
            _ => MockResponse::status(404, ""),
        }
    })
    .await;
    let port = upstream.addr.port();
    let redirector = start_upstream(move |target| async move {
        match target.as_str() {
            // `localhost` is not on the allow-list even though it resolves locally.
            "/foreign.jpg" => MockResponse::redirect(format!("http://localhost:{port}/final.png")),
            _ => MockResponse::redirect(format!("http://127.0.0.1:{port}/final.png")),
        }
    })
    .await;
    let server = start_server(proxy_config(&[&upstream, &redirector]), Some(TEST_SECRET)).await;

    let signed = signer().sign(&redirector.url("/local.jpg"), "full");
    let res = client().get(server.url(&signed)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(dimensions(&res.bytes().await.unwrap()), (20, 10));

    let signed = signer().sign(&redirector.url("/foreign.jpg"), "full");
    let res = client().get(server.url(&signed)).send().await.unwrap();
    assert_eq!(res.status(), 502);
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_missing_secret_is_server_error() {
    let upstream = start_upstream(|_| async { MockResponse::ok("image/png", png(10, 10)) }).await;
    let server = start_server(proxy_config(&[&upstream]), None).await;

    let signed = signer().sign(&upstream.url("/a.png"), "m");
    let res = client().get(server.url(&signed)).send().await.unwrap();

    assert_eq!(res.status(), 500);
    assert_eq!(res.headers()["cache-control"], "no-store");
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_signing_is_deterministic() {
    let url = "https://scontent.cdninstagram.com/v/t51/abc.jpg?_nc_ht=x&oh=1";
    assert_eq!(signer().sign(url, "l"), signer().sign(url, "l"));
}
