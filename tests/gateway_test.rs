use canteen_jarvis::adapters::menu::{menu_source_for, FileMenuSource, HttpMenuSource};
use canteen_jarvis::core::rate_limiter::ManualClock;
use canteen_jarvis::domain::model::ChatMessage;
use canteen_jarvis::utils::error::ErrorCategory;
use canteen_jarvis::{Gateway, JarvisConfig, JarvisError, RateLimitStore, RateLimiter};
use httpmock::prelude::*;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

const MENU: &str = r#"[
    {"id": "1", "name": "Samosa", "price": 15.0, "category": "Snacks"},
    {"id": "2", "name": "Masala Chai", "price": 12.0, "category": "Drinks"},
    {"id": "3", "name": "Cold Coffee", "price": 40.0, "category": "Drinks", "available": false}
]"#;

fn menu_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(MENU.as_bytes()).unwrap();
    file
}

/// Only groq is enabled and points at the mock server.
fn config_for(server: &MockServer, chat_limit: u32) -> JarvisConfig {
    let toml = format!(
        r#"
[assistant]
name = "Jarvis"
canteen_name = "Block C Canteen"
provider_timeout_seconds = 5

[providers.gemini]
enabled = false

[providers.groq]
api_key = "test-key"
base_url = "{}"

[providers.cohere]
enabled = false

[providers.claude]
enabled = false

[rate_limit.routes."/api/chat"]
max_requests = {}
window_ms = 60000
"#,
        server.base_url(),
        chat_limit
    );
    JarvisConfig::from_toml_str(&toml).unwrap()
}

fn limiter() -> (RateLimiter, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    (RateLimiter::new(Arc::new(RateLimitStore::new()), clock.clone()), clock)
}

fn headers(ip: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_static(ip));
    headers
}

#[tokio::test]
async fn test_chat_end_to_end_with_file_menu() -> anyhow::Result<()> {
    let server = MockServer::start();
    let groq = server.mock(|when, then| {
        when.method(POST)
            .path("/openai/v1/chat/completions")
            .body_contains("2 x Samosa")
            .body_contains("Block C Canteen");
        then.status(200).json_body(json!({
            "choices": [{ "message": { "content": "2 samosa aur 1 chai, total ₹42. Confirm?" } }]
        }));
    });

    let file = menu_file();
    let config = config_for(&server, 20);
    let (limiter, _) = limiter();
    let gateway = Gateway::from_config(&config, limiter, Box::new(FileMenuSource::new(file.path())));

    let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("Namaste! Kya loge?")];
    let reply = gateway
        .chat(&headers("10.0.0.7"), "mujhe 2 samosa aur ek masala chai chahiye", &history)
        .await?;

    groq.assert();
    assert_eq!(reply.provider, "groq");
    assert!(reply.reply.content.contains("₹42"));

    let order = reply.order.expect("order should be detected");
    assert_eq!(order.lines.len(), 2);
    assert_eq!(order.lines[0].item.name, "Samosa");
    assert_eq!(order.lines[0].quantity, 2);
    assert_eq!(order.lines[1].item.name, "Masala Chai");
    assert_eq!(order.total, 42.0);
    Ok(())
}

#[tokio::test]
async fn test_unavailable_and_unknown_items_are_reported() -> anyhow::Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/openai/v1/chat/completions");
        then.status(200).json_body(json!({
            "choices": [{ "message": { "content": "Cold coffee khatam ho gayi" } }]
        }));
    });

    let file = menu_file();
    let (limiter, _) = limiter();
    let gateway = Gateway::from_config(
        &config_for(&server, 20),
        limiter,
        menu_source_for(&file.path().to_string_lossy()),
    );

    let reply = gateway.chat(&headers("10.0.0.8"), "1 cold coffee, 2 pizza", &[]).await?;

    assert!(reply.order.is_none());
    assert_eq!(reply.unavailable, vec!["Cold Coffee".to_string()]);
    assert_eq!(reply.unresolved, vec!["pizza".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_http_menu_and_fallback_reply() -> anyhow::Result<()> {
    let server = MockServer::start();
    let menu = server.mock(|when, then| {
        when.method(GET).path("/api/menu");
        then.status(200).json_body(json!({
            "items": [{ "name": "Vada Pav", "price": 20.0 }]
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/openai/v1/chat/completions");
        then.status(500);
    });

    let (limiter, _) = limiter();
    let gateway = Gateway::from_config(
        &config_for(&server, 20),
        limiter,
        Box::new(HttpMenuSource::new(server.url("/api/menu"))),
    );

    let reply = gateway.chat(&headers("10.0.0.9"), "3 vada pav", &[]).await?;

    menu.assert();
    assert_eq!(reply.provider, "fallback");
    let order = reply.order.expect("order should survive provider failure");
    assert_eq!(order.total, 60.0);
    Ok(())
}

#[tokio::test]
async fn test_menu_failure_propagates() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/menu");
        then.status(502);
    });

    let (limiter, _) = limiter();
    let gateway = Gateway::from_config(
        &config_for(&server, 20),
        limiter,
        Box::new(HttpMenuSource::new(server.url("/api/menu"))),
    );

    let err = assert_err!(gateway.chat(&headers("10.0.0.10"), "1 samosa", &[]).await);
    assert!(matches!(err, JarvisError::MenuError { .. }));
}

#[tokio::test]
async fn test_chat_rate_limit_per_client() {
    let server = MockServer::start();
    let groq = server.mock(|when, then| {
        when.method(POST).path("/openai/v1/chat/completions");
        then.status(200).json_body(json!({
            "choices": [{ "message": { "content": "ok" } }]
        }));
    });

    let file = menu_file();
    let (limiter, clock) = limiter();
    let gateway = Gateway::from_config(&config_for(&server, 2), limiter, Box::new(FileMenuSource::new(file.path())));
    let alice = headers("192.168.1.20");

    assert_ok!(gateway.chat(&alice, "1 samosa", &[]).await);
    assert_ok!(gateway.chat(&alice, "1 samosa", &[]).await);

    let err = assert_err!(gateway.chat(&alice, "1 samosa", &[]).await);
    assert_eq!(err.category(), ErrorCategory::Throttling);
    assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));

    // the rejected call never reaches a provider
    assert_eq!(groq.hits(), 2);

    assert_ok!(gateway.chat(&headers("192.168.1.21"), "1 samosa", &[]).await);

    clock.advance(Duration::from_secs(61));
    assert_ok!(gateway.chat(&alice, "1 samosa", &[]).await);
}

#[tokio::test]
async fn test_admin_login_limit_uses_real_ip_header() {
    let (limiter, _) = limiter();
    let server = MockServer::start();
    let gateway = Gateway::from_config(
        &config_for(&server, 20),
        limiter,
        Box::new(FileMenuSource::new("unused.json")),
    );

    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", HeaderValue::from_static("172.16.0.3"));

    for _ in 0..5 {
        assert_ok!(gateway.admit_admin_login(&headers));
    }
    assert_err!(gateway.admit_admin_login(&headers));

    // requests without any client header share the "unknown" bucket
    for _ in 0..5 {
        assert_ok!(gateway.admit_admin_login(&HeaderMap::new()));
    }
    assert_err!(gateway.admit_admin_login(&HeaderMap::new()));
}
