//! Router assembly: HTTP endpoints, static files, CORS, body limit, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - `POST /api/chat`: document upload → flashcards
/// - `GET /api/v1/health`
/// - Static SPA from the configured directory with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let static_service = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(format!("{static_dir}/index.html")));
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route(
            "/api/chat",
            post(http::http_post_generate).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::openai::fake_upstream::{error_reply, spawn, tool_call_reply};
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "flashdeck-test-boundary";

    fn router_for(base_url: String) -> Router {
        let cfg = ServerConfig { base_url, timeout_secs: 5, max_flashcards: 5, ..ServerConfig::default() };
        build_router(Arc::new(AppState::new(cfg).expect("state")))
    }

    fn router_with_upload_limit(max_upload_bytes: usize) -> Router {
        let cfg = ServerConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 5,
            max_upload_bytes,
            ..ServerConfig::default()
        };
        build_router(Arc::new(AppState::new(cfg).expect("state")))
    }

    /// Hand-built multipart body; `None` leaves a field out.
    fn form(file: Option<(&str, &str)>, count: Option<&str>, deck_id: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((name, bytes)) = file {
            body.extend_from_slice(format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            ).as_bytes());
            body.extend_from_slice(bytes.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        for (key, value) in [("count", count), ("deckId", deck_id)] {
            if let Some(v) = value {
                body.extend_from_slice(format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{key}\"\r\n\r\n{v}\r\n"
                ).as_bytes());
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn send_form(app: Router, body: Vec<u8>, key: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(k) = key {
            req = req.header("X-OpenAI-Key", k);
        }
        let res = app.oneshot(req.body(Body::from(body)).expect("request")).await.expect("response");
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = router_for("http://127.0.0.1:9".into());
        let res = app
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn generates_one_card_from_text_upload() {
        let (url, _) = spawn(StatusCode::OK, tool_call_reply(&[("c1", "What colour is the sky?", "Blue")])).await;
        let body = form(Some(("notes.txt", "The sky is blue.")), Some("1"), Some("deck-9"));
        let (status, json) = send_form(router_for(url), body, Some("sk-test")).await;
        assert_eq!(status, StatusCode::OK);
        let cards = json["flashcards"].as_array().expect("array");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0]["deckId"], "deck-9");
    }

    #[tokio::test]
    async fn missing_fields_are_bad_requests() {
        let url = "http://127.0.0.1:9".to_string();
        let cases = [
            form(None, Some("1"), Some("d")),
            form(Some(("a.txt", "x")), None, Some("d")),
            form(Some(("a.txt", "x")), Some("1"), None),
            form(Some(("a.txt", "x")), Some("zero"), Some("d")),
            form(Some(("a.txt", "x")), Some("0"), Some("d")),
        ];
        for body in cases {
            let (status, json) = send_form(router_for(url.clone()), body, Some("k")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "Missing required fields");
        }
    }

    #[tokio::test]
    async fn count_above_maximum_is_rejected() {
        let body = form(Some(("a.txt", "x")), Some("6"), Some("d"));
        let (status, _) = send_form(router_for("http://127.0.0.1:9".into()), body, Some("k")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let text = "a".repeat(8 * 1024);
        let body = form(Some(("big.txt", &text)), Some("1"), Some("d"));
        let (status, json) = send_form(router_with_upload_limit(1024), body, Some("k")).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"], "Uploaded file is too large");
    }

    #[tokio::test]
    async fn oversized_text_fields_are_payload_too_large() {
        let long = "1".repeat(8 * 1024);
        let cases = [
            form(Some(("a.txt", "x")), Some(&long), Some("d")),
            form(Some(("a.txt", "x")), Some("1"), Some(&long)),
        ];
        for body in cases {
            let (status, json) = send_form(router_with_upload_limit(1024), body, Some("k")).await;
            assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
            assert_eq!(json["error"], "Uploaded file is too large");
        }
    }

    #[tokio::test]
    async fn missing_credential_is_unauthorized() {
        let body = form(Some(("a.txt", "x")), Some("1"), Some("d"));
        let (status, json) = send_form(router_for("http://127.0.0.1:9".into()), body, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "OpenAI API key is required");
    }

    #[tokio::test]
    async fn rejected_credential_maps_to_401() {
        let (url, _) = spawn(StatusCode::UNAUTHORIZED, error_reply("Incorrect API key provided")).await;
        let body = form(Some(("a.txt", "Some notes")), Some("1"), Some("d"));
        let (status, json) = send_form(router_for(url), body, Some("bad")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Invalid OpenAI API key");
    }

    #[tokio::test]
    async fn rate_limit_and_upstream_failures_are_mapped() {
        let (url, _) = spawn(StatusCode::TOO_MANY_REQUESTS, error_reply("slow down")).await;
        let body = form(Some(("a.txt", "Some notes")), Some("1"), Some("d"));
        let (status, json) = send_form(router_for(url), body, Some("k")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["error"], "OpenAI API rate limit exceeded");

        let (url, _) = spawn(StatusCode::SERVICE_UNAVAILABLE, error_reply("overloaded")).await;
        let body = form(Some(("a.txt", "Some notes")), Some("1"), Some("d"));
        let (status, json) = send_form(router_for(url), body, Some("k")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Error communicating with OpenAI API");
        assert!(json["details"].as_str().unwrap().contains("overloaded"));
    }

    #[tokio::test]
    async fn extraction_errors_are_500_with_message() {
        let body = form(Some(("deck.pptx", "x")), Some("1"), Some("d"));
        let (status, json) = send_form(router_for("http://127.0.0.1:9".into()), body, Some("k")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Unsupported file type. Please upload a .txt or .pdf file.");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn count_mismatch_is_surfaced() {
        let (url, _) = spawn(StatusCode::OK, tool_call_reply(&[("1", "Q", "A")])).await;
        let body = form(Some(("a.txt", "Some notes")), Some("2"), Some("d"));
        let (status, json) = send_form(router_for(url), body, Some("k")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Expected exactly 2 flashcards, but got 1");
    }
}
