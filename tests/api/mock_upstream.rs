//! Stand-in for the object-detection service.
//!
//! `POST /detect` echoes what it received; the API key `rejected-key` gets a
//! 403 in the service's own error format. `GET /users/me/stats` returns fixed
//! usage numbers.

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, get, post, web};
use serde_json::json;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Key the mock refuses.
pub const REJECTED_KEY: &str = "rejected-key";

/// Running mock and the number of requests it has served.
pub struct MockUpstream {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl MockUpstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn header(req: &HttpRequest, name: &str) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[post("/detect")]
async fn mock_detect(
    req: HttpRequest,
    body: web::Bytes,
    hits: web::Data<Arc<AtomicUsize>>,
) -> HttpResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let api_key = header(&req, "x-api-key");
    if api_key == REJECTED_KEY {
        return HttpResponse::Forbidden()
            .insert_header(("x-upstream", "mock"))
            .json(json!({ "detail": "Invalid or expired API key" }));
    }

    HttpResponse::Ok()
        .insert_header(("x-upstream", "mock"))
        .json(json!({
            "api_key": api_key,
            "content_type": header(&req, "content-type"),
            "received_bytes": body.len(),
            "detections": [{ "label": "cat", "confidence": 0.97 }],
        }))
}

#[get("/users/me/stats")]
async fn mock_stats(req: HttpRequest, hits: web::Data<Arc<AtomicUsize>>) -> HttpResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    if header(&req, "x-api-key").is_empty() {
        return HttpResponse::Unauthorized().json(json!({ "detail": "Missing API key" }));
    }

    HttpResponse::Ok().json(json!({
        "daily_usage": 3,
        "monthly_usage": 42,
        "daily_limit": 100,
        "monthly_limit": 1000,
        "daily_percentage": 3.0,
        "monthly_percentage": 4.2,
    }))
}

/// Start a mock upstream on an ephemeral port.
pub async fn start_mock_upstream() -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let port = listener.local_addr().unwrap().port();
    let hits = Arc::new(AtomicUsize::new(0));

    let hits_data = hits.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(hits_data.clone()))
            .app_data(web::PayloadConfig::new(16 * 1024 * 1024))
            .service(mock_detect)
            .service(mock_stats)
    })
    .workers(1)
    .listen(listener)
    .expect("failed to listen")
    .disable_signals()
    .run();

    // Fire and forget; the server lives until the test runtime shuts down
    tokio::spawn(server);

    MockUpstream {
        url: format!("http://127.0.0.1:{}", port),
        hits,
    }
}

/// A base URL nothing is listening on.
pub fn unreachable_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
