//! Client for the external object-detection service.
//!
//! Requests are forwarded without buffering: the inbound body is pumped
//! chunk by chunk into the upstream request, and the upstream response is
//! streamed back with its status and end-to-end headers intact.

use std::io;
use std::time::{Duration, Instant};

use actix_web::http::StatusCode;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::web::{Bytes, Payload};
use actix_web::HttpResponse;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{API_KEY_HEADER, DetectionSettings};
use crate::error::{AppError, AppResult};

const DETECT_PATH: &str = "/detect";
const USAGE_PATH: &str = "/users/me/stats";

/// Chunks buffered between the inbound payload and the upstream request.
const PUMP_CAPACITY: usize = 8;

/// Headers that describe a single connection and must not be relayed.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Pooled HTTP client bound to the detection service base URL.
#[derive(Clone)]
pub struct DetectionClient {
    http: reqwest::Client,
    base_url: String,
}

impl DetectionClient {
    /// Build a client. Only connecting is time-bounded; uploads may stream
    /// for as long as the caller keeps sending.
    pub fn new(settings: &DetectionSettings) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Forward an upload to `{base}/detect` and relay whatever comes back.
    pub async fn detect(
        &self,
        api_key: &str,
        content_type: &str,
        payload: Payload,
    ) -> AppResult<HttpResponse> {
        let url = self.endpoint(DETECT_PATH);
        let started = Instant::now();

        let request = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(stream_payload(payload));

        let resp = request
            .send()
            .await
            .map_err(|e| upstream_failure("POST", &url, e))?;

        log_outcome(DETECT_PATH, resp.status().as_u16(), started);
        Ok(relay_response(resp))
    }

    /// Fetch the caller's usage statistics from `{base}/users/me/stats`.
    pub async fn usage(&self, api_key: &str) -> AppResult<HttpResponse> {
        let url = self.endpoint(USAGE_PATH);
        let started = Instant::now();

        let resp = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| upstream_failure("GET", &url, e))?;

        log_outcome(USAGE_PATH, resp.status().as_u16(), started);
        Ok(relay_response(resp))
    }
}

fn upstream_failure(method: &str, url: &str, err: reqwest::Error) -> AppError {
    AppError::Upstream(format!("{} {} failed: {}", method, url, err))
}

fn log_outcome(path: &str, status: u16, started: Instant) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status < 400 {
        info!(target: "proxy", path, status, elapsed_ms, "Upstream responded");
    } else {
        warn!(target: "proxy", path, status, elapsed_ms, "Upstream returned an error status");
    }
}

/// Turn the inbound actix payload into a streaming request body.
///
/// The payload is not `Send`, so a local task reads it and hands chunks to
/// the upstream body over a bounded channel. When the upstream request is
/// dropped the receiver goes with it and the pump stops on its next send.
fn stream_payload(mut payload: Payload) -> reqwest::Body {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(PUMP_CAPACITY);

    actix_web::rt::spawn(async move {
        while let Some(chunk) = payload.next().await {
            let chunk = chunk.map_err(|e| io::Error::other(e.to_string()));
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    });

    let body = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    reqwest::Body::wrap_stream(body)
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
}

/// Relay an upstream response: status, end-to-end headers, streamed body.
fn relay_response(resp: reqwest::Response) -> HttpResponse {
    let status = StatusCode::from_u16(resp.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);

    for (name, value) in resp.headers() {
        let name = name.as_str();
        // Framing is recomputed for the streamed body
        if is_hop_by_hop(name) || name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(name), Ok(value)) => {
                builder.append_header((name, value));
            }
            _ => warn!(target: "proxy", header = name, "Dropping unrepresentable upstream header"),
        }
    }

    builder.streaming(resp.bytes_stream())
}
