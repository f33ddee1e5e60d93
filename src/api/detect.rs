//! Detection proxy endpoints.
//!
//! The gateway does not validate the caller's API key: it checks the header
//! is present and leaves the rest to the detection service.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};

use crate::config::API_KEY_HEADER;
use crate::error::{AppError, AppResult};
use crate::services::DetectionClient;

/// Configure detection proxy routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(detect).service(usage);
}

fn required_header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn api_key(req: &HttpRequest) -> AppResult<&str> {
    required_header(req, API_KEY_HEADER).ok_or_else(|| {
        AppError::Unauthorized("API key is missing from the request".to_string())
    })
}

/// Run object detection on an uploaded image.
///
/// POST /api/detect
/// The body (usually multipart) is streamed to the detection service and its
/// response is relayed unchanged.
#[utoipa::path(
    post,
    path = "/api/detect",
    tag = "Detection",
    request_body(content = String, content_type = "multipart/form-data", description = "Image upload, forwarded as-is"),
    responses(
        (status = 200, description = "Detection result from the upstream service"),
        (status = 400, description = "Content-Type header missing"),
        (status = 401, description = "X-API-Key header missing"),
        (status = 500, description = "Detection service unreachable")
    ),
    security(("api_key" = []))
)]
#[post("/detect")]
pub async fn detect(
    req: HttpRequest,
    payload: web::Payload,
    client: web::Data<DetectionClient>,
) -> AppResult<HttpResponse> {
    let api_key = api_key(&req)?;
    let content_type = required_header(&req, header::CONTENT_TYPE.as_str()).ok_or_else(|| {
        AppError::InvalidInput("Content-Type header is missing".to_string())
    })?;

    client.detect(api_key, content_type, payload).await
}

/// Usage statistics for the caller's API key.
///
/// GET /api/usage
#[utoipa::path(
    get,
    path = "/api/usage",
    tag = "Detection",
    responses(
        (status = 200, description = "Usage statistics from the upstream service"),
        (status = 401, description = "X-API-Key header missing"),
        (status = 500, description = "Detection service unreachable")
    ),
    security(("api_key" = []))
)]
#[get("/usage")]
pub async fn usage(req: HttpRequest, client: web::Data<DetectionClient>) -> AppResult<HttpResponse> {
    let api_key = api_key(&req)?;
    client.usage(api_key).await
}
