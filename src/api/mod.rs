//! API endpoint modules.

pub mod api_keys;
pub mod auth;
pub mod detect;
pub mod health;
pub mod openapi;
pub mod users;

use actix_web::web;

use crate::error::AppError;

pub use openapi::ApiDoc;

/// Mount every `/api` route plus body and path extractor settings.
///
/// Malformed JSON, form bodies and path parameters become 400 responses in
/// the standard error shape.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::InvalidInput(format!("Invalid request body: {}", err)).into()
    }))
    .app_data(web::FormConfig::default().error_handler(|err, _req| {
        AppError::InvalidInput(format!("Invalid form body: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::InvalidInput(format!("Invalid path parameter: {}", err)).into()
    }))
    .configure(health::configure_routes)
    .configure(auth::configure_routes)
    .configure(users::configure_routes)
    .configure(api_keys::configure_routes)
    .configure(detect::configure_routes);
}
