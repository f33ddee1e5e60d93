//! Actix-web extractor for session authentication.
//!
//! # Security
//! - Tokens are read from `Authorization: Bearer` first, then the session cookie
//! - Token values are never logged
//! - Every failure is reported as the same 401 so callers learn nothing about why

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, web};
use std::future::{Ready, ready};

use super::SessionKeys;
use crate::config::SESSION_COOKIE;
use crate::error::AppError;
use crate::models::AuthenticatedUser;

/// Pull the raw session token out of the request.
/// Returns None if neither a bearer header nor the cookie is present.
fn extract_session_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Extractor that requires a valid session.
///
/// ```ignore
/// async fn protected_handler(auth: SessionAuth) -> impl Responder {
///     // auth.caller contains the authenticated user's id and role
/// }
/// ```
pub struct SessionAuth {
    pub caller: AuthenticatedUser,
}

impl FromRequest for SessionAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let keys = match req.app_data::<web::Data<SessionKeys>>() {
            Some(keys) => keys,
            None => {
                return ready(Err(AppError::Internal(
                    "SessionKeys not registered as app data".to_string(),
                )));
            }
        };

        let token = match extract_session_token(req) {
            Some(token) => token,
            None => {
                return ready(Err(AppError::Unauthorized(
                    "Authentication required".to_string(),
                )));
            }
        };

        ready(
            keys.verify(&token)
                .map(|claims| SessionAuth {
                    caller: claims.into(),
                }),
        )
    }
}
