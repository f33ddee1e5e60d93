//! Sign-in, sign-up and session endpoints.
//!
//! Sessions are stateless HS256 JWTs returned in the response body and in the
//! `gateway_session` HttpOnly cookie. Either can be presented on later calls.

use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::{HttpResponse, get, post, web};
use tracing::info;

use crate::auth::{SessionAuth, SessionKeys};
use crate::config::{Config, SESSION_COOKIE};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, LoginRequest, LoginResponse, User};
use crate::services::users;

/// Configure auth routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(issue_token)
        .service(signup)
        .service(current_user)
        .service(logout);
}

fn session_cookie(value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie.set_max_age(CookieDuration::seconds(max_age_secs));
    cookie
}

/// Exchange credentials for a session token.
///
/// POST /api/auth/token
/// Accepts JSON or `application/x-www-form-urlencoded`.
#[utoipa::path(
    post,
    path = "/api/auth/token",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
#[post("/auth/token")]
pub async fn issue_token(
    body: web::Either<web::Json<LoginRequest>, web::Form<LoginRequest>>,
    pool: web::Data<DbPool>,
    keys: web::Data<SessionKeys>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let login = match body {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    };

    let identifier = login.identifier.unwrap_or_default();
    let password = login.password.unwrap_or_default();

    let user = users::authenticate(
        pool.get_ref(),
        &identifier,
        &password,
        config.auth.bcrypt_cost,
    )
    .await?;
    let token = keys.issue(&user)?;

    info!(user_id = user.id, username = %user.username, "User signed in");

    let cookie = session_cookie(
        token.clone(),
        keys.ttl_secs() as i64,
        config.environment.is_production(),
    );

    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: keys.ttl_secs(),
        user,
    }))
}

/// Public self-registration.
///
/// POST /api/auth/signup
/// Disabled unless `GATEWAY_ALLOW_SIGNUP=true`.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Auth",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Missing required fields"),
        (status = 403, description = "Sign-up disabled"),
        (status = 409, description = "Username or email already registered")
    )
)]
#[post("/auth/signup")]
pub async fn signup(
    body: web::Json<CreateUserRequest>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    if !config.auth.allow_signup {
        return Err(AppError::Forbidden("Sign-up is disabled".to_string()));
    }

    let new = users::validate_new_user(body.into_inner(), false)?;
    let user = users::create_user(pool.get_ref(), new, config.auth.bcrypt_cost).await?;

    Ok(HttpResponse::Created().json(user))
}

/// Current signed-in user, read fresh from the database.
///
/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not signed in")
    ),
    security(("session" = []))
)]
#[get("/auth/me")]
pub async fn current_user(auth: SessionAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let user = users::get_user(pool.get_ref(), auth.caller.user_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::Unauthorized("Account no longer exists".to_string()),
            other => other,
        })?;

    Ok(HttpResponse::Ok().json(user))
}

/// Clear the session cookie.
///
/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Signed out")
    )
)]
#[post("/auth/logout")]
pub async fn logout(config: web::Data<Config>) -> AppResult<HttpResponse> {
    let cookie = session_cookie(String::new(), 0, config.environment.is_production());

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(serde_json::json!({ "message": "Logged out" })))
}
