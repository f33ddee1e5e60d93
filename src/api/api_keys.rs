//! API key management endpoints.
//!
//! Every read returns masked keys; the full secret is only in the create
//! response.

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::Utc;
use tracing::info;

use crate::auth::{Capability, SessionAuth};
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{
    ApiKey, ApiKeyCreateResponse, ApiKeyResponse, CreateApiKeyRequest, UpdateApiKeyRequest,
};
use crate::services::api_key;

/// Configure API key routes. Literal segments come before `{id}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_api_keys)
        .service(create_api_key)
        .service(list_my_api_keys)
        .service(list_user_api_keys)
        .service(get_api_key)
        .service(update_api_key)
        .service(activate_api_key)
        .service(deactivate_api_key)
        .service(delete_api_key);
}

fn masked(keys: Vec<ApiKey>) -> Vec<ApiKeyResponse> {
    keys.into_iter().map(ApiKeyResponse::from).collect()
}

/// Load a key and check the caller owns it (or is admin).
async fn owned_key(auth: &SessionAuth, pool: &DbPool, id: i32) -> AppResult<ApiKey> {
    let key = api_key::get_key(pool, id).await?;
    auth.caller.require(Capability::OwnerOrAdmin(key.user_id))?;
    Ok(key)
}

/// List API keys. Admins see every key with its owner; others see their own.
///
/// GET /api/apikeys
#[utoipa::path(
    get,
    path = "/api/apikeys",
    tag = "API Keys",
    responses(
        (status = 200, description = "API keys (masked)", body = Vec<ApiKeyResponse>),
        (status = 401, description = "Not signed in")
    ),
    security(("session" = []))
)]
#[get("/apikeys")]
pub async fn list_api_keys(auth: SessionAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    if auth.caller.is_admin() {
        let items: Vec<ApiKeyResponse> = api_key::list_all_keys(pool.get_ref())
            .await?
            .into_iter()
            .map(|(key, owner)| ApiKeyResponse::from(key).with_username(owner))
            .collect();
        return Ok(HttpResponse::Ok().json(items));
    }

    let keys = api_key::list_user_keys(pool.get_ref(), auth.caller.user_id).await?;
    Ok(HttpResponse::Ok().json(masked(keys)))
}

/// Create an API key.
///
/// POST /api/apikeys
/// `userId` defaults to the caller; creating keys for someone else needs admin.
#[utoipa::path(
    post,
    path = "/api/apikeys",
    tag = "API Keys",
    request_body = CreateApiKeyRequest,
    responses(
        (status = 200, description = "API key created (full key shown once)", body = ApiKeyCreateResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin role required, or the owner is inactive"),
        (status = 404, description = "User not found")
    ),
    security(("session" = []))
)]
#[post("/apikeys")]
pub async fn create_api_key(
    auth: SessionAuth,
    body: web::Json<CreateApiKeyRequest>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let name = api_key::validate_name(req.name.as_deref().unwrap_or_default())?;

    let owner_id = req.user_id.unwrap_or(auth.caller.user_id);
    if owner_id != auth.caller.user_id {
        auth.caller.require(Capability::Admin)?;
    }

    let expires_at =
        api_key::resolve_expiry(req.expires_at.as_deref(), req.expires_in.as_deref(), Utc::now())?;

    let key = api_key::create_key(pool.get_ref(), owner_id, &name, expires_at).await?;

    info!(
        key_id = key.id,
        owner_id,
        created_by = auth.caller.user_id,
        "API key created"
    );

    Ok(HttpResponse::Ok().json(ApiKeyCreateResponse::from(key)))
}

/// The caller's own keys.
///
/// GET /api/apikeys/me
#[utoipa::path(
    get,
    path = "/api/apikeys/me",
    tag = "API Keys",
    responses(
        (status = 200, description = "Your API keys (masked)", body = Vec<ApiKeyResponse>),
        (status = 401, description = "Not signed in")
    ),
    security(("session" = []))
)]
#[get("/apikeys/me")]
pub async fn list_my_api_keys(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let keys = api_key::list_user_keys(pool.get_ref(), auth.caller.user_id).await?;
    Ok(HttpResponse::Ok().json(masked(keys)))
}

/// Keys belonging to one user.
///
/// GET /api/apikeys/user/{userId}
#[utoipa::path(
    get,
    path = "/api/apikeys/user/{userId}",
    tag = "API Keys",
    params(("userId" = i32, Path, description = "Owner's user ID")),
    responses(
        (status = 200, description = "API keys (masked)", body = Vec<ApiKeyResponse>),
        (status = 403, description = "Not your account")
    ),
    security(("session" = []))
)]
#[get("/apikeys/user/{user_id}")]
pub async fn list_user_api_keys(
    auth: SessionAuth,
    path: web::Path<i32>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    auth.caller.require(Capability::SelfOrAdmin(user_id))?;

    let keys = api_key::list_user_keys(pool.get_ref(), user_id).await?;
    Ok(HttpResponse::Ok().json(masked(keys)))
}

/// Get a single API key.
///
/// GET /api/apikeys/{id}
#[utoipa::path(
    get,
    path = "/api/apikeys/{id}",
    tag = "API Keys",
    params(("id" = i32, Path, description = "API key ID")),
    responses(
        (status = 200, description = "API key (masked)", body = ApiKeyResponse),
        (status = 403, description = "Not your key"),
        (status = 404, description = "API key not found")
    ),
    security(("session" = []))
)]
#[get("/apikeys/{id}")]
pub async fn get_api_key(
    auth: SessionAuth,
    path: web::Path<i32>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let key = owned_key(&auth, pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiKeyResponse::from(key)))
}

/// Update name, activation or expiry.
///
/// PUT /api/apikeys/{id}
#[utoipa::path(
    put,
    path = "/api/apikeys/{id}",
    tag = "API Keys",
    params(("id" = i32, Path, description = "API key ID")),
    request_body = UpdateApiKeyRequest,
    responses(
        (status = 200, description = "Updated API key (masked)", body = ApiKeyResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not your key"),
        (status = 404, description = "API key not found")
    ),
    security(("session" = []))
)]
#[put("/apikeys/{id}")]
pub async fn update_api_key(
    auth: SessionAuth,
    path: web::Path<i32>,
    body: web::Json<UpdateApiKeyRequest>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let key = owned_key(&auth, pool.get_ref(), path.into_inner()).await?;

    let changes = api_key::changes_from_request(body.into_inner(), Utc::now())?;
    let updated = api_key::update_key(pool.get_ref(), key.id, changes).await?;

    Ok(HttpResponse::Ok().json(ApiKeyResponse::from(updated)))
}

/// Re-enable a key.
///
/// PUT /api/apikeys/{id}/activate
#[utoipa::path(
    put,
    path = "/api/apikeys/{id}/activate",
    tag = "API Keys",
    params(("id" = i32, Path, description = "API key ID")),
    responses(
        (status = 200, description = "API key activated", body = ApiKeyResponse),
        (status = 403, description = "Not your key"),
        (status = 404, description = "API key not found")
    ),
    security(("session" = []))
)]
#[put("/apikeys/{id}/activate")]
pub async fn activate_api_key(
    auth: SessionAuth,
    path: web::Path<i32>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let key = owned_key(&auth, pool.get_ref(), path.into_inner()).await?;
    let updated = api_key::set_active(pool.get_ref(), key.id, true).await?;

    info!(key_id = key.id, "API key activated");
    Ok(HttpResponse::Ok().json(ApiKeyResponse::from(updated)))
}

/// Disable a key without deleting it.
///
/// PUT /api/apikeys/{id}/deactivate
#[utoipa::path(
    put,
    path = "/api/apikeys/{id}/deactivate",
    tag = "API Keys",
    params(("id" = i32, Path, description = "API key ID")),
    responses(
        (status = 200, description = "API key deactivated", body = ApiKeyResponse),
        (status = 403, description = "Not your key"),
        (status = 404, description = "API key not found")
    ),
    security(("session" = []))
)]
#[put("/apikeys/{id}/deactivate")]
pub async fn deactivate_api_key(
    auth: SessionAuth,
    path: web::Path<i32>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let key = owned_key(&auth, pool.get_ref(), path.into_inner()).await?;
    let updated = api_key::set_active(pool.get_ref(), key.id, false).await?;

    info!(key_id = key.id, "API key deactivated");
    Ok(HttpResponse::Ok().json(ApiKeyResponse::from(updated)))
}

/// Permanently delete a key.
///
/// DELETE /api/apikeys/{id}
#[utoipa::path(
    delete,
    path = "/api/apikeys/{id}",
    tag = "API Keys",
    params(("id" = i32, Path, description = "API key ID")),
    responses(
        (status = 204, description = "API key deleted"),
        (status = 403, description = "Not your key"),
        (status = 404, description = "API key not found")
    ),
    security(("session" = []))
)]
#[delete("/apikeys/{id}")]
pub async fn delete_api_key(
    auth: SessionAuth,
    path: web::Path<i32>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let key = owned_key(&auth, pool.get_ref(), path.into_inner()).await?;
    api_key::delete_key(pool.get_ref(), key.id).await?;

    info!(key_id = key.id, deleted_by = auth.caller.user_id, "API key deleted");
    Ok(HttpResponse::NoContent().finish())
}
