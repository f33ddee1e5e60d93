//! User management endpoints.

use actix_web::{HttpResponse, delete, get, post, put, web};

use crate::auth::{Capability, SessionAuth};
use crate::config::Config;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, UpdateUserRequest, User};
use crate::services::users;

/// Configure user routes. `/users/me` is registered ahead of `/users/{id}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users)
        .service(create_user)
        .service(get_me)
        .service(get_user)
        .service(update_user)
        .service(delete_user);
}

/// List all users.
///
/// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = Vec<User>),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Admin role required")
    ),
    security(("session" = []))
)]
#[get("/users")]
pub async fn list_users(auth: SessionAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    auth.caller.require(Capability::Admin)?;

    let users = users::list_users(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Create a user.
///
/// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Missing required fields"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Username or email already registered")
    ),
    security(("session" = []))
)]
#[post("/users")]
pub async fn create_user(
    auth: SessionAuth,
    body: web::Json<CreateUserRequest>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    auth.caller.require(Capability::Admin)?;

    let new = users::validate_new_user(body.into_inner(), true)?;
    let user = users::create_user(pool.get_ref(), new, config.auth.bcrypt_cost).await?;

    Ok(HttpResponse::Created().json(user))
}

/// Current user's account.
///
/// GET /api/users/me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "User not found")
    ),
    security(("session" = []))
)]
#[get("/users/me")]
pub async fn get_me(auth: SessionAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let user = users::get_user(pool.get_ref(), auth.caller.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Get a user by ID.
///
/// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    ),
    security(("session" = []))
)]
#[get("/users/{id}")]
pub async fn get_user(
    auth: SessionAuth,
    path: web::Path<i32>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    auth.caller.require(Capability::SelfOrAdmin(id))?;

    let user = users::get_user(pool.get_ref(), id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Partially update a user.
///
/// PUT /api/users/{id}
/// Only admins may change `is_active` or `is_admin`, and never on their own
/// account.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username or email already registered")
    ),
    security(("session" = []))
)]
#[put("/users/{id}")]
pub async fn update_user(
    auth: SessionAuth,
    path: web::Path<i32>,
    body: web::Json<UpdateUserRequest>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    auth.caller.require(Capability::SelfOrAdmin(id))?;

    let changes = body.into_inner();
    if changes.changes_flags() {
        if id == auth.caller.user_id {
            return Err(AppError::Forbidden(
                "You cannot change your own role or activation".to_string(),
            ));
        }
        auth.caller.require(Capability::Admin)?;
    }

    let user = users::update_user(pool.get_ref(), id, changes, config.auth.bcrypt_cost).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Delete a user and every key they own.
///
/// DELETE /api/users/{id}
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin role required, or deleting yourself"),
        (status = 404, description = "User not found")
    ),
    security(("session" = []))
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    auth: SessionAuth,
    path: web::Path<i32>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    auth.caller.require(Capability::Admin)?;

    if id == auth.caller.user_id {
        return Err(AppError::Forbidden(
            "You cannot delete your own account".to_string(),
        ));
    }

    users::delete_user(pool.get_ref(), id).await?;
    Ok(HttpResponse::NoContent().finish())
}
