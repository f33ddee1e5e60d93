//! User account service: creation, updates, and credential checks.

use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::db::users::{self as db, UserPatch};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, NewUser, UpdateUserRequest, User};

const MAX_USERNAME_LENGTH: usize = 64;
const MAX_EMAIL_LENGTH: usize = 254;

/// Single message for every sign-in failure.
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const DUPLICATE_ACCOUNT: &str = "Username or email already registered";

/// Treat missing and whitespace-only values the same way.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_username(username: &str) -> AppResult<()> {
    // Sign-in matches either column, so a username must never look like an email
    if username.contains('@') {
        return Err(AppError::InvalidInput(
            "Username must not contain '@'".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    Ok(())
}

fn check_email(email: &str) -> AppResult<()> {
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !well_formed || email.len() > MAX_EMAIL_LENGTH {
        return Err(AppError::InvalidInput("Invalid email address".to_string()));
    }
    Ok(())
}

/// Validate a create request.
///
/// `trusted` is false for public signup: role and activation flags from the
/// body are then ignored and the account is an active non-admin.
pub fn validate_new_user(req: CreateUserRequest, trusted: bool) -> AppResult<NewUser> {
    let username = non_blank(req.username);
    let email = non_blank(req.email);
    // Passwords are taken verbatim; only emptiness is rejected.
    let password = req.password.filter(|p| !p.is_empty());

    let (Some(username), Some(email), Some(password)) = (username, email, password) else {
        return Err(AppError::InvalidInput(
            "Missing required fields".to_string(),
        ));
    };

    check_username(&username)?;
    check_email(&email)?;

    let (is_active, is_admin) = if trusted {
        (req.is_active.unwrap_or(true), req.is_admin.unwrap_or(false))
    } else {
        (true, false)
    };

    Ok(NewUser {
        username,
        email,
        password,
        is_active,
        is_admin,
    })
}

/// Create a user after checking that username and email are free.
pub async fn create_user(pool: &DbPool, new: NewUser, bcrypt_cost: u32) -> AppResult<User> {
    let conn = pool.connection();

    if db::find_conflicting(conn, Some(&new.username), Some(&new.email), None)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(DUPLICATE_ACCOUNT.to_string()));
    }

    let hash = hash_password(&new.password, bcrypt_cost).await?;
    let user = db::insert(conn, &new, &hash).await?;

    info!(
        user_id = user.id,
        username = %user.username,
        is_admin = user.is_admin,
        "User created"
    );
    Ok(user)
}

/// Get a user by ID.
pub async fn get_user(pool: &DbPool, id: i32) -> AppResult<User> {
    db::find_by_id(pool.connection(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
}

/// List every user.
pub async fn list_users(pool: &DbPool) -> AppResult<Vec<User>> {
    db::list_all(pool.connection()).await
}

/// Apply a partial update.
///
/// Blank strings count as absent. A changed username or email is checked
/// against every other account; a new password is re-hashed.
pub async fn update_user(
    pool: &DbPool,
    id: i32,
    req: UpdateUserRequest,
    bcrypt_cost: u32,
) -> AppResult<User> {
    let conn = pool.connection();

    let username = non_blank(req.username);
    let email = non_blank(req.email);
    let password = req.password.filter(|p| !p.is_empty());

    if let Some(ref username) = username {
        check_username(username)?;
    }
    if let Some(ref email) = email {
        check_email(email)?;
    }

    if db::find_by_id(conn, id).await?.is_none() {
        return Err(AppError::NotFound("User".to_string()));
    }

    if db::find_conflicting(conn, username.as_deref(), email.as_deref(), Some(id))
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(DUPLICATE_ACCOUNT.to_string()));
    }

    let password_hash = match password {
        Some(p) => Some(hash_password(&p, bcrypt_cost).await?),
        None => None,
    };

    let patch = UserPatch {
        username,
        email,
        password_hash,
        is_active: req.is_active,
        is_admin: req.is_admin,
    };

    db::update(conn, id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
}

/// Delete a user and all of their API keys.
pub async fn delete_user(pool: &DbPool, id: i32) -> AppResult<()> {
    if db::delete(pool.connection(), id).await? {
        info!(user_id = id, "User deleted");
        Ok(())
    } else {
        Err(AppError::NotFound("User".to_string()))
    }
}

/// Check a username-or-email and password pair.
///
/// Unknown identifiers, inactive accounts and wrong passwords all produce
/// the same 401. A miss still pays one bcrypt round at `bcrypt_cost` so
/// response time does not reveal which identifiers exist.
pub async fn authenticate(
    pool: &DbPool,
    identifier: &str,
    password: &str,
    bcrypt_cost: u32,
) -> AppResult<User> {
    let identifier = identifier.trim();
    if identifier.is_empty() || password.is_empty() {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let Some(credentials) = db::find_credentials(pool.connection(), identifier).await? else {
        hash_password(password, bcrypt_cost).await?;
        warn!("Sign-in failed: no active account matches identifier");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(password, &credentials.password_hash).await? {
        warn!(user_id = credentials.user.id, "Sign-in failed: wrong password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    Ok(credentials.user)
}
