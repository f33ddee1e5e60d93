//! First-run admin provisioning.

use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::config::BootstrapAdmin;
use crate::db::DbPool;
use crate::db::users as db;
use crate::error::AppResult;
use crate::models::NewUser;
use crate::services::users::create_user;

/// Create the configured admin account when no admin exists yet.
///
/// Returns true if an account was created. An existing non-admin account
/// holding the same username or email is left alone.
pub async fn ensure_admin(pool: &DbPool, admin: &BootstrapAdmin, bcrypt_cost: u32) -> AppResult<bool> {
    let conn = pool.connection();

    if db::admin_exists(conn).await? {
        return Ok(false);
    }

    if let Some(existing) =
        db::find_conflicting(conn, Some(&admin.username), Some(&admin.email), None).await?
    {
        warn!(
            user_id = existing.id,
            "No admin exists but the bootstrap username or email is taken; skipping"
        );
        return Ok(false);
    }

    let new = NewUser {
        username: admin.username.clone(),
        email: admin.email.clone(),
        password: admin.password.expose_secret().to_string(),
        is_active: true,
        is_admin: true,
    };

    let user = create_user(pool, new, bcrypt_cost).await?;
    info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
    Ok(true)
}
