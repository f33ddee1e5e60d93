//! API Key service for generation, expiry handling, and management.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::db::{DbPool, api_keys as db, users};
use crate::error::{AppError, AppResult};
use crate::models::{ApiKey, ApiKeyChanges, UpdateApiKeyRequest};

/// Random bytes per key (256 bits, hex-encoded to 64 characters).
const KEY_RANDOM_BYTES: usize = 32;
/// Lifetime applied when a key is created without an expiry.
pub const DEFAULT_KEY_LIFETIME_DAYS: i64 = 365;
/// Maximum length of a key name.
const MAX_NAME_LENGTH: usize = 100;

/// Generate a new random API key secret.
pub fn generate_key() -> String {
    let random_bytes: [u8; KEY_RANDOM_BYTES] = rand::random();
    hex::encode(random_bytes)
}

/// Parse a duration string like "365d", "30d", "1y", "6m".
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();

    if let Some(days) = s.strip_suffix('d') {
        days.parse::<i64>().ok().and_then(Duration::try_days)
    } else if let Some(years) = s.strip_suffix('y') {
        years
            .parse::<i64>()
            .ok()
            .and_then(|y| Duration::try_days(y * 365))
    } else if let Some(months) = s.strip_suffix('m') {
        months
            .parse::<i64>()
            .ok()
            .and_then(|m| Duration::try_days(m * 30))
    } else if let Some(weeks) = s.strip_suffix('w') {
        weeks.parse::<i64>().ok().and_then(Duration::try_weeks)
    } else {
        // Try parsing as days by default
        s.parse::<i64>().ok().and_then(Duration::try_days)
    }
}

/// Parse an absolute expiry: RFC 3339, or a bare date meaning midnight UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse a user-supplied expiry and reject anything already in the past.
pub fn parse_expiry(s: &str, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    let expires_at = parse_timestamp(s).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Invalid expires_at '{}': expected an RFC 3339 timestamp or YYYY-MM-DD",
            s
        ))
    })?;

    if expires_at <= now {
        return Err(AppError::InvalidInput(
            "expires_at must be in the future".to_string(),
        ));
    }

    Ok(expires_at)
}

/// Work out a new key's expiry: explicit timestamp, then relative duration,
/// then the one-year default.
pub fn resolve_expiry(
    expires_at: Option<&str>,
    expires_in: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<DateTime<Utc>> {
    if let Some(s) = expires_at.filter(|s| !s.trim().is_empty()) {
        return parse_expiry(s, now);
    }

    if let Some(s) = expires_in.filter(|s| !s.trim().is_empty()) {
        let duration = parse_duration(s)
            .filter(|d| *d > Duration::zero())
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Invalid expires_in '{}': use a positive duration such as 30d, 6m or 1y",
                    s
                ))
            })?;
        return Ok(now + duration);
    }

    Ok(now + Duration::days(DEFAULT_KEY_LIFETIME_DAYS))
}

/// Trim and length-check a key name.
pub fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Create a new API key for an existing user and store it.
///
/// The returned value holds the full secret; callers show it exactly once.
pub async fn create_key(
    pool: &DbPool,
    owner_id: i32,
    name: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<ApiKey> {
    let conn = pool.connection();

    let owner = users::find_by_id(conn, owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    if !owner.is_active {
        return Err(AppError::Forbidden(
            "Cannot create API keys for an inactive account".to_string(),
        ));
    }

    let key = generate_key();
    db::insert_api_key(conn, owner_id, &key, name, Some(expires_at)).await
}

/// Get an API key by ID.
pub async fn get_key(pool: &DbPool, id: i32) -> AppResult<ApiKey> {
    db::find_by_id(pool.connection(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("API key".to_string()))
}

/// List keys owned by one user.
pub async fn list_user_keys(pool: &DbPool, user_id: i32) -> AppResult<Vec<ApiKey>> {
    db::list_for_user(pool.connection(), user_id).await
}

/// List every key with its owner's username.
pub async fn list_all_keys(pool: &DbPool) -> AppResult<Vec<(ApiKey, Option<String>)>> {
    db::list_all_with_owner(pool.connection()).await
}

/// Turn an update request into validated changes. Absent fields stay absent.
pub fn changes_from_request(
    req: UpdateApiKeyRequest,
    now: DateTime<Utc>,
) -> AppResult<ApiKeyChanges> {
    let name = match req.name {
        Some(ref n) if !n.trim().is_empty() => Some(validate_name(n)?),
        _ => None,
    };

    let expires_at = match req.expires_at {
        Some(ref s) if !s.trim().is_empty() => Some(parse_expiry(s, now)?),
        _ => None,
    };

    Ok(ApiKeyChanges {
        name,
        is_active: req.is_active,
        expires_at,
    })
}

/// Apply changes to an API key.
pub async fn update_key(pool: &DbPool, id: i32, changes: ApiKeyChanges) -> AppResult<ApiKey> {
    db::update(pool.connection(), id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("API key".to_string()))
}

/// Activate or deactivate an API key.
pub async fn set_active(pool: &DbPool, id: i32, is_active: bool) -> AppResult<ApiKey> {
    update_key(
        pool,
        id,
        ApiKeyChanges {
            is_active: Some(is_active),
            ..Default::default()
        },
    )
    .await
}

/// Permanently delete an API key.
pub async fn delete_key(pool: &DbPool, id: i32) -> AppResult<()> {
    if db::delete(pool.connection(), id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("API key".to_string()))
    }
}
