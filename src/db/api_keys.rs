//! Database operations for API keys using SeaORM.

use chrono::{DateTime, Utc};
use sea_orm::*;

use crate::entity::{api_key, user};
use crate::error::AppResult;
use crate::models::{ApiKey, ApiKeyChanges};

/// Insert a new API key for `user_id`.
pub async fn insert_api_key(
    db: &DatabaseConnection,
    user_id: i32,
    key: &str,
    name: &str,
    expires_at: Option<DateTime<Utc>>,
) -> AppResult<ApiKey> {
    let model = api_key::ActiveModel {
        user_id: Set(user_id),
        key: Set(key.to_string()),
        name: Set(name.to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        expires_at: Set(expires_at),
        ..Default::default()
    };

    let inserted = model.insert(db).await?;
    Ok(model_to_api_key(inserted))
}

/// Find an API key by ID.
pub async fn find_by_id(db: &DatabaseConnection, id: i32) -> AppResult<Option<ApiKey>> {
    let result = api_key::Entity::find_by_id(id).one(db).await?;
    Ok(result.map(model_to_api_key))
}

/// List keys owned by one user, newest first.
pub async fn list_for_user(db: &DatabaseConnection, user_id: i32) -> AppResult<Vec<ApiKey>> {
    let results = api_key::Entity::find()
        .filter(api_key::Column::UserId.eq(user_id))
        .order_by_desc(api_key::Column::CreatedAt)
        .order_by_desc(api_key::Column::Id)
        .all(db)
        .await?;

    Ok(results.into_iter().map(model_to_api_key).collect())
}

/// List every key together with its owner's username, newest first.
pub async fn list_all_with_owner(
    db: &DatabaseConnection,
) -> AppResult<Vec<(ApiKey, Option<String>)>> {
    let results = api_key::Entity::find()
        .find_also_related(user::Entity)
        .order_by_desc(api_key::Column::CreatedAt)
        .order_by_desc(api_key::Column::Id)
        .all(db)
        .await?;

    Ok(results
        .into_iter()
        .map(|(key, owner)| (model_to_api_key(key), owner.map(|u| u.username)))
        .collect())
}

/// Apply name / activation / expiry changes. The secret column is never written.
///
/// Returns `None` when the key does not exist.
pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    changes: ApiKeyChanges,
) -> AppResult<Option<ApiKey>> {
    let model = match api_key::Entity::find_by_id(id).one(db).await? {
        Some(m) => m,
        None => return Ok(None),
    };

    if changes == ApiKeyChanges::default() {
        return Ok(Some(model_to_api_key(model)));
    }

    let mut active: api_key::ActiveModel = model.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(is_active) = changes.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(expires_at) = changes.expires_at {
        active.expires_at = Set(Some(expires_at));
    }

    let updated = active.update(db).await?;
    Ok(Some(model_to_api_key(updated)))
}

/// Permanently delete an API key. Returns false if absent.
pub async fn delete(db: &DatabaseConnection, id: i32) -> AppResult<bool> {
    let result = api_key::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

fn model_to_api_key(m: api_key::Model) -> ApiKey {
    ApiKey {
        id: m.id,
        user_id: m.user_id,
        key: m.key,
        name: m.name,
        is_active: m.is_active,
        created_at: m.created_at,
        expires_at: m.expires_at,
    }
}
