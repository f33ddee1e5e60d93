//! Database operations for users.
//!
//! Everything returned from here is a [`User`], which has no password hash.
//! The hash only leaves this module through [`find_credentials`].

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::entity::user;
use crate::error::AppResult;
use crate::models::{NewUser, User, UserCredentials};

/// Column changes for [`update`]. `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.is_active.is_none()
            && self.is_admin.is_none()
    }
}

/// Insert a new user. `password_hash` must already be hashed.
pub async fn insert(db: &DatabaseConnection, new: &NewUser, password_hash: &str) -> AppResult<User> {
    let now = Utc::now();

    let model = user::ActiveModel {
        username: Set(new.username.clone()),
        email: Set(new.email.clone()),
        password_hash: Set(password_hash.to_string()),
        is_active: Set(new.is_active),
        is_admin: Set(new.is_admin),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let inserted = model.insert(db).await?;
    Ok(model_to_user(inserted))
}

/// Find a user by ID.
pub async fn find_by_id(db: &DatabaseConnection, id: i32) -> AppResult<Option<User>> {
    let result = user::Entity::find_by_id(id).one(db).await?;
    Ok(result.map(model_to_user))
}

/// List every user, oldest first.
pub async fn list_all(db: &DatabaseConnection) -> AppResult<Vec<User>> {
    let results = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;

    Ok(results.into_iter().map(model_to_user).collect())
}

/// Find another user holding `username` or `email`, ignoring case.
///
/// `exclude_id` skips the user being updated.
pub async fn find_conflicting(
    db: &DatabaseConnection,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<i32>,
) -> AppResult<Option<User>> {
    let mut any = Condition::any();
    if let Some(username) = username {
        any = any.add(Expr::cust_with_values(
            "LOWER(username) = LOWER(?)",
            [username.to_string()],
        ));
    }
    if let Some(email) = email {
        any = any.add(Expr::cust_with_values(
            "LOWER(email) = LOWER(?)",
            [email.to_string()],
        ));
    }
    if username.is_none() && email.is_none() {
        return Ok(None);
    }

    let mut query = user::Entity::find().filter(any);
    if let Some(id) = exclude_id {
        query = query.filter(user::Column::Id.ne(id));
    }

    let result = query.one(db).await?;
    Ok(result.map(model_to_user))
}

/// Look up an active user by username or email (case-insensitive), with its hash.
pub async fn find_credentials(
    db: &DatabaseConnection,
    identifier: &str,
) -> AppResult<Option<UserCredentials>> {
    let result = user::Entity::find()
        .filter(
            Condition::any()
                .add(Expr::cust_with_values(
                    "LOWER(username) = LOWER(?)",
                    [identifier.to_string()],
                ))
                .add(Expr::cust_with_values(
                    "LOWER(email) = LOWER(?)",
                    [identifier.to_string()],
                )),
        )
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?;

    Ok(result.map(|m| {
        let password_hash = m.password_hash.clone();
        UserCredentials {
            user: model_to_user(m),
            password_hash,
        }
    }))
}

/// Whether at least one admin account exists.
pub async fn admin_exists(db: &DatabaseConnection) -> AppResult<bool> {
    let count = user::Entity::find()
        .filter(user::Column::IsAdmin.eq(true))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Apply a partial update. Returns `None` when the user does not exist.
pub async fn update(db: &DatabaseConnection, id: i32, patch: UserPatch) -> AppResult<Option<User>> {
    let model = match user::Entity::find_by_id(id).one(db).await? {
        Some(m) => m,
        None => return Ok(None),
    };

    if patch.is_empty() {
        return Ok(Some(model_to_user(model)));
    }

    let mut active: user::ActiveModel = model.into();
    if let Some(username) = patch.username {
        active.username = Set(username);
    }
    if let Some(email) = patch.email {
        active.email = Set(email);
    }
    if let Some(hash) = patch.password_hash {
        active.password_hash = Set(hash);
    }
    if let Some(is_active) = patch.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_admin) = patch.is_admin {
        active.is_admin = Set(is_admin);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    Ok(Some(model_to_user(updated)))
}

/// Delete a user and every API key it owns. Returns false if absent.
pub async fn delete(db: &DatabaseConnection, id: i32) -> AppResult<bool> {
    let txn = db.begin().await?;

    // The FK cascades too; deleting explicitly keeps the guarantee on
    // backends where foreign keys are not enforced.
    crate::entity::api_key::Entity::delete_many()
        .filter(crate::entity::api_key::Column::UserId.eq(id))
        .exec(&txn)
        .await?;

    let result = user::Entity::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        txn.rollback().await?;
        return Ok(false);
    }

    txn.commit().await?;
    Ok(true)
}

fn model_to_user(m: user::Model) -> User {
    User {
        id: m.id,
        username: m.username,
        email: m.email,
        is_active: m.is_active,
        is_admin: m.is_admin,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}
