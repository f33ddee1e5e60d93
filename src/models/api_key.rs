//! API Key model for the detection service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Number of trailing secret characters left visible when masked.
pub const VISIBLE_KEY_SUFFIX: usize = 8;
/// Bullets shown in front of the visible suffix.
const MASK_PREFIX: &str = "••••••••••••••••••••••";

/// API Key stored in database.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub id: i32,
    /// Owning user
    pub user_id: i32,
    /// Full secret (64 hex characters). Immutable.
    pub key: String,
    /// Human-readable name (e.g., "dev laptop")
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Check if the key is expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at,
            None => false,
        }
    }

    /// Secret with everything but the last eight characters hidden.
    pub fn masked_key(&self) -> String {
        mask_key(&self.key)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("key", &self.masked_key())
            .field("name", &self.name)
            .field("is_active", &self.is_active)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mask a secret for display.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let start = chars.len().saturating_sub(VISIBLE_KEY_SUFFIX);
    let suffix: String = chars[start..].iter().collect();
    format!("{}{}", MASK_PREFIX, suffix)
}

/// Response when creating a new API key (includes the full key).
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeyCreateResponse {
    pub id: i32,
    pub user_id: i32,
    /// Full key - only shown once
    pub key: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ApiKey> for ApiKeyCreateResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            user_id: key.user_id,
            key: key.key,
            name: key.name,
            is_active: key.is_active,
            created_at: key.created_at,
            expires_at: key.expires_at,
        }
    }
}

/// API key as returned by every read endpoint (key masked).
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeyResponse {
    pub id: i32,
    pub user_id: i32,
    /// Masked key, last 8 characters visible
    pub key: String,
    pub name: String,
    pub is_active: bool,
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Owner's username (admin listing only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            user_id: key.user_id,
            is_expired: key.is_expired(),
            key: key.masked_key(),
            name: key.name,
            is_active: key.is_active,
            created_at: key.created_at,
            expires_at: key.expires_at,
            username: None,
        }
    }
}

impl ApiKeyResponse {
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }
}

/// Request to create a new API key.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateApiKeyRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Owner; defaults to the caller
    #[serde(default, rename = "userId", alias = "user_id")]
    pub user_id: Option<i32>,
    /// Absolute expiry: RFC 3339 timestamp or YYYY-MM-DD
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Relative expiry such as "30d", "6m", "1y" (ignored when expires_at is set)
    #[serde(default)]
    pub expires_in: Option<String>,
}

/// Partial update of an API key. The secret itself cannot be changed.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateApiKeyRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    /// RFC 3339 timestamp or YYYY-MM-DD
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Validated changes applied by the update path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApiKeyChanges {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}
