//! Authentication: session tokens, password hashing, and access policy.

mod extractor;
pub mod password;
pub mod policy;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};

use crate::config::AuthSettings;
use crate::error::{AppError, AppResult};
use crate::models::{SessionClaims, User};

pub use extractor::SessionAuth;
pub use policy::Capability;

/// Session JWT issuer.
pub const SESSION_ISSUER: &str = "detection-gateway";

/// Signs and verifies HS256 session tokens.
///
/// The secret is held in a `SecretString`, so `Debug` never prints it.
#[derive(Clone)]
pub struct SessionKeys {
    secret: SecretString,
    ttl_secs: u64,
}

impl SessionKeys {
    pub fn new(secret: SecretString, ttl_secs: u64) -> Self {
        Self { secret, ttl_secs }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.session_secret.clone(), settings.session_ttl_secs)
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a session token embedding the user's id and admin flag.
    pub fn issue(&self, user: &User) -> AppResult<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(self.ttl_secs as i64);

        let claims = SessionClaims {
            sub: user.id.to_string(),
            iss: SESSION_ISSUER.to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
            user_id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        };

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::default(), &claims, &key)
            .map_err(|e| AppError::Internal(format!("Failed to create session token: {}", e)))
    }

    /// Verify a session token and return its claims.
    ///
    /// Bad signature, wrong issuer, malformed or expired tokens all map to the
    /// same `Unauthorized` error.
    pub fn verify(&self, token: &str) -> AppResult<SessionClaims> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.validate_aud = false;

        decode::<SessionClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected session token: {}", e);
                AppError::Unauthorized("Invalid or expired session".to_string())
            })
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKeys([REDACTED], ttl={}s)", self.ttl_secs)
    }
}
