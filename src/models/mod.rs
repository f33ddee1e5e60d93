//! Domain models for the gateway.

pub mod api_key;
pub mod user;

// Re-export commonly used types
pub use api_key::{
    ApiKey, ApiKeyChanges, ApiKeyCreateResponse, ApiKeyResponse, CreateApiKeyRequest,
    UpdateApiKeyRequest,
};
pub use user::{
    AuthenticatedUser, CreateUserRequest, LoginRequest, LoginResponse, NewUser, SessionClaims,
    UpdateUserRequest, User, UserCredentials,
};
