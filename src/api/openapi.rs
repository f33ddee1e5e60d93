//! OpenAPI documentation configuration.

use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};

use crate::config::API_KEY_HEADER;
use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Detection Gateway",
        version = "0.1.0",
        description = "Dashboard API for user accounts, API keys and the object-detection proxy"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Auth endpoints
        api::auth::issue_token,
        api::auth::signup,
        api::auth::current_user,
        api::auth::logout,
        // User endpoints
        api::users::list_users,
        api::users::create_user,
        api::users::get_me,
        api::users::get_user,
        api::users::update_user,
        api::users::delete_user,
        // API key endpoints
        api::api_keys::list_api_keys,
        api::api_keys::create_api_key,
        api::api_keys::list_my_api_keys,
        api::api_keys::list_user_api_keys,
        api::api_keys::get_api_key,
        api::api_keys::update_api_key,
        api::api_keys::activate_api_key,
        api::api_keys::deactivate_api_key,
        api::api_keys::delete_api_key,
        // Detection proxy
        api::detect::detect,
        api::detect::usage,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::LivenessStatus,
            api::health::ReadinessStatus,
            // Auth / users
            models::User,
            models::LoginRequest,
            models::LoginResponse,
            models::CreateUserRequest,
            models::UpdateUserRequest,
            // API keys
            models::ApiKeyResponse,
            models::ApiKeyCreateResponse,
            models::CreateApiKeyRequest,
            models::UpdateApiKeyRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Sign-in and session management"),
        (name = "Users", description = "User account management"),
        (name = "API Keys", description = "API key management"),
        (name = "Detection", description = "Proxy to the object-detection service")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add session and API key security schemes.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}
