//! Business logic services.

pub mod api_key;
pub mod bootstrap;
pub mod detection;
pub mod users;

pub use bootstrap::ensure_admin;
pub use detection::DetectionClient;
