//! SeaORM entity definitions.

pub mod api_key;
pub mod user;
