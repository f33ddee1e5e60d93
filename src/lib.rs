//! Detection gateway library.
//!
//! Backend for the object-detection dashboard: user accounts, API keys,
//! session authentication, and a streaming proxy to the inference service.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
