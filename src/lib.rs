//! Signed-cookie authentication ticket: identify / authenticate / remember / forget,
//! plus a small axum host that wires the plugin into real requests.
//!
//! The plugin itself lives in [`services::auth`] and does not depend on axum beyond
//! the `http` header types it emits.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
