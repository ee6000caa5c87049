//! axum application for the spendguard webhook.
//!
//! The binary in `main.rs` wires real Google Cloud clients into
//! [`app::AppState`]; tests inject stubs through the same seams.

#![forbid(unsafe_code)]

pub mod app;
pub mod handler;

pub use app::{AppState, router};
