//! HTTP service exposing the platform operations
//!
//! Every route takes query parameters and answers `{code, data, message}`.

pub mod app;
pub mod handlers;

pub use app::{AppState, create_app};
