//! Configuration management
//!
//! This module handles loading and managing configuration settings
//! for the library, the CLI and the HTTP service.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{ApiDefaults, Settings};
