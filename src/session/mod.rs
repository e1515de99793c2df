//! Session management
//!
//! This module handles the cookie session lifecycle: durable storage, the
//! refresh capability and the manager that ties them together.

#[cfg(feature = "browser")]
pub mod browser;
pub mod manager;
pub mod refresher;
pub mod store;

#[cfg(feature = "browser")]
pub use browser::BrowserCookieHarvester;
pub use manager::SessionManager;
pub use refresher::{NoopRefresher, RefreshOptions, SessionRefresher};
pub use store::{CookieStore, FileCookieStore, MemoryCookieStore};
