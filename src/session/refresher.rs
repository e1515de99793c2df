//! Session refresh capability
//!
//! A refresher produces a brand new cookie set, typically by visiting the
//! platform's home page in a headless browser.

use crate::{Result, types::Session};
use async_trait::async_trait;
use std::path::PathBuf;

/// Inputs to a refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Proxy the browser should use
    pub proxy: Option<String>,
    /// Primary browser binary, auto-detected when unset
    pub browser_path: Option<PathBuf>,
}

impl RefreshOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_browser_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.browser_path = Some(path.into());
        self
    }
}

/// Source of fresh sessions
///
/// Implementations return a complete [`Session`] or fail; a partially
/// harvested cookie set must never be returned.
#[async_trait]
pub trait SessionRefresher: Send + Sync + std::fmt::Debug {
    async fn refresh(&self, options: &RefreshOptions) -> Result<Session>;
}

/// Refresher for deployments without a browser
///
/// Every refresh fails, so a missing or rejected session surfaces as an error
/// instead of triggering a harvest.
#[derive(Debug, Clone, Default)]
pub struct NoopRefresher;

#[async_trait]
impl SessionRefresher for NoopRefresher {
    async fn refresh(&self, _options: &RefreshOptions) -> Result<Session> {
        Err(crate::Error::browser(
            "session refresh is not available in this build",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_options_builder() {
        let options = RefreshOptions::new()
            .with_proxy("http://127.0.0.1:7897")
            .with_browser_path("/usr/bin/chromium");

        assert_eq!(options.proxy.as_deref(), Some("http://127.0.0.1:7897"));
        assert_eq!(options.browser_path, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[tokio::test]
    async fn test_noop_refresher_fails() {
        let err = NoopRefresher.refresh(&RefreshOptions::new()).await.unwrap_err();
        assert!(matches!(err, crate::Error::Browser { .. }));
    }
}
