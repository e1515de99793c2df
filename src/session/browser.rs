//! Headless browser cookie harvesting
//!
//! Visits the platform home page in a headless Chromium-family browser and
//! returns the guest cookies it was issued. The configured (or auto-detected)
//! binary is tried first, then exactly one alternate binary.

use crate::{
    Error, Result,
    config::settings::SessionSettings,
    session::refresher::{RefreshOptions, SessionRefresher},
    types::{CookieMap, Session},
};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cookie harvester driving a local browser
#[derive(Debug, Clone)]
pub struct BrowserCookieHarvester {
    home_url: String,
    fallback_binary: PathBuf,
    settle: Duration,
}

impl BrowserCookieHarvester {
    pub fn new(
        home_url: impl Into<String>,
        fallback_binary: impl Into<PathBuf>,
        settle: Duration,
    ) -> Self {
        Self {
            home_url: home_url.into(),
            fallback_binary: fallback_binary.into(),
            settle,
        }
    }

    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(
            settings.home_url.clone(),
            settings.fallback_browser.clone(),
            Duration::from_millis(settings.settle_ms),
        )
    }

    fn config(
        &self,
        binary: Option<&Path>,
        options: &RefreshOptions,
    ) -> std::result::Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder();
        if let Some(binary) = binary {
            builder = builder.chrome_executable(binary);
        }
        if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.is_empty()) {
            tracing::warn!("Browser is using proxy {}", proxy);
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        if std::env::var("CI").is_ok() || std::env::var("NO_SANDBOX").is_ok() {
            builder = builder.no_sandbox();
        }
        builder.arg("--disable-gpu").build()
    }

    /// Run `launch` with the primary binary, then once with the fallback
    async fn launch_with_fallback<T, F, Fut>(&self, options: &RefreshOptions, launch: F) -> Result<T>
    where
        F: Fn(Option<PathBuf>) -> Fut,
        Fut: Future<Output = std::result::Result<T, String>>,
    {
        match launch(options.browser_path.clone()).await {
            Ok(launched) => Ok(launched),
            Err(reason) => {
                tracing::warn!(
                    "Primary browser unavailable ({}), trying {:?}",
                    reason,
                    self.fallback_binary
                );
                launch(Some(self.fallback_binary.clone())).await.map_err(|e| {
                    Error::browser(format!(
                        "no usable browser (fallback {:?}: {})",
                        self.fallback_binary, e
                    ))
                })
            }
        }
    }

    async fn collect(&self, browser: &Browser) -> Result<Session> {
        tracing::info!("Visiting {} to obtain cookies", self.home_url);
        let page = browser
            .new_page(self.home_url.as_str())
            .await
            .map_err(|e| Error::browser(format!("failed to open {}: {}", self.home_url, e)))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| Error::browser(format!("navigation failed: {}", e)))?;

        tokio::time::sleep(self.settle).await;

        let cookies: CookieMap = page
            .get_cookies()
            .await
            .map_err(|e| Error::browser(format!("failed to read cookies: {}", e)))?
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect();

        Session::from_cookies(cookies)
            .ok_or_else(|| Error::browser("home page did not issue a device identifier cookie"))
    }
}

#[async_trait]
impl SessionRefresher for BrowserCookieHarvester {
    async fn refresh(&self, options: &RefreshOptions) -> Result<Session> {
        tracing::info!("Starting headless browser");

        let (mut browser, mut handler) = self
            .launch_with_fallback(options, |binary| async move {
                match self.config(binary.as_deref(), options) {
                    Ok(config) => Browser::launch(config).await.map_err(|e| e.to_string()),
                    Err(e) => Err(e),
                }
            })
            .await?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = self.collect(&browser).await;

        if let Err(e) = browser.close().await {
            tracing::debug!("Browser did not close cleanly: {}", e);
        }
        handler_task.abort();

        let session = result?;
        tracing::info!("Harvested {} cookies", session.len());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn harvester() -> BrowserCookieHarvester {
        BrowserCookieHarvester::new("https://www.xiaohongshu.com", "brave-browser", Duration::ZERO)
    }

    /// Launcher double that fails for the listed binaries
    struct Launcher {
        failing: Vec<Option<PathBuf>>,
        attempts: Mutex<Vec<Option<PathBuf>>>,
    }

    impl Launcher {
        fn failing(failing: Vec<Option<PathBuf>>) -> Self {
            Self {
                failing,
                attempts: Mutex::new(Vec::new()),
            }
        }

        async fn launch(&self, binary: Option<PathBuf>) -> std::result::Result<String, String> {
            self.attempts.lock().unwrap().push(binary.clone());
            if self.failing.contains(&binary) {
                Err("executable not found".to_string())
            } else {
                Ok(format!("{:?}", binary))
            }
        }

        fn attempts(&self) -> Vec<Option<PathBuf>> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_primary_binary_is_tried_first() {
        let options = RefreshOptions::new().with_browser_path("/usr/bin/chromium");
        let launcher = Launcher::failing(vec![]);

        harvester()
            .launch_with_fallback(&options, |binary| launcher.launch(binary))
            .await
            .unwrap();

        assert_eq!(launcher.attempts(), vec![Some(PathBuf::from("/usr/bin/chromium"))]);
    }

    #[tokio::test]
    async fn test_fallback_is_tried_exactly_once() {
        let options = RefreshOptions::new();
        let launcher = Launcher::failing(vec![None]);

        let launched = harvester()
            .launch_with_fallback(&options, |binary| launcher.launch(binary))
            .await
            .unwrap();

        assert!(launched.contains("brave-browser"));
        assert_eq!(
            launcher.attempts(),
            vec![None, Some(PathBuf::from("brave-browser"))]
        );
    }

    #[tokio::test]
    async fn test_no_usable_browser_names_fallback() {
        let options = RefreshOptions::new().with_browser_path("/opt/missing/chrome");
        let launcher = Launcher::failing(vec![
            Some(PathBuf::from("/opt/missing/chrome")),
            Some(PathBuf::from("brave-browser")),
        ]);

        let err = harvester()
            .launch_with_fallback(&options, |binary| launcher.launch(binary))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Browser { .. }));
        assert!(err.to_string().contains("brave-browser"));
        assert_eq!(launcher.attempts().len(), 2);
    }

    #[test]
    fn test_harvester_from_settings() {
        let settings = SessionSettings::default();
        let harvester = BrowserCookieHarvester::from_settings(&settings);

        assert_eq!(harvester.home_url, "https://www.xiaohongshu.com");
        assert_eq!(harvester.fallback_binary, PathBuf::from("brave-browser"));
        assert_eq!(harvester.settle, Duration::from_millis(3000));
    }

    #[test]
    fn test_config_with_explicit_binary() {
        let options = RefreshOptions::new().with_proxy("http://127.0.0.1:7897");

        let config = harvester().config(Some(Path::new("/usr/bin/chromium")), &options);
        assert!(config.is_ok());
    }
}
