//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the signed client.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Remote API configuration
    pub api: ApiSettings,
    /// Session and cookie configuration
    pub session: SessionSettings,
    /// Signing service configuration
    pub signer: SignerSettings,
    /// Proxy configuration
    pub network: NetworkSettings,
    /// HTTP server configuration
    pub server: ServerSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
    /// Fixed request parameters used by the API facade
    pub defaults: ApiDefaults,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base host every endpoint path is appended to
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent with every call
    pub user_agent: String,
}

/// Session and cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Durable cookie record
    pub cookie_path: PathBuf,
    /// Primary browser binary, auto-detected when unset
    pub browser_path: Option<PathBuf>,
    /// Alternate browser binary tried once if the primary cannot launch
    pub fallback_browser: String,
    /// Page visited to harvest guest cookies
    pub home_url: String,
    /// Time to let the home page set its cookies, in milliseconds
    pub settle_ms: u64,
}

/// Signing service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerSettings {
    /// Endpoint of the signing service
    pub endpoint: String,
    /// Signing call timeout in seconds
    pub timeout_secs: u64,
}

/// Proxy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Explicit proxy, wins over the environment proxies
    pub proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub http_proxy: Option<String>,
    pub all_proxy: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

/// Fixed parameters the platform's web client always sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiDefaults {
    /// Phone number zone code
    pub zone: String,
    /// Preferred image formats, in order
    pub image_formats: Vec<String>,
    /// Page size of the user post listing
    pub notes_page_size: u32,
    /// Page size of the sub-comment listing
    pub sub_comment_page_size: u32,
    /// `xsec_source` for user post listings
    pub user_notes_source: String,
    /// `xsec_source` for post detail
    pub note_source: String,
    /// `extra.need_body_topic` of the feed request
    pub need_body_topic: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://edith.xiaohongshu.com".to_string(),
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_path: PathBuf::from("cookies.json"),
            browser_path: None,
            fallback_browser: "brave-browser".to_string(),
            home_url: "https://www.xiaohongshu.com".to_string(),
            settle_ms: 3000,
        }
    }
}

impl Default for SignerSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5005/sign".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6868,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

impl Default for ApiDefaults {
    fn default() -> Self {
        Self {
            zone: "86".to_string(),
            image_formats: vec!["jpg".to_string(), "webp".to_string(), "avif".to_string()],
            notes_page_size: 30,
            sub_comment_page_size: 10,
            user_notes_source: "pc_note".to_string(),
            note_source: "pc_user".to_string(),
            need_body_topic: "1".to_string(),
        }
    }
}

impl ApiDefaults {
    /// Image formats joined the way GET endpoints expect them
    pub fn image_formats_csv(&self) -> String {
        self.image_formats.join(",")
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file; missing sections keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Invalid config file {:?}: {}", path, e)))
    }

    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().merge_with_env()
    }

    /// Apply environment variable overrides on top of these settings
    pub fn merge_with_env(mut self) -> Result<Self> {
        if let Ok(base_url) = std::env::var("XHS_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("XHS_TIMEOUT") {
            self.api.timeout_secs = timeout
                .parse()
                .map_err(|e| Error::config(format!("Invalid timeout: {}", e)))?;
        }

        if let Ok(path) = std::env::var("XHS_COOKIE_PATH") {
            self.session.cookie_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("XHS_BROWSER_PATH") {
            self.session.browser_path = Some(PathBuf::from(path));
        }

        if let Ok(endpoint) = std::env::var("XHS_SIGNER_URL") {
            self.signer.endpoint = endpoint;
        }

        if let Ok(proxy) = std::env::var("XHS_PROXY") {
            self.network.proxy = Some(proxy);
        }

        if let Ok(host) = std::env::var("XHS_SERVER_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("XHS_SERVER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::config(format!("Invalid port: {}", e)))?;
        }

        // Conventional proxy variables only fill gaps
        if self.network.https_proxy.is_none() {
            self.network.https_proxy = std::env::var("HTTPS_PROXY").ok();
        }
        if self.network.http_proxy.is_none() {
            self.network.http_proxy = std::env::var("HTTP_PROXY").ok();
        }
        if self.network.all_proxy.is_none() {
            self.network.all_proxy = std::env::var("ALL_PROXY").ok();
        }

        Ok(self)
    }

    /// Proxy to use: explicit, then HTTPS, then HTTP, then ALL
    pub fn get_proxy_url(&self) -> Option<String> {
        let network = &self.network;
        [
            &network.proxy,
            &network.https_proxy,
            &network.http_proxy,
            &network.all_proxy,
        ]
        .into_iter()
        .flatten()
        .find(|p| !p.trim().is_empty())
        .cloned()
    }

    /// Per-request timeout of API calls
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Validate the final configuration
    pub fn validate(&self) -> Result<()> {
        parse_http_url("api.base_url", &self.api.base_url)?;
        parse_http_url("signer.endpoint", &self.signer.endpoint)?;
        parse_http_url("session.home_url", &self.session.home_url)?;

        if self.api.timeout_secs == 0 {
            return Err(Error::config("api.timeout_secs must be greater than 0"));
        }
        if self.signer.timeout_secs == 0 {
            return Err(Error::config("signer.timeout_secs must be greater than 0"));
        }
        if self.defaults.notes_page_size == 0 || self.defaults.sub_comment_page_size == 0 {
            return Err(Error::config("page sizes must be greater than 0"));
        }
        if self.defaults.image_formats.is_empty() {
            return Err(Error::config("defaults.image_formats must not be empty"));
        }
        if let Some(proxy) = self.get_proxy_url() {
            Url::parse(&proxy)
                .map_err(|e| Error::config(format!("Invalid proxy {}: {}", proxy, e)))?;
        }

        Ok(())
    }
}

/// Parse a URL and require an http(s) scheme
pub(crate) fn parse_http_url(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| Error::config(format!("Invalid {}: {}", field, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::config(format!(
            "Invalid {}: unsupported scheme {}",
            field, other
        ))),
    }
}
