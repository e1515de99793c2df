//! Durable cookie storage
//!
//! A session is persisted as one JSON object mapping cookie names to values.
//! Saving always overwrites the whole record.

use crate::{
    Error, Result,
    types::{CookieMap, Session},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Storage backend for the session record
#[async_trait]
pub trait CookieStore: Send + Sync + std::fmt::Debug {
    /// Load the stored session; `None` when nothing usable is stored
    async fn load(&self) -> Result<Option<Session>>;

    /// Replace the stored session
    async fn save(&self, session: &Session) -> Result<()>;
}

/// Cookie record in a JSON file
#[derive(Debug, Clone)]
pub struct FileCookieStore {
    path: PathBuf,
}

impl FileCookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cookies.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CookieStore for FileCookieStore {
    async fn load(&self) -> Result<Option<Session>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No cookie file at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            tracing::debug!("Cookie file {:?} is empty", self.path);
            return Ok(None);
        }

        let cookies: CookieMap = serde_json::from_str(&content)
            .map_err(|e| Error::cookie_file(&self.path, e.to_string()))?;

        match Session::from_cookies(cookies) {
            Some(session) => {
                tracing::info!(
                    "Loaded session with {} cookies from {:?}",
                    session.len(),
                    self.path
                );
                Ok(Some(session))
            }
            None => {
                tracing::warn!(
                    "Cookie file {:?} has no device identifier, treating as no session",
                    self.path
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(session.cookies())?;
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        tracing::info!(
            "Saved session with {} cookies to {:?}",
            session.len(),
            self.path
        );
        Ok(())
    }
}

/// Process-local store for callers that manage persistence themselves
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    session: RwLock<Option<Session>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn load(&self) -> Result<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }
}
