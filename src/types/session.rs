//! Session type
//!
//! The authenticated cookie set plus the device identifier it embeds.

use serde::Serialize;
use std::collections::BTreeMap;

/// Cookie carrying the device identifier the signer binds to
pub const DEVICE_ID_COOKIE: &str = "a1";

/// Cookie name to value mapping
pub type CookieMap = BTreeMap<String, String>;

/// A complete cookie session
///
/// A `Session` always carries a non-empty `a1` cookie. Constructors return
/// `None` for anything less, so a partially-populated cookie set can only ever
/// be observed as "no session".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Session {
    cookies: CookieMap,
}

impl Session {
    /// Build a session from a cookie mapping, if it holds a device identifier
    pub fn from_cookies(cookies: CookieMap) -> Option<Self> {
        let has_device_id = cookies
            .get(DEVICE_ID_COOKIE)
            .is_some_and(|value| !value.trim().is_empty());
        has_device_id.then_some(Self { cookies })
    }

    /// Build a session from name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_cookies(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Device identifier used for signing
    pub fn device_id(&self) -> &str {
        // Present by construction
        self.cookies
            .get(DEVICE_ID_COOKIE)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Look up a single cookie
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn cookies(&self) -> &CookieMap {
        &self.cookies
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// A new session holding these cookies plus `updates`, newer values winning
    ///
    /// The receiver is left untouched. Updates that would blank the device
    /// identifier are ignored.
    pub fn with_cookies<I>(&self, updates: I) -> Session
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut cookies = self.cookies.clone();
        for (name, value) in updates {
            if name == DEVICE_ID_COOKIE && value.trim().is_empty() {
                continue;
            }
            cookies.insert(name, value);
        }
        Session { cookies }
    }

    /// Render the `Cookie` request header value
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn into_cookies(self) -> CookieMap {
        self.cookies
    }
}
