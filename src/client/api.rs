//! Platform operations
//!
//! Every operation makes sure a session exists before its first call and, if
//! the platform rejects the session, refreshes it and retries exactly once.

use crate::{
    Error, Result,
    client::{
        executor::{ApiCall, RequestExecutor, build_http_client},
        pager::{ListQuery, Pager},
    },
    config::{ApiDefaults, Settings, settings::parse_http_url},
    session::{
        CookieStore, FileCookieStore, RefreshOptions, SessionManager, SessionRefresher,
    },
    signer::{RemoteSigner, Signer},
    types::{Page, QueryParams, Reply},
};
use serde_json::{Value, json};
use std::sync::Arc;

const SEND_CODE_PATH: &str = "/api/sns/web/v2/login/send_code";
const CHECK_CODE_PATH: &str = "/api/sns/web/v1/login/check_code";
const LOGIN_CODE_PATH: &str = "/api/sns/web/v1/login/code";
const ACTIVATE_PATH: &str = "/api/sns/web/v1/login/activate";
const USER_POSTED_PATH: &str = "/api/sns/web/v1/user_posted";
const FEED_PATH: &str = "/api/sns/web/v1/feed";
const COMMENT_PAGE_PATH: &str = "/api/sns/web/v2/comment/page";
const SUB_COMMENT_PAGE_PATH: &str = "/api/sns/web/v2/comment/sub/page";

/// Client for the platform's web API
#[derive(Debug)]
pub struct XhsApi {
    executor: RequestExecutor,
    sessions: Arc<SessionManager>,
    defaults: ApiDefaults,
}

impl XhsApi {
    pub fn new(
        executor: RequestExecutor,
        sessions: Arc<SessionManager>,
        defaults: ApiDefaults,
    ) -> Self {
        Self {
            executor,
            sessions,
            defaults,
        }
    }

    /// Wire the production collaborators described by `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let signer: Arc<dyn Signer> = Arc::new(RemoteSigner::from_settings(&settings.signer)?);
        let store: Arc<dyn CookieStore> =
            Arc::new(FileCookieStore::new(&settings.session.cookie_path));
        Self::with_components(settings, signer, store, default_refresher(settings))
    }

    /// Wire custom collaborators; everything else comes from `settings`
    pub fn with_components(
        settings: &Settings,
        signer: Arc<dyn Signer>,
        store: Arc<dyn CookieStore>,
        refresher: Arc<dyn SessionRefresher>,
    ) -> Result<Self> {
        settings.validate()?;

        let mut options = RefreshOptions::new();
        if let Some(proxy) = settings.get_proxy_url() {
            options = options.with_proxy(proxy);
        }
        if let Some(path) = &settings.session.browser_path {
            options = options.with_browser_path(path);
        }

        let sessions = Arc::new(SessionManager::new(store, refresher, options));
        let base_url = parse_http_url("api.base_url", &settings.api.base_url)?;
        let executor = RequestExecutor::new(
            build_http_client(settings)?,
            base_url,
            signer,
            sessions.clone(),
        );

        Ok(Self::new(executor, sessions, settings.defaults.clone()))
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn defaults(&self) -> &ApiDefaults {
        &self.defaults
    }

    /// Request an SMS login code
    pub async fn send_phone_code(&self, phone: &str) -> Result<Value> {
        let query = QueryParams::new()
            .with("phone", phone)
            .with("zone", self.defaults.zone.as_str())
            .with("type", "login");

        let reply = self.call(ApiCall::Get { path: SEND_CODE_PATH, query: &query }).await?;
        if !reply.envelope.success() {
            return Err(Error::login(reply.envelope.failure_message()));
        }

        tracing::info!("Login code sent");
        Ok(reply.envelope.into_value())
    }

    /// Log in with an SMS code and persist the authenticated session
    pub async fn phone_login(&self, phone: &str, code: &str) -> Result<Value> {
        let query = QueryParams::new()
            .with("phone", phone)
            .with("zone", self.defaults.zone.as_str())
            .with("code", code);
        let checked = self.call(ApiCall::Get { path: CHECK_CODE_PATH, query: &query }).await?;
        if !checked.envelope.success() {
            return Err(Error::login(checked.envelope.failure_message()));
        }

        let mobile_token = checked
            .envelope
            .data()
            .and_then(|data| data.get("mobile_token"))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::login("code check returned no mobile_token"))?
            .to_string();

        let body = json!({
            "mobile_token": mobile_token,
            "zone": self.defaults.zone,
            "phone": phone,
        });
        let logged_in = self.call(ApiCall::Post { path: LOGIN_CODE_PATH, body: &body }).await?;
        if !logged_in.envelope.success() {
            return Err(Error::login(logged_in.envelope.failure_message()));
        }

        let issued = checked
            .set_cookies
            .into_iter()
            .chain(logged_in.set_cookies)
            .collect();
        self.persist_cookies(issued).await?;

        tracing::info!("Phone login succeeded");
        Ok(logged_in.envelope.into_value())
    }

    /// Ask the platform to issue `web_session` for the current cookies
    pub async fn activate_web_session(&self) -> Result<Value> {
        let body = json!({});
        let reply = self.call(ApiCall::Post { path: ACTIVATE_PATH, body: &body }).await?;
        reply.envelope.require_success()?;

        self.persist_cookies(reply.set_cookies).await?;
        Ok(reply.envelope.into_value())
    }

    /// One page of a user's posts; returns the `data` payload
    pub async fn get_user_notes(
        &self,
        user_id: &str,
        xsec_token: &str,
        xsec_source: Option<&str>,
        cursor: &str,
    ) -> Result<Value> {
        let query = QueryParams::new()
            .with("num", self.defaults.notes_page_size.to_string())
            .with("cursor", cursor)
            .with("user_id", user_id)
            .with("image_formats", self.defaults.image_formats_csv())
            .with("xsec_token", xsec_token)
            .with(
                "xsec_source",
                xsec_source.unwrap_or(self.defaults.user_notes_source.as_str()),
            );

        let reply = self.call(ApiCall::Get { path: USER_POSTED_PATH, query: &query }).await?;
        reply.envelope.into_data()
    }

    /// Post detail; returns the whole envelope
    pub async fn get_note_by_id(
        &self,
        note_id: &str,
        xsec_token: &str,
        xsec_source: Option<&str>,
    ) -> Result<Value> {
        let body = json!({
            "source_note_id": note_id,
            "image_formats": self.defaults.image_formats,
            "extra": {"need_body_topic": self.defaults.need_body_topic},
            "xsec_source": xsec_source.unwrap_or(self.defaults.note_source.as_str()),
            "xsec_token": xsec_token,
        });

        let reply = self.call(ApiCall::Post { path: FEED_PATH, body: &body }).await?;
        reply.envelope.require_success()?;
        Ok(reply.envelope.into_value())
    }

    /// One page of top-level comments; returns the `data` payload
    pub async fn get_comment_list(
        &self,
        note_id: &str,
        xsec_token: &str,
        cursor: &str,
    ) -> Result<Value> {
        let query = QueryParams::new()
            .with("note_id", note_id)
            .with("cursor", cursor)
            .with("top_comment_id", "")
            .with("image_formats", self.defaults.image_formats_csv())
            .with("xsec_token", xsec_token);

        let reply = self.call(ApiCall::Get { path: COMMENT_PAGE_PATH, query: &query }).await?;
        reply.envelope.into_data()
    }

    /// One page of replies under `comment_id`; returns the `data` payload
    pub async fn get_sub_comment_list(
        &self,
        note_id: &str,
        comment_id: &str,
        xsec_token: &str,
        cursor: &str,
    ) -> Result<Value> {
        let query = QueryParams::new()
            .with("note_id", note_id)
            .with("root_comment_id", comment_id)
            .with("num", self.defaults.sub_comment_page_size.to_string())
            .with("cursor", cursor)
            .with("image_formats", self.defaults.image_formats_csv())
            .with("top_comment_id", "")
            .with("xsec_token", xsec_token);

        let reply = self
            .call(ApiCall::Get { path: SUB_COMMENT_PAGE_PATH, query: &query })
            .await?;
        reply.envelope.into_data()
    }

    pub fn user_notes_pager(
        &self,
        user_id: &str,
        xsec_token: &str,
        xsec_source: Option<&str>,
    ) -> Pager<'_> {
        Pager::new(
            self,
            ListQuery::UserNotes {
                user_id: user_id.to_string(),
                xsec_token: xsec_token.to_string(),
                xsec_source: xsec_source.map(str::to_string),
            },
        )
    }

    pub fn comments_pager(&self, note_id: &str, xsec_token: &str) -> Pager<'_> {
        Pager::new(
            self,
            ListQuery::Comments {
                note_id: note_id.to_string(),
                xsec_token: xsec_token.to_string(),
            },
        )
    }

    pub fn sub_comments_pager(
        &self,
        note_id: &str,
        comment_id: &str,
        xsec_token: &str,
    ) -> Pager<'_> {
        Pager::new(
            self,
            ListQuery::SubComments {
                note_id: note_id.to_string(),
                comment_id: comment_id.to_string(),
                xsec_token: xsec_token.to_string(),
            },
        )
    }

    pub(crate) async fn fetch_page(&self, query: &ListQuery, cursor: &str) -> Result<Page> {
        let data = match query {
            ListQuery::UserNotes {
                user_id,
                xsec_token,
                xsec_source,
            } => {
                self.get_user_notes(user_id, xsec_token, xsec_source.as_deref(), cursor)
                    .await?
            }
            ListQuery::Comments {
                note_id,
                xsec_token,
            } => self.get_comment_list(note_id, xsec_token, cursor).await?,
            ListQuery::SubComments {
                note_id,
                comment_id,
                xsec_token,
            } => {
                self.get_sub_comment_list(note_id, comment_id, xsec_token, cursor)
                    .await?
            }
        };
        Page::from_data(data)
    }

    async fn call(&self, call: ApiCall<'_>) -> Result<Reply> {
        let session = self.sessions.ensure().await?;

        match self.executor.execute_as(&session, &call).await {
            Err(e) if e.is_unauthenticated() => {
                tracing::warn!("{} rejected the session ({}), refreshing", call.path(), e);
                let fresh = self.sessions.refresh_if_stale(&session).await?;
                self.executor.execute_as(&fresh, &call).await
            }
            result => result,
        }
    }

    /// Fold server-issued cookies into a new session and persist it
    async fn persist_cookies(&self, issued: Vec<(String, String)>) -> Result<()> {
        let current = self.sessions.ensure().await?;
        let updated = current.with_cookies(issued);
        self.sessions.replace(updated).await?;
        Ok(())
    }
}

#[cfg(feature = "browser")]
fn default_refresher(settings: &Settings) -> Arc<dyn SessionRefresher> {
    Arc::new(crate::session::BrowserCookieHarvester::from_settings(
        &settings.session,
    ))
}

#[cfg(not(feature = "browser"))]
fn default_refresher(_settings: &Settings) -> Arc<dyn SessionRefresher> {
    Arc::new(crate::session::NoopRefresher)
}
