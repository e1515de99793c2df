//! Signed request execution
//!
//! Builds each outbound call, attaches the session cookies and the signature
//! headers, sends it and decodes the platform envelope. The signature is
//! always computed from the exact request target and body that go on the
//! wire.

use crate::{
    Error, Result,
    config::Settings,
    session::SessionManager,
    signer::{SignRequest, SignatureHeaders, Signer},
    types::{Envelope, QueryParams, Reply, Session},
};
use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// One platform call
#[derive(Debug, Clone, Copy)]
pub enum ApiCall<'a> {
    Get {
        path: &'a str,
        query: &'a QueryParams,
    },
    Post {
        path: &'a str,
        body: &'a Value,
    },
}

impl ApiCall<'_> {
    pub fn path(&self) -> &str {
        match self {
            Self::Get { path, .. } | Self::Post { path, .. } => path,
        }
    }
}

/// Build the outbound HTTP client from settings
///
/// Only the proxy resolved by [`Settings::get_proxy_url`] is used; reqwest's
/// own environment lookup is disabled.
pub fn build_http_client(settings: &Settings) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(settings.api.user_agent.as_str())
        .timeout(settings.request_timeout());

    builder = match settings.get_proxy_url() {
        Some(proxy) => {
            tracing::info!("Routing API calls through proxy {}", proxy);
            builder.proxy(reqwest::Proxy::all(proxy.as_str())?)
        }
        None => builder.no_proxy(),
    };

    Ok(builder.build()?)
}

/// Sends signed calls on behalf of the active session
#[derive(Debug)]
pub struct RequestExecutor {
    http: Client,
    base_url: Url,
    signer: Arc<dyn Signer>,
    sessions: Arc<SessionManager>,
}

impl RequestExecutor {
    pub fn new(
        http: Client,
        base_url: Url,
        signer: Arc<dyn Signer>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            http,
            base_url,
            signer,
            sessions,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send `call` with the given session
    pub async fn execute_as(&self, session: &Session, call: &ApiCall<'_>) -> Result<Reply> {
        match *call {
            ApiCall::Get { path, query } => self.send_get(session, path, query).await,
            ApiCall::Post { path, body } => self.send_post(session, path, body).await,
        }
    }

    /// Signed GET; the query is sent in the order it was signed
    pub async fn get(&self, path: &str, query: &QueryParams) -> Result<Reply> {
        let session = self.resolve_session().await?;
        self.send_get(&session, path, query).await
    }

    /// Signed POST; the body is serialized once and reused for signing and transmission
    pub async fn post(&self, path: &str, body: &Value) -> Result<Reply> {
        let session = self.resolve_session().await?;
        self.send_post(&session, path, body).await
    }

    async fn send_get(&self, session: &Session, path: &str, query: &QueryParams) -> Result<Reply> {
        let url = self.endpoint(path, query)?;
        let uri = request_target(&url);

        let signature = self
            .signer
            .sign(&SignRequest::get(path, &uri, session.device_id(), query))
            .await?;
        let headers = signed_headers(session, &signature)?;

        tracing::debug!("GET {}", uri);
        self.dispatch(self.http.get(url).headers(headers), path)
            .await
    }

    async fn send_post(&self, session: &Session, path: &str, body: &Value) -> Result<Reply> {
        let url = self.endpoint(path, &QueryParams::new())?;
        let body = serde_json::to_string(body)?;

        let signature = self
            .signer
            .sign(&SignRequest::post(path, session.device_id(), &body))
            .await?;
        let mut headers = signed_headers(session, &signature)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!("POST {} ({} bytes)", path, body.len());
        self.dispatch(self.http.post(url).headers(headers).body(body), path)
            .await
    }

    async fn resolve_session(&self) -> Result<Arc<Session>> {
        self.sessions
            .current()
            .await
            .ok_or_else(|| Error::unauthenticated("no session available"))
    }

    fn endpoint(&self, path: &str, query: &QueryParams) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| Error::internal(format!("invalid endpoint path {}: {}", path, e)))?;
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&query.to_query_string()));
        }
        Ok(url)
    }

    async fn dispatch(&self, request: RequestBuilder, path: &str) -> Result<Reply> {
        let response = request.send().await?;
        let status = response.status();
        let set_cookies: Vec<(String, String)> = response
            .cookies()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect();

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::unauthenticated(format!("{} answered 401", path)));
        }
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = response.text().await?;
        let envelope = Envelope::parse(&body)?;
        if envelope.is_session_rejected() {
            return Err(Error::unauthenticated(envelope.failure_message()));
        }

        tracing::debug!(
            "{} answered success={} code={:?}",
            path,
            envelope.success(),
            envelope.code()
        );
        Ok(Reply {
            envelope,
            set_cookies,
        })
    }
}

/// Path plus serialized query, exactly as it appears in the request line
fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn signed_headers(session: &Session, signature: &SignatureHeaders) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in signature {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::signer(format!("invalid header name {}", name)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| Error::signer(format!("invalid value for header {}", name)))?;
        headers.insert(header_name, header_value);
    }

    let cookie = HeaderValue::from_str(&session.cookie_header())
        .map_err(|_| Error::unauthenticated("session cookies are not valid header text"))?;
    headers.insert(COOKIE, cookie);
    Ok(headers)
}
