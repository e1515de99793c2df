//! HTTP request handlers
//!
//! Thin adapters from query parameters to [`XhsApi`](crate::client::XhsApi)
//! operations. Success is HTTP 200 with code 2000; any failure, including a
//! missing parameter, is HTTP 400 with code 4000 and the error text.
//!
//! Routes take no per-request `proxy` parameter. Every request shares the one
//! client and cookie file configured at startup; the outbound proxy comes
//! from `[network]` settings or the proxy environment variables.

use crate::{Result, server::app::AppState, types::ApiResponse, utils::version};
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};

type HandlerResult = std::result::Result<Json<ApiResponse>, (StatusCode, Json<ApiResponse>)>;

#[derive(Debug, Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub phone: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct UserNotesQuery {
    pub user_id: String,
    pub xsec_token: String,
    pub xsec_source: Option<String>,
    #[serde(default)]
    pub cursor: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteQuery {
    pub note_id: String,
    pub xsec_token: String,
    pub xsec_source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    pub note_id: String,
    pub xsec_token: String,
    #[serde(default)]
    pub cursor: String,
}

#[derive(Debug, Deserialize)]
pub struct SubCommentsQuery {
    pub note_id: String,
    pub comment_id: String,
    pub xsec_token: String,
    #[serde(default)]
    pub cursor: String,
}

/// GET /send_phone_code
pub async fn send_phone_code(
    State(state): State<AppState>,
    query: std::result::Result<Query<PhoneQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(params) = query.map_err(bad_parameters)?;
    respond("send_phone_code", state.api.send_phone_code(&params.phone).await)
}

/// GET /phone_login
pub async fn phone_login(
    State(state): State<AppState>,
    query: std::result::Result<Query<LoginQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(params) = query.map_err(bad_parameters)?;
    respond(
        "phone_login",
        state.api.phone_login(&params.phone, &params.code).await,
    )
}

/// GET /get_user_notes
pub async fn get_user_notes(
    State(state): State<AppState>,
    query: std::result::Result<Query<UserNotesQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(params) = query.map_err(bad_parameters)?;
    respond(
        "get_user_notes",
        state
            .api
            .get_user_notes(
                &params.user_id,
                &params.xsec_token,
                params.xsec_source.as_deref(),
                &params.cursor,
            )
            .await,
    )
}

/// GET /get_note_by_id
pub async fn get_note_by_id(
    State(state): State<AppState>,
    query: std::result::Result<Query<NoteQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(params) = query.map_err(bad_parameters)?;
    respond(
        "get_note_by_id",
        state
            .api
            .get_note_by_id(
                &params.note_id,
                &params.xsec_token,
                params.xsec_source.as_deref(),
            )
            .await,
    )
}

/// GET /get_comment_list
pub async fn get_comment_list(
    State(state): State<AppState>,
    query: std::result::Result<Query<CommentsQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(params) = query.map_err(bad_parameters)?;
    respond(
        "get_comment_list",
        state
            .api
            .get_comment_list(&params.note_id, &params.xsec_token, &params.cursor)
            .await,
    )
}

/// GET /get_sub_comment_list
pub async fn get_sub_comment_list(
    State(state): State<AppState>,
    query: std::result::Result<Query<SubCommentsQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(params) = query.map_err(bad_parameters)?;
    respond(
        "get_sub_comment_list",
        state
            .api
            .get_sub_comment_list(
                &params.note_id,
                &params.comment_id,
                &params.xsec_token,
                &params.cursor,
            )
            .await,
    )
}

/// Ping endpoint for health checks
///
/// GET /ping
pub async fn ping(State(state): State<AppState>) -> Json<ApiResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    tracing::debug!("Ping: uptime={}s", uptime);
    Json(ApiResponse::success(json!({
        "server_uptime": uptime,
        "version": version::get_version(),
    })))
}

fn respond(operation: &str, result: Result<Value>) -> HandlerResult {
    match result {
        Ok(data) => Ok(Json(ApiResponse::success(data))),
        Err(e) => {
            tracing::error!("{} failed: {}", operation, e);
            Err((StatusCode::BAD_REQUEST, Json(ApiResponse::fail(e.to_string()))))
        }
    }
}

fn bad_parameters(rejection: QueryRejection) -> (StatusCode, Json<ApiResponse>) {
    tracing::debug!("Rejected query: {}", rejection);
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::fail(rejection.body_text())),
    )
}

#[cfg(test)]
mod tests {
    use crate::{
        Result,
        client::XhsApi,
        config::Settings,
        server::create_app,
        session::{MemoryCookieStore, NoopRefresher},
        signer::{SignRequest, SignatureHeaders, Signer},
        types::{ApiResponse, Session},
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug)]
    struct FixedSigner;

    #[async_trait]
    impl Signer for FixedSigner {
        async fn sign(&self, _request: &SignRequest<'_>) -> Result<SignatureHeaders> {
            Ok(SignatureHeaders::from([("x-s".to_string(), "fixed".to_string())]))
        }
    }

    fn app_for(server: &MockServer) -> axum::Router {
        let mut settings = Settings::default();
        settings.api.base_url = server.uri();
        let store = MemoryCookieStore::with_session(
            Session::from_pairs([("a1", "device-1")]).unwrap(),
        );
        let api = XhsApi::with_components(
            &settings,
            Arc::new(FixedSigner),
            Arc::new(store),
            Arc::new(NoopRefresher),
        )
        .unwrap();
        create_app(Arc::new(api))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_ping() {
        let server = MockServer::start().await;
        let (status, body) = get(app_for(&server), "/ping").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], ApiResponse::SUCCESS_CODE);
        assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_user_notes_wraps_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sns/web/v1/user_posted"))
            .and(query_param("user_id", "u1"))
            .and(query_param("xsec_source", "pc_note"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"cursor": "c1", "has_more": true, "notes": [{"note_id": "n1"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) =
            get(app_for(&server), "/get_user_notes?user_id=u1&xsec_token=tok").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "code": 2000,
                "data": {"cursor": "c1", "has_more": true, "notes": [{"note_id": "n1"}]},
                "message": "SUCCESS！"
            })
        );
    }

    #[tokio::test]
    async fn test_platform_failure_is_bad_request() {
        let server = MockServer::start().await;
        Mock::given(path("/api/sns/web/v2/login/send_code"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "msg": "rate limited"})),
            )
            .mount(&server)
            .await;

        let (status, body) = get(app_for(&server), "/send_phone_code?phone=13800000000").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ApiResponse::FAIL_CODE);
        assert!(body["message"].as_str().unwrap().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_missing_parameter_is_bad_request() {
        let server = MockServer::start().await;
        let (status, body) = get(app_for(&server), "/get_comment_list?note_id=n1").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ApiResponse::FAIL_CODE);
        assert!(body["message"].as_str().unwrap().contains("xsec_token"));
    }
}
