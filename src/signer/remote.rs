//! Signer backed by a local signing service
//!
//! The service receives `{"method", "uri", "a1", "body"}` and answers
//! `{"headers": {"x-s": "...", "x-t": "...", ...}}`.

use crate::{
    Error, Result,
    config::settings::{SignerSettings, parse_http_url},
    signer::{SignRequest, SignatureHeaders, Signer},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
struct SignPayload<'a> {
    method: &'a str,
    uri: &'a str,
    a1: &'a str,
    body: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SignReply {
    headers: BTreeMap<String, Value>,
}

/// HTTP client of the signing service
#[derive(Debug, Clone)]
pub struct RemoteSigner {
    client: Client,
    endpoint: Url,
}

impl RemoteSigner {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn from_settings(settings: &SignerSettings) -> Result<Self> {
        let endpoint = parse_http_url("signer.endpoint", &settings.endpoint)?;
        // The signing service is local; never route it through the API proxy
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self::new(client, endpoint))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Signer for RemoteSigner {
    async fn sign(&self, request: &SignRequest<'_>) -> Result<SignatureHeaders> {
        let payload = SignPayload {
            method: request.method.as_str(),
            uri: request.uri,
            a1: request.device_id,
            body: request.body,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::signer(format!("signing service unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::signer(format!("signing service returned {}", status)));
        }

        let reply: SignReply = response
            .json()
            .await
            .map_err(|e| Error::signer(format!("unexpected signing service reply: {}", e)))?;

        let mut headers = SignatureHeaders::new();
        for (name, value) in reply.headers {
            match value {
                Value::String(value) if !value.is_empty() => {
                    headers.insert(name, value);
                }
                Value::Number(value) => {
                    headers.insert(name, value.to_string());
                }
                _ => return Err(Error::signer(format!("header {} has no usable value", name))),
            }
        }

        if headers.is_empty() {
            return Err(Error::signer("signing service returned no headers"));
        }

        tracing::debug!(
            "Signed {} {} ({} headers)",
            request.method,
            request.path,
            headers.len()
        );
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QueryParams;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn signer_for(server: &MockServer) -> RemoteSigner {
        let settings = SignerSettings {
            endpoint: format!("{}/sign", server.uri()),
            timeout_secs: 5,
        };
        RemoteSigner::from_settings(&settings).unwrap()
    }

    #[tokio::test]
    async fn test_sign_get_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sign"))
            .and(body_json(json!({
                "method": "GET",
                "uri": "/api/sns/web/v2/login/send_code?phone=13800000000&zone=86&type=login",
                "a1": "device-1",
                "body": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "headers": {"x-s": "XYW_signature", "x-t": 1767926762050u64}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let signer = signer_for(&server).await;
        let query = QueryParams::new()
            .with("phone", "13800000000")
            .with("zone", "86")
            .with("type", "login");
        let request = SignRequest::get(
            "/api/sns/web/v2/login/send_code",
            "/api/sns/web/v2/login/send_code?phone=13800000000&zone=86&type=login",
            "device-1",
            &query,
        );

        let headers = signer.sign(&request).await.unwrap();
        assert_eq!(headers.get("x-s").map(String::as_str), Some("XYW_signature"));
        assert_eq!(headers.get("x-t").map(String::as_str), Some("1767926762050"));
    }

    #[tokio::test]
    async fn test_sign_post_forwards_exact_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sign"))
            .and(body_json(json!({
                "method": "POST",
                "uri": "/api/sns/web/v1/feed",
                "a1": "device-1",
                "body": "{\"source_note_id\":\"n1\"}"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"headers": {"x-s": "sig"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let signer = signer_for(&server).await;
        let request =
            SignRequest::post("/api/sns/web/v1/feed", "device-1", r#"{"source_note_id":"n1"}"#);
        let headers = signer.sign(&request).await.unwrap();
        assert_eq!(headers.len(), 1);
    }

    #[tokio::test]
    async fn test_service_failure_is_signer_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let signer = signer_for(&server).await;
        let request = SignRequest::post("/api/sns/web/v1/feed", "device-1", "{}");
        let err = signer.sign(&request).await.unwrap_err();
        assert!(matches!(err, Error::Signer(_)));
    }

    #[tokio::test]
    async fn test_empty_headers_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"headers": {}})))
            .mount(&server)
            .await;

        let signer = signer_for(&server).await;
        let request = SignRequest::post("/api/sns/web/v1/feed", "device-1", "{}");
        assert!(signer.sign(&request).await.is_err());
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let settings = SignerSettings {
            endpoint: "unix:///tmp/sign.sock".to_string(),
            timeout_secs: 5,
        };
        assert!(RemoteSigner::from_settings(&settings).is_err());
    }
}
