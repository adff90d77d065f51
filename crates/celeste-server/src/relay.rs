//! Chat-completion relay.
//!
//! Validates a completion request from the UI, swaps the caller's key for an
//! `Authorization` header and forwards the rest of the body upstream. The
//! upstream answer comes back unchanged: error bodies whole, successful
//! responses as a live byte stream.

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::Response;
use futures::TryStreamExt;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{KeyPolicy, ServerConfig};
use crate::error::ServerError;

/// Body field carrying a caller-supplied API key. Never forwarded.
const API_KEY_FIELD: &str = "apiKey";

const DEFAULT_ERROR_CONTENT_TYPE: &str = "application/json";
const DEFAULT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// A validated request, ready to send upstream.
#[derive(Debug)]
pub struct UpstreamRequest {
    pub key: String,
    pub body: Map<String, Value>,
}

/// Validate a raw request body and resolve the key to send upstream.
///
/// The returned body no longer contains `apiKey`; every other field is kept
/// as-is.
pub fn prepare_request(
    raw: &[u8],
    server_key: Option<&str>,
    policy: KeyPolicy,
) -> Result<UpstreamRequest, ServerError> {
    let parsed: Value = serde_json::from_slice(raw).map_err(|_| ServerError::InvalidJson)?;

    // Valid JSON that is not an object has no model or messages either.
    let Value::Object(mut body) = parsed else {
        return Err(ServerError::MissingFields);
    };

    if !is_truthy(body.get("model")) || !is_truthy(body.get("messages")) {
        return Err(ServerError::MissingFields);
    }

    let client_key = match body.remove(API_KEY_FIELD) {
        Some(Value::String(key)) if !key.is_empty() => Some(key),
        _ => None,
    };
    let server_key = server_key.filter(|k| !k.is_empty()).map(str::to_owned);

    let key = match policy {
        KeyPolicy::ClientFirst => client_key.or(server_key).ok_or(ServerError::NoApiKey)?,
        KeyPolicy::ServerOnly => server_key.ok_or(ServerError::Misconfigured)?,
    };

    Ok(UpstreamRequest { key, body })
}

/// JavaScript truthiness, which is what the UI's request contract was written against.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Forwards completion requests to one upstream endpoint.
#[derive(Clone)]
pub struct Relay {
    client: reqwest::Client,
    upstream_url: String,
    server_key: Option<String>,
    policy: KeyPolicy,
}

impl Relay {
    pub fn new(client: reqwest::Client, config: &ServerConfig) -> Self {
        Self {
            client,
            upstream_url: config.upstream_url.clone(),
            server_key: config.api_key.clone(),
            policy: config.key_policy,
        }
    }

    /// Handle one `POST /api/query` body end to end.
    pub async fn forward(&self, raw: &[u8]) -> Result<Response, ServerError> {
        let request = prepare_request(raw, self.server_key.as_deref(), self.policy)?;

        let model = request
            .body
            .get("model")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("?");
        debug!(
            model,
            upstream = %self.upstream_url,
            "Relaying completion request"
        );

        let upstream = self
            .client
            .post(&self.upstream_url)
            .bearer_auth(&request.key)
            .json(&request.body)
            .send()
            .await?;

        let status = upstream.status();
        let content_type = upstream.headers().get(CONTENT_TYPE).cloned();

        if !status.is_success() {
            let text = upstream.bytes().await?;
            warn!(status = %status, bytes = text.len(), "Upstream returned an error");

            let mut response = Response::new(Body::from(text));
            *response.status_mut() = status;
            response.headers_mut().insert(
                CONTENT_TYPE,
                content_type
                    .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ERROR_CONTENT_TYPE)),
            );
            return Ok(response);
        }

        // Piped chunk by chunk; dropping the response body (caller gone)
        // drops the upstream connection with it.
        let stream = upstream
            .bytes_stream()
            .inspect_err(|e| warn!(error = %e, "Upstream stream interrupted"));

        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = status;

        // Only these two headers go out; upstream infrastructure headers stay behind.
        let headers = response.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            content_type.unwrap_or_else(|| HeaderValue::from_static(DEFAULT_STREAM_CONTENT_TYPE)),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

        Ok(response)
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("upstream_url", &self.upstream_url)
            .field("server_key", &self.server_key.as_ref().map(|_| "<redacted>"))
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn prepare(
        body: &str,
        server_key: Option<&str>,
        policy: KeyPolicy,
    ) -> Result<UpstreamRequest, ServerError> {
        prepare_request(body.as_bytes(), server_key, policy)
    }

    #[test]
    fn test_invalid_json() {
        let err = prepare("model=gpt", Some("sk"), KeyPolicy::ClientFirst).unwrap_err();
        assert!(matches!(err, ServerError::InvalidJson));
    }

    #[test]
    fn test_missing_fields() {
        for body in [
            "{}",
            r#"{"model":"m"}"#,
            r#"{"messages":[]}"#,
            r#"{"model":"","messages":[]}"#,
            r#"{"model":"m","messages":null}"#,
            "[]",
            "42",
        ] {
            let err = prepare(body, Some("sk"), KeyPolicy::ClientFirst).unwrap_err();
            assert!(matches!(err, ServerError::MissingFields), "body {body}");
        }
    }

    #[test]
    fn test_empty_messages_array_is_present() {
        let req = prepare(
            r#"{"model":"m","messages":[]}"#,
            Some("sk"),
            KeyPolicy::ClientFirst,
        );
        assert!(req.is_ok());
    }

    #[test]
    fn test_client_key_preferred_and_stripped() {
        let req = prepare(
            r#"{"model":"m","messages":[{"role":"user","content":"hi"}],"apiKey":"sk-client","stream":true,"temperature":0.2}"#,
            Some("sk-server"),
            KeyPolicy::ClientFirst,
        )
        .unwrap();

        assert_eq!(req.key, "sk-client");
        assert!(!req.body.contains_key("apiKey"));
        assert_eq!(req.body["stream"], json!(true));
        assert_eq!(req.body["temperature"], json!(0.2));
        assert_eq!(req.body["model"], json!("m"));
    }

    #[test]
    fn test_server_key_fallback() {
        for body in [
            r#"{"model":"m","messages":[1]}"#,
            r#"{"model":"m","messages":[1],"apiKey":""}"#,
            r#"{"model":"m","messages":[1],"apiKey":null}"#,
        ] {
            let req = prepare(body, Some("sk-server"), KeyPolicy::ClientFirst).unwrap();
            assert_eq!(req.key, "sk-server");
            assert!(!req.body.contains_key("apiKey"));
        }
    }

    #[test]
    fn test_no_key_anywhere() {
        let body = r#"{"model":"m","messages":[1]}"#;

        let err = prepare(body, None, KeyPolicy::ClientFirst).unwrap_err();
        assert!(matches!(err, ServerError::NoApiKey));

        let err = prepare(body, Some(""), KeyPolicy::ClientFirst).unwrap_err();
        assert!(matches!(err, ServerError::NoApiKey));
    }

    #[test]
    fn test_server_only_policy() {
        let body = r#"{"model":"m","messages":[1],"apiKey":"sk-client"}"#;

        let req = prepare(body, Some("sk-server"), KeyPolicy::ServerOnly).unwrap();
        assert_eq!(req.key, "sk-server");
        assert!(!req.body.contains_key("apiKey"));

        let err = prepare(body, None, KeyPolicy::ServerOnly).unwrap_err();
        assert!(matches!(err, ServerError::Misconfigured));
    }

    #[test]
    fn test_debug_redacts_server_key() {
        let config = ServerConfig {
            api_key: Some("sk-very-secret".into()),
            ..ServerConfig::default()
        };
        let relay = Relay::new(reqwest::Client::new(), &config);

        let rendered = format!("{relay:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(is_truthy(Some(&json!(1))));
        assert!(is_truthy(Some(&json!("x"))));
        assert!(is_truthy(Some(&json!([]))));
        assert!(is_truthy(Some(&json!({}))));
    }
}
