//! Low-level HTTP transport — `TradedeskHttp`.
//!
//! One round trip per call, no retries and no caching: the coordinator above
//! this layer owns dedup, TTL, and latency tracking. This type only knows how
//! to put a request on the wire and fold the response into [`ApiError`].

use crate::error::ApiError;
use crate::network::API_KEY_HEADER;
use crate::transport::{Method, Transport};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// `reqwest`-backed [`Transport`] for the Tradedesk REST API.
///
/// Read methods encode the payload's top-level fields as query parameters;
/// mutating methods send it as a JSON body. Every call carries the API key
/// header, plus a bearer token when the coordinator supplies one.
pub struct TradedeskHttp {
    base_url: String,
    api_key: String,
    client: Client,
}

impl TradedeskHttp {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let builder = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: builder.build().expect("Failed to build HTTP client"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint_id: &str) -> String {
        format!("{}/{}", self.base_url, endpoint_id.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for TradedeskHttp {
    async fn send(
        &self,
        method: Method,
        endpoint_id: &str,
        payload: &Value,
        bearer_token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint_url(endpoint_id);
        let reqwest_method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut req = self
            .client
            .request(reqwest_method, &url)
            .header(API_KEY_HEADER, &self.api_key);

        if let Some(token) = bearer_token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        req = if method.is_read() {
            req.query(&query_pairs(payload))
        } else {
            req.json(payload)
        };

        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        parse_body(status.as_u16(), status.is_success(), &text)
    }
}

/// Flatten a payload's top-level fields into query parameters.
///
/// Strings go through unquoted; other scalars and any nested values use
/// their JSON rendering. A null or non-object payload yields no parameters.
fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    let Some(map) = payload.as_object() else {
        return Vec::new();
    };
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let rendered = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), rendered)
        })
        .collect()
}

/// Fold an HTTP response into the normalized result.
///
/// Failure is a non-2xx status or a JSON body carrying an `error` field; the
/// error object's numeric `code` passes through when present. A success
/// status with an unparseable body is transport-class: the backend never
/// produced a usable answer.
fn parse_body(status: u16, success: bool, text: &str) -> Result<Value, ApiError> {
    let body: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            if success {
                return Err(ApiError::Malformed(format!(
                    "invalid JSON in {} response: {}",
                    status, e
                )));
            }
            return Err(ApiError::Backend {
                code: None,
                message: format!("HTTP {}: {}", status, text.trim()),
            });
        }
    };

    if let Some(err_field) = body.get("error") {
        return Err(backend_error(err_field));
    }
    if !success {
        return Err(ApiError::Backend {
            code: None,
            message: format!("HTTP {}", status),
        });
    }
    Ok(body)
}

fn backend_error(err_field: &Value) -> ApiError {
    match err_field {
        Value::Object(obj) => {
            let code = obj.get("code").and_then(Value::as_i64);
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| err_field.to_string());
            ApiError::Backend { code, message }
        }
        Value::String(s) => ApiError::Backend {
            code: None,
            message: s.clone(),
        },
        other => ApiError::Backend {
            code: None,
            message: other.to_string(),
        },
    }
}
