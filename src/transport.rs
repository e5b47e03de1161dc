//! Transport seam between the coordinator and the wire.
//!
//! The coordinator never talks to `reqwest` directly; it drives a [`Transport`]
//! object. The production implementation is [`TradedeskHttp`](crate::http::TradedeskHttp)
//! (behind the `http` feature); tests substitute an in-process mock.

use crate::error::ApiError;
use async_trait::async_trait;
use serde_json::Value;

/// HTTP method of an outbound request.
///
/// Only `Get` is a read: read results are cacheable and dedup waiters may
/// consume them; mutating methods are never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Whether the method is non-mutating (eligible for response caching).
    pub fn is_read(self) -> bool {
        matches!(self, Method::Get)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One network round trip: endpoint + payload in, parsed JSON body out.
///
/// Implementations fold transport failures, malformed bodies, and structured
/// backend rejections into [`ApiError`]; they do not retry, cache, or
/// deduplicate — that is the coordinator's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        endpoint_id: &str,
        payload: &Value,
        bearer_token: Option<&str>,
    ) -> Result<Value, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_get_is_a_read() {
        assert!(Method::Get.is_read());
        assert!(!Method::Post.is_read());
        assert!(!Method::Put.is_read());
        assert!(!Method::Patch.is_read());
        assert!(!Method::Delete.is_read());
    }
}
