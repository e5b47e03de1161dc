//! High-level client — `TradedeskClient` with builder and shared coordinator.
//!
//! Endpoints are generic `(endpoint id, payload)` pairs; response-shape
//! mapping belongs to the application layer. This module keeps the builder,
//! the shared coordination state, and thin `get`/`post` conveniences.

use crate::coordinate::{CoordinatorConfig, RequestCoordinator, SessionExpiredHook};
use crate::error::ApiError;
use crate::http::TradedeskHttp;
use crate::transport::{Method, Transport};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// The primary entry point for the Tradedesk SDK.
///
/// Cloning shares the underlying coordinator, so every clone sees the same
/// cache, latency history, and in-flight table — required for dedup to work
/// across independent callers.
pub struct TradedeskClient {
    coordinator: Arc<RequestCoordinator>,
}

impl TradedeskClient {
    pub fn builder() -> TradedeskClientBuilder {
        TradedeskClientBuilder::default()
    }

    /// Execute a request through the coordination layer.
    ///
    /// The per-call token, when given, overrides the held token.
    pub async fn execute(
        &self,
        endpoint_id: &str,
        payload: &Value,
        method: Method,
        auth_token: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.coordinator
            .execute(endpoint_id, payload, method, auth_token)
            .await
    }

    /// `execute` with `Method::Get` and the held token.
    pub async fn get(&self, endpoint_id: &str, payload: &Value) -> Result<Value, ApiError> {
        self.execute(endpoint_id, payload, Method::Get, None).await
    }

    /// `execute` with `Method::Post` and the held token.
    pub async fn post(&self, endpoint_id: &str, payload: &Value) -> Result<Value, ApiError> {
        self.execute(endpoint_id, payload, Method::Post, None).await
    }

    /// [`get`](Self::get) deserialized into a typed response.
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        endpoint_id: &str,
        payload: &Value,
    ) -> Result<T, ApiError> {
        let body = self.get(endpoint_id, payload).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// [`post`](Self::post) deserialized into a typed response.
    pub async fn post_as<T: DeserializeOwned>(
        &self,
        endpoint_id: &str,
        payload: &Value,
    ) -> Result<T, ApiError> {
        let body = self.post(endpoint_id, payload).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Set the bearer token attached to subsequent calls.
    pub async fn set_auth_token(&self, token: impl Into<String>) {
        self.coordinator.set_auth_token(Some(token.into())).await;
    }

    /// Clear the held bearer token.
    pub async fn clear_auth_token(&self) {
        self.coordinator.clear_auth_token().await;
    }

    /// Drop every cached response.
    pub async fn clear_cache(&self) {
        self.coordinator.clear_cache().await;
    }

    /// Direct handle to the coordinator, for callers that need TTL
    /// introspection or want to share it without the client wrapper.
    pub fn coordinator(&self) -> &Arc<RequestCoordinator> {
        &self.coordinator
    }
}

impl Clone for TradedeskClient {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct TradedeskClientBuilder {
    base_url: String,
    api_key: String,
    config: CoordinatorConfig,
    auth_token: Option<String>,
    on_session_expired: Option<SessionExpiredHook>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for TradedeskClientBuilder {
    fn default() -> Self {
        Self {
            base_url: crate::network::DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            config: CoordinatorConfig::default(),
            auth_token: None,
            on_session_expired: None,
            transport: None,
        }
    }
}

impl TradedeskClientBuilder {
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.api_key = key.to_string();
        self
    }

    /// TTL used before any latency observation exists for a fingerprint.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Deadline for callers waiting behind an identical in-flight request.
    pub fn lock_wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.lock_wait_timeout = timeout;
        self
    }

    /// Replace the whole coordination config.
    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Pre-set a bearer token on construction.
    pub fn auth_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    /// Callback invoked when the backend reports an expired session.
    pub fn on_session_expired(mut self, hook: SessionExpiredHook) -> Self {
        self.on_session_expired = Some(hook);
        self
    }

    /// Substitute the transport (tests, instrumentation). Defaults to
    /// [`TradedeskHttp`] against `base_url`/`api_key`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<TradedeskClient, ApiError> {
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(TradedeskHttp::new(&self.base_url, &self.api_key)),
        };

        let mut coordinator = RequestCoordinator::new(transport, self.config);
        if let Some(hook) = self.on_session_expired {
            coordinator = coordinator.with_session_expired_hook(hook);
        }
        let coordinator = Arc::new(coordinator);

        let client = TradedeskClient { coordinator };
        if let Some(token) = self.auth_token {
            client.coordinator.seed_auth_token(token);
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = TradedeskClient::builder();
        assert_eq!(builder.base_url, crate::network::DEFAULT_API_URL);
        assert!(builder.auth_token.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_one_coordinator() {
        let client = TradedeskClient::builder()
            .base_url("https://api.example.com")
            .api_key("key")
            .build()
            .unwrap();
        let clone = client.clone();
        assert!(Arc::ptr_eq(client.coordinator(), clone.coordinator()));
    }
}
