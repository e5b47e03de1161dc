//! # Tradedesk SDK
//!
//! Rust client for the Tradedesk REST API, built around an adaptive request
//! coordination layer: identical concurrent requests collapse into one
//! network call, successful responses are cached with a TTL learned from the
//! observed round-trip time, and backend session expiry surfaces as a
//! distinguished signal.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core** — Error taxonomy, network constants, the [`Transport`](transport::Transport) seam.
//! 2. **Coordination** — Fingerprinting, latency tracking, in-flight dedup,
//!    response cache, and the [`RequestCoordinator`](coordinate::RequestCoordinator)
//!    that ties them together. Transport-agnostic and fully testable in-process.
//! 3. **HTTP transport** — `TradedeskHttp`, the `reqwest`-backed transport
//!    (behind the default `http` feature).
//! 4. **High-Level Client** — `TradedeskClient` with a builder, shared
//!    coordinator handle, and auth-token state.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tradedesk_sdk::prelude::*;
//!
//! let client = TradedeskClient::builder()
//!     .base_url("https://api.tradedesk.example.com")
//!     .api_key("...")
//!     .build()?;
//!
//! let balance = client.get("getBalance", &serde_json::json!({"user": "A"})).await?;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Unified SDK error types.
pub mod error;

/// Network constants.
pub mod network;

/// The transport seam: `Method` and the `Transport` trait.
pub mod transport;

// ── Layer 2: Coordination ────────────────────────────────────────────────────

/// Adaptive request coordination: fingerprints, latency-derived TTLs,
/// in-flight dedup, response cache, coordinator.
pub mod coordinate;

// ── Layer 3: HTTP transport ──────────────────────────────────────────────────

/// `reqwest`-backed transport.
#[cfg(feature = "http")]
pub mod http;

// ── Layer 4: High-Level Client ───────────────────────────────────────────────

/// `TradedeskClient` — the primary entry point.
#[cfg(feature = "http")]
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Errors
    pub use crate::error::{ApiError, SESSION_EXPIRED_CODE};

    // Network
    pub use crate::network::DEFAULT_API_URL;

    // Transport seam
    pub use crate::transport::{Method, Transport};

    // Coordination core
    pub use crate::coordinate::{
        fingerprint, CoordinatorConfig, RequestCoordinator, SessionExpiredHook,
    };

    // HTTP transport + high-level client
    #[cfg(feature = "http")]
    pub use crate::client::{TradedeskClient, TradedeskClientBuilder};
    #[cfg(feature = "http")]
    pub use crate::http::TradedeskHttp;
}
