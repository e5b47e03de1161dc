//! Network constants for the Tradedesk SDK.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.tradedesk.example.com";

/// Header carrying the API key on every outbound call.
pub const API_KEY_HEADER: &str = "x-api-key";
