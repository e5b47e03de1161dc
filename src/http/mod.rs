//! HTTP transport layer — `TradedeskHttp`, the production [`Transport`](crate::transport::Transport).

pub mod client;

pub use client::TradedeskHttp;
