//! Proxy server module.
//!
//! This module provides the interception proxy: per request it consults the
//! scenario store, answers matches from the mock responder, and forwards
//! everything else to the real upstream, optionally recording the exchange.
//!
//! # Module Structure
//!
//! - `server` - ProxyServer struct and accept loop
//! - `handler` - ProxyEngine: the mock-or-forward decision per request
//! - `forwarding` - request forwarding with hop-by-hop header handling
//! - `client` - HTTP client creation and configuration
//! - `headers` - hop-by-hop header stripping
//! - `request_log` - bounded in-memory log of recent requests
//! - `network` - listener utilities

mod client;
mod forwarding;
mod handler;
mod headers;
mod network;
mod request_log;
mod server;

pub use client::{create_http_client, HttpClient};
pub use forwarding::{bad_gateway, forward_request, ForwardError, ForwardedResponse};
pub use handler::ProxyEngine;
pub use headers::{strip_hop_headers, HOP_BY_HOP_HEADERS};
pub use request_log::{LogEntry, RequestLog, DEFAULT_LOG_CAPACITY};
pub use server::ProxyServer;
