//! The edge runtime as seen by the adapter.
//!
//! The hosting platform hands every request its own [`EdgeEnv`], a header
//! enumerator ([`HeaderSource`]), the raw body and an output channel
//! ([`ResponseChannel`]). All of them are passed explicitly: nothing about a
//! request is read from process-wide state, so concurrent requests never
//! observe each other.

pub mod local;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-request environment values published by the platform.
#[derive(Debug, Clone, Default)]
pub struct EdgeEnv {
    /// Raw path including the query string, e.g. `/p/1?color=red`.
    pub path: String,
    /// Pre-serialized JSON object of request headers, when the platform
    /// provides one. Takes precedence over the [`HeaderSource`].
    pub headers_json: Option<String>,
    pub method: String,
    /// Host header, possibly with a `:port` suffix.
    pub host: String,
    pub host_no_port: String,
    pub secure: bool,
    pub static_origin_path: Option<String>,
    /// `Set-Cookie` values collected from proxied upstream fetches, keyed by
    /// the upstream domain.
    pub upstream_set_cookies: Option<IndexMap<String, Vec<String>>>,
    /// Set on cached routes, where responses must not carry cookies.
    pub cookies_disabled: bool,
    /// Status preset by the platform before the handler runs.
    pub response_status: Option<(u16, String)>,
}

/// Enumerates request headers when no JSON blob is available.
pub trait HeaderSource {
    fn header_keys(&self) -> Vec<String>;
    fn header(&self, key: &str) -> Option<String>;
}

/// Payload handed to [`ResponseChannel::send_response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub body: Option<String>,
    pub htmlparsed: bool,
}

/// Output side of the platform.
pub trait ResponseChannel {
    /// Publishes a named value out of the request lifecycle.
    fn export(&mut self, name: &str, value: Value);

    /// Delivers the body.
    fn send_response(&mut self, payload: ResponsePayload);
}

/// Everything needed to build a [`Request`](crate::http::request::Request).
pub struct RequestContext<'a> {
    pub env: &'a EdgeEnv,
    pub headers: &'a dyn HeaderSource,
    pub body: &'a str,
}

impl<'a> RequestContext<'a> {
    pub fn new(env: &'a EdgeEnv, headers: &'a dyn HeaderSource, body: &'a str) -> Self {
        Self { env, headers, body }
    }
}

/// A header source with no headers, for platforms that always send the blob.
pub struct NoHeaders;

impl HeaderSource for NoHeaders {
    fn header_keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn header(&self, _key: &str) -> Option<String> {
        None
    }
}
