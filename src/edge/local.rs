//! Local stand-in for the edge platform.
//!
//! The emulator in [`net::server`](crate::net::server) reads plain HTTP/1.1
//! requests, turns them into an [`EdgeEnv`] and records what the adapter
//! exports through [`LocalChannel`], then writes it back as an HTTP/1.1
//! response.

use std::time::SystemTime;

use serde_json::Value;
use tracing::warn;

use crate::config::ServerConfig;
use crate::edge::{EdgeEnv, HeaderSource, ResponseChannel, ResponsePayload};
use crate::error::Result;
use crate::http::headers::Headers;
use crate::http::response::{CacheDirectives, DESCRIPTOR_EXPORT, ResponseDescriptor};
use crate::http::status::reason_phrase;
use crate::net::wire::RawRequest;

impl HeaderSource for RawRequest {
    fn header_keys(&self) -> Vec<String> {
        self.headers.iter().map(|(name, _)| name.clone()).collect()
    }

    fn header(&self, key: &str) -> Option<String> {
        RawRequest::header(self, key).map(str::to_string)
    }
}

/// Builds the per-request environment the platform would publish.
pub fn env_from_raw(req: &RawRequest, cfg: &ServerConfig) -> EdgeEnv {
    let host = req.header("Host").unwrap_or_default().to_string();
    let host_no_port = host.split(':').next().unwrap_or_default().to_string();
    let path_only = req.uri.split('?').next().unwrap_or_default();

    EdgeEnv {
        path: req.uri.clone(),
        headers_json: None,
        method: req.method.as_str().to_string(),
        host,
        host_no_port,
        secure: cfg.secure,
        static_origin_path: Some(cfg.static_files_root.clone()),
        upstream_set_cookies: None,
        cookies_disabled: cfg.is_cached_path(path_only),
        response_status: None,
    }
}

/// Records the exported descriptor and the delivered body.
#[derive(Debug, Default)]
pub struct LocalChannel {
    descriptor: Option<ResponseDescriptor>,
    payload: Option<ResponsePayload>,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The response to write back, if one was sent.
    pub fn into_outgoing(self) -> Option<Outgoing> {
        let descriptor = self.descriptor?;
        let body = self
            .payload
            .and_then(|p| p.body)
            .map(String::into_bytes)
            .unwrap_or_default();

        Some(Outgoing {
            status_code: descriptor.status_code,
            status_text: descriptor.status_text,
            redirect_to: descriptor.redirect_to,
            headers: descriptor.headers,
            cookies: descriptor.cookies,
            cache: descriptor.cache,
            body,
        })
    }
}

impl ResponseChannel for LocalChannel {
    fn export(&mut self, name: &str, value: Value) {
        if name != DESCRIPTOR_EXPORT {
            return;
        }
        match serde_json::from_value::<ResponseDescriptor>(value) {
            Ok(descriptor) => self.descriptor = Some(descriptor),
            Err(err) => warn!("dropping malformed response descriptor: {}", err),
        }
    }

    fn send_response(&mut self, payload: ResponsePayload) {
        self.payload = Some(payload);
    }
}

/// A finished response on its way to the socket.
#[derive(Debug)]
pub struct Outgoing {
    pub status_code: u16,
    pub status_text: String,
    pub redirect_to: Option<String>,
    pub headers: Headers,
    pub cookies: Vec<String>,
    pub cache: CacheDirectives,
    pub body: Vec<u8>,
}

impl Outgoing {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).ok().flatten()
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.headers.set(name, value)
    }

    fn cache_control(&self) -> String {
        let CacheDirectives {
            browser_max_age,
            server_max_age,
        } = self.cache;
        if browser_max_age == 0 && server_max_age == 0 {
            "no-cache".to_string()
        } else {
            format!("max-age={}, s-maxage={}", browser_max_age, server_max_age)
        }
    }

    /// Serializes status line, headers and body.
    pub fn to_bytes(&mut self, server_name: &str) -> Result<Vec<u8>> {
        if let Some(location) = self.redirect_to.clone() {
            self.set_header("Location", location)?;
        }
        if self.header("Cache-Control").is_none() {
            let cache_control = self.cache_control();
            self.set_header("Cache-Control", cache_control)?;
        }
        self.set_header("Date", httpdate::fmt_http_date(SystemTime::now()))?;
        self.set_header("Server", server_name)?;
        let content_length = self.body.len().to_string();
        self.set_header("Content-Length", content_length)?;

        let status_text = if self.status_text.is_empty() || self.redirect_to.is_some() {
            reason_phrase(self.status_code)
        } else {
            self.status_text.as_str()
        };

        // HTTP/1.1 <status> <reason>\r\n
        // <header_name>: <header_value>\r\n
        // ...
        // \r\n
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status_code, status_text);
        head.push_str(&self.headers.stringify());
        for cookie in &self.cookies {
            head.push_str(&format!("set-cookie: {}\r\n", cookie));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        Ok(bytes)
    }
}
