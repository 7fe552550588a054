//! Outbound response.
//!
//! A [`Response`] is created once per request, mutated by the route handler
//! and finalized exactly once by [`Response::send`], which relays upstream
//! cookies, exports a [`ResponseDescriptor`] and delivers the body through
//! the platform's [`ResponseChannel`]. Any later `send` fails.
//!
//! Header names are folded to lower-case on write, the same way
//! [`Headers`] folds them for requests.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::edge::{EdgeEnv, ResponseChannel, ResponsePayload};
use crate::error::{Error, Result};
use crate::http::cookies;
use crate::http::headers::Headers;
use crate::http::status::HttpStatus;

/// Name under which the descriptor is exported.
pub const DESCRIPTOR_EXPORT: &str = "response";

/// Cache lifetimes in seconds. Zero means no caching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDirectives {
    pub browser_max_age: u32,
    pub server_max_age: u32,
}

/// Snapshot of a response as exported to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDescriptor {
    pub status_code: u16,
    pub status_text: String,
    pub redirect_to: Option<String>,
    pub headers: Headers,
    pub cookies: Vec<String>,
    pub cache: CacheDirectives,
}

pub struct Response<C: ResponseChannel> {
    pub status_code: u16,
    pub status_text: String,
    headers: Headers,
    pub cache: CacheDirectives,
    pub cookies: Vec<String>,
    pub redirect_to: Option<String>,
    relay_upstream_cookies: bool,
    headers_sent: bool,

    hostname: String,
    upstream_set_cookies: Option<IndexMap<String, Vec<String>>>,
    cookies_disabled: bool,
    channel: C,
}

impl<C: ResponseChannel> Response<C> {
    pub fn new(env: &EdgeEnv, channel: C) -> Self {
        let (status_code, status_text) = env
            .response_status
            .clone()
            .unwrap_or_else(|| (HttpStatus::Ok.code(), HttpStatus::Ok.reason().to_string()));

        Self {
            status_code,
            status_text,
            headers: Headers::new(),
            cache: CacheDirectives::default(),
            cookies: Vec::new(),
            redirect_to: None,
            relay_upstream_cookies: true,
            headers_sent: false,
            hostname: env.host_no_port.clone(),
            upstream_set_cookies: env.upstream_set_cookies.clone(),
            cookies_disabled: env.cookies_disabled,
            channel,
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<&mut Self> {
        if self.cookies_disabled && name.eq_ignore_ascii_case("set-cookie") {
            warn!(
                "set-cookie header set on a cached route; cookies are not sent to the browser on cached routes"
            );
        }
        self.headers.set(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).ok().flatten()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn status(&mut self, code: u16, text: impl Into<String>) -> &mut Self {
        self.status_code = code;
        self.status_text = text.into();
        self
    }

    /// Caches the response on the edge for `max_age` seconds; browsers do not
    /// cache it.
    pub fn cache_on_server(&mut self, max_age: u32) -> &mut Self {
        self.cache = CacheDirectives {
            server_max_age: max_age,
            browser_max_age: 0,
        };
        self
    }

    pub fn relay_upstream_cookies(&mut self, relay: bool) -> &mut Self {
        self.relay_upstream_cookies = relay;
        self
    }

    /// Permanent redirect; sends the response.
    pub fn redirect(&mut self, url: &str) -> Result<()> {
        self.redirect_with_status(url, HttpStatus::MovedPermanently.code())
    }

    pub fn redirect_with_status(&mut self, url: &str, status: u16) -> Result<()> {
        if self.headers_sent {
            return Err(Error::AlreadySent);
        }
        if url.trim().is_empty() {
            return Err(Error::MissingRedirectUrl);
        }
        self.redirect_to = Some(url.to_string());
        self.status_code = status;
        self.send(None)
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    pub fn descriptor(&self) -> ResponseDescriptor {
        ResponseDescriptor {
            status_code: self.status_code,
            status_text: self.status_text.clone(),
            redirect_to: self.redirect_to.clone(),
            headers: self.headers.clone(),
            cookies: self.cookies.clone(),
            cache: self.cache,
        }
    }

    pub fn send(&mut self, body: Option<String>) -> Result<()> {
        if self.headers_sent {
            return Err(Error::AlreadySent);
        }

        if self.relay_upstream_cookies {
            if let Some(upstream) = &self.upstream_set_cookies {
                let relayed = cookies::relay_upstream(upstream, &self.hostname)?;
                self.cookies.extend(relayed);
            }
        }

        let descriptor = serde_json::to_value(self.descriptor())?;
        self.channel.export(DESCRIPTOR_EXPORT, descriptor);

        let htmlparsed = body.is_some();
        self.channel.send_response(ResponsePayload { body, htmlparsed });

        self.headers_sent = true;
        Ok(())
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        exports: Vec<(String, Value)>,
        payloads: Vec<ResponsePayload>,
    }

    impl ResponseChannel for Recorder {
        fn export(&mut self, name: &str, value: Value) {
            self.exports.push((name.to_string(), value));
        }

        fn send_response(&mut self, payload: ResponsePayload) {
            self.payloads.push(payload);
        }
    }

    fn env() -> EdgeEnv {
        EdgeEnv {
            path: "/".to_string(),
            method: "GET".to_string(),
            host: "shop.example.com".to_string(),
            host_no_port: "shop.example.com".to_string(),
            secure: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let res = Response::new(&env(), Recorder::default());
        assert_eq!(res.status_code, 200);
        assert_eq!(res.status_text, "OK");
        assert_eq!(res.cache, CacheDirectives::default());
        assert!(!res.headers_sent());

        let mut preset = env();
        preset.response_status = Some((404, "Not Found".to_string()));
        let res = Response::new(&preset, Recorder::default());
        assert_eq!(res.status_code, 404);
        assert_eq!(res.status_text, "Not Found");
    }

    #[test]
    fn test_headers_fold_case() {
        let mut res = Response::new(&env(), Recorder::default());
        res.set("Content-Type", "text/html").unwrap();

        assert_eq!(res.get("content-type"), Some("text/html"));
        assert_eq!(res.get("CONTENT-TYPE"), Some("text/html"));
        assert!(matches!(res.set("", "x"), Err(Error::MissingHeaderName)));
    }

    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` with a subscriber that records formatted events.
    fn captured_logs(f: impl FnOnce()) -> String {
        let logs = Arc::new(Mutex::new(Vec::new()));
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || Capture(writer.clone()))
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);

        let bytes = logs.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_set_cookie_on_cached_route_warns() {
        let mut cached = env();
        cached.cookies_disabled = true;

        let logs = captured_logs(|| {
            let mut res = Response::new(&cached, Recorder::default());
            res.set("Set-Cookie", "a=b").unwrap();
            assert_eq!(res.get("set-cookie"), Some("a=b"));
        });
        assert!(logs.contains("WARN"));
        assert!(logs.contains("set-cookie header set on a cached route"));

        let logs = captured_logs(|| {
            let mut res = Response::new(&env(), Recorder::default());
            res.set("Set-Cookie", "a=b").unwrap();
            res.set("Content-Type", "text/html").unwrap();
        });
        assert!(!logs.contains("set-cookie header set on a cached route"));
    }

    #[test]
    fn test_status_and_cache() {
        let mut res = Response::new(&env(), Recorder::default());
        res.status(201, "Created").cache_on_server(3600);

        assert_eq!(res.status_code, 201);
        assert_eq!(res.status_text, "Created");
        assert_eq!(
            res.cache,
            CacheDirectives {
                browser_max_age: 0,
                server_max_age: 3600
            }
        );
    }

    #[test]
    fn test_send_is_terminal() {
        let mut res = Response::new(&env(), Recorder::default());
        res.send(Some("<html></html>".to_string())).unwrap();
        assert!(res.headers_sent());
        assert!(matches!(res.send(None), Err(Error::AlreadySent)));

        let channel = res.into_channel();
        assert_eq!(channel.payloads.len(), 1);
        assert_eq!(
            channel.payloads[0],
            ResponsePayload {
                body: Some("<html></html>".to_string()),
                htmlparsed: true
            }
        );
    }

    #[test]
    fn test_exported_descriptor() {
        let mut res = Response::new(&env(), Recorder::default());
        res.set("X-Frame-Options", "DENY").unwrap();
        res.cache_on_server(60);
        res.send(None).unwrap();

        let channel = res.into_channel();
        assert_eq!(channel.exports.len(), 1);
        let (name, value) = &channel.exports[0];
        assert_eq!(name, DESCRIPTOR_EXPORT);
        assert_eq!(
            value,
            &json!({
                "statusCode": 200,
                "statusText": "OK",
                "redirectTo": null,
                "headers": {"x-frame-options": "DENY"},
                "cookies": [],
                "cache": {"browserMaxAge": 0, "serverMaxAge": 60},
            })
        );
        assert!(!channel.payloads[0].htmlparsed);
    }

    #[test]
    fn test_redirect() {
        let mut res = Response::new(&env(), Recorder::default());
        assert!(matches!(res.redirect(""), Err(Error::MissingRedirectUrl)));
        assert!(!res.headers_sent());

        res.redirect("/cart").unwrap();
        assert_eq!(res.status_code, 301);
        assert_eq!(res.redirect_to.as_deref(), Some("/cart"));
        assert!(res.headers_sent());

        let mut res = Response::new(&env(), Recorder::default());
        res.redirect_with_status("/login", 302).unwrap();
        assert_eq!(res.status_code, 302);
    }

    #[test]
    fn test_redirect_after_send_leaves_response_alone() {
        let mut res = Response::new(&env(), Recorder::default());
        res.send(Some("<p>done</p>".to_string())).unwrap();

        assert!(matches!(res.redirect("/late"), Err(Error::AlreadySent)));
        assert_eq!(res.status_code, 200);
        assert_eq!(res.redirect_to, None);
        assert_eq!(res.channel().exports.len(), 1);
    }

    #[test]
    fn test_relays_upstream_cookies() {
        let mut upstream = IndexMap::new();
        upstream.insert(
            "api.example.com".to_string(),
            vec!["sid=abc; Domain=api.example.com; Path=/".to_string()],
        );
        let mut proxied = env();
        proxied.upstream_set_cookies = Some(upstream);

        let mut res = Response::new(&proxied, Recorder::default());
        res.send(None).unwrap();
        assert_eq!(
            res.cookies,
            vec![
                "sid=abc; Domain=api.example.com; Path=/",
                "sid=abc; Domain=shop.example.com; Path=/",
            ]
        );

        let mut res = Response::new(&proxied, Recorder::default());
        res.relay_upstream_cookies(false);
        res.send(None).unwrap();
        assert!(res.cookies.is_empty());
    }
}
