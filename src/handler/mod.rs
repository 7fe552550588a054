//! Route handling for the local emulator.
//!
//! Each request gets its own [`EdgeEnv`](crate::edge::EdgeEnv),
//! [`Request`] and [`Response`]; the response is finished through a
//! [`LocalChannel`] and handed back to the server as an [`Outgoing`].

mod middleware;
mod responses;
mod router;
mod static_files;

use tracing::warn;

use crate::config::config;
use crate::edge::local::{LocalChannel, Outgoing, env_from_raw};
use crate::edge::{EdgeEnv, RequestContext};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::HttpStatus;
use crate::net::wire::RawRequest;

pub fn handle_request(raw: &RawRequest) -> Outgoing {
    let env = env_from_raw(raw, config());
    let body = String::from_utf8_lossy(&raw.body);
    let ctx = RequestContext::new(&env, raw, &body);

    let mut res = Response::new(&env, LocalChannel::new());
    let req = match Request::from_context(&ctx) {
        Ok(req) => req,
        Err(err) => {
            warn!("{} {}: {}", env.method, env.path, err);
            return handle_error(if err.code() == 400 {
                HttpStatus::BadRequest
            } else {
                HttpStatus::InternalServerError
            });
        }
    };

    if let Err(err) = router::route(&env, &req, &mut res) {
        warn!("{} {}: {}", req.method, req.path, err);
        return handle_error(HttpStatus::InternalServerError);
    }

    match res.into_channel().into_outgoing() {
        Some(mut out) => {
            middleware::apply(&req, &mut out);
            out
        }
        None => {
            warn!("{} {}: handler did not send a response", req.method, req.path);
            handle_error(HttpStatus::InternalServerError)
        }
    }
}

/// Error page for failures that happen before or outside a handler.
pub fn handle_error(status: HttpStatus) -> Outgoing {
    let mut res = Response::new(&EdgeEnv::default(), LocalChannel::new());
    let sent = responses::error_page(&mut res, status);

    match (sent, res.into_channel().into_outgoing()) {
        (Ok(()), Some(out)) => out,
        _ => Outgoing {
            status_code: status.code(),
            status_text: status.reason().to_string(),
            redirect_to: None,
            headers: Default::default(),
            cookies: Vec::new(),
            cache: Default::default(),
            body: Vec::new(),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::http::HttpMethod;

    fn raw(method: HttpMethod, uri: &str, headers: &[(&str, &str)], body: &str) -> RawRequest {
        let mut req = RawRequest::new();
        req.method = method;
        req.uri = uri.to_string();
        req.http_version = (1, 1);
        req.headers = headers
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        req.body = body.as_bytes().to_vec();
        req
    }

    #[test]
    fn test_welcome_page() {
        let out = handle_request(&raw(HttpMethod::Get, "/", &[("Host", "localhost")], ""));
        assert_eq!(out.status_code, 200);
        assert_eq!(out.header("content-type"), Some("text/html; charset=utf-8"));
        assert!(String::from_utf8_lossy(&out.body).contains("Welcome to"));
    }

    #[test]
    fn test_welcome_page_as_amp() {
        let out = handle_request(&raw(HttpMethod::Get, "/?amp=1", &[("Host", "localhost")], ""));
        let body = String::from_utf8(out.body).unwrap();
        assert!(body.contains("<style amp-custom"));
    }

    #[test]
    fn test_method_not_allowed() {
        let out = handle_request(&raw(
            HttpMethod::Delete,
            "/cart",
            &[("Host", "localhost")],
            "",
        ));
        assert_eq!(out.status_code, 405);
    }

    #[test]
    fn test_bad_json_body() {
        let out = handle_request(&raw(
            HttpMethod::Post,
            "/cart",
            &[("Host", "localhost"), ("Content-Type", "application/json")],
            "{oops",
        ));
        assert_eq!(out.status_code, 400);
    }

    #[test]
    fn test_gzip_applied() {
        let out = handle_request(&raw(
            HttpMethod::Get,
            "/",
            &[("Host", "localhost"), ("Accept-Encoding", "gzip")],
            "",
        ));
        assert_eq!(out.header("content-encoding"), Some("gzip"));
        assert_eq!(&out.body[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_error_page() {
        let out = handle_error(HttpStatus::NotFound);
        assert_eq!(out.status_code, 404);
        assert_eq!(out.status_text, "Not Found");
        assert_eq!(String::from_utf8(out.body).unwrap(), "<h1>404 Not Found</h1>");
    }
}
