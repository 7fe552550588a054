use serde_json::Value;

use crate::edge::RequestContext;
use crate::error::{Error, Result};
use crate::http::headers::Headers;
use crate::http::{multipart, query};

/// An inbound request, built once from the platform context and not mutated
/// afterwards.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Query string with its leading `?`, or empty.
    pub search: String,
    pub query: Value,
    pub headers: Headers,
    pub hostname: String,
    pub port: u16,
    /// `http:` or `https:`.
    pub protocol: String,
    /// Parsed according to `content-type`; `None` for other content types.
    pub body: Option<Value>,
}

impl Request {
    pub fn from_context(ctx: &RequestContext<'_>) -> Result<Self> {
        let env = ctx.env;

        let (path, search) = match env.path.split_once('?') {
            Some((path, search)) if !search.is_empty() => (path, format!("?{}", search)),
            Some((path, _)) => (path, String::new()),
            None => (env.path.as_str(), String::new()),
        };

        let port = match env.host.split_once(':') {
            Some((_, port)) if !port.is_empty() => port
                .parse::<u16>()
                .map_err(|_| Error::MalformedHost(env.host.clone()))?,
            _ if env.secure => 443,
            _ => 80,
        };

        let hostname = env.host_no_port.clone();
        let protocol = if hostname == "localhost" || !env.secure {
            "http:"
        } else {
            "https:"
        };

        let headers = read_headers(ctx)?;
        let body = parse_body(&headers, ctx.body)?;

        Ok(Self {
            method: env.method.clone(),
            path: path.to_string(),
            query: query::parse(&search),
            search,
            headers,
            hostname,
            port,
            protocol: protocol.to_string(),
            body,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).ok().flatten()
    }
}

fn read_headers(ctx: &RequestContext<'_>) -> Result<Headers> {
    match ctx.env.headers_json.as_deref() {
        Some(blob) => {
            let map = serde_json::from_str::<indexmap::IndexMap<String, String>>(blob)
                .map_err(|err| Error::HeaderBlob(err.to_string()))?;
            Headers::from_map(map)
        }
        None => {
            let mut headers = Headers::new();
            for key in ctx.headers.header_keys() {
                if let Some(value) = ctx.headers.header(&key) {
                    headers.set(&key, value)?;
                }
            }
            Ok(headers)
        }
    }
}

fn parse_body(headers: &Headers, raw: &str) -> Result<Option<Value>> {
    let Some(content_type) = headers.get("content-type")? else {
        return Ok(None);
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "application/json" => serde_json::from_str(raw)
            .map(Some)
            .map_err(|err| Error::body_parse("application/json", err)),
        "application/x-www-form-urlencoded" => Ok(Some(query::parse(raw))),
        m if m.starts_with("multipart/form-data") => multipart::parse(raw, content_type)
            .map(Some)
            .map_err(|err| match err {
                Error::BodyParse { .. } => err,
                other => Error::body_parse("multipart/form-data", other),
            }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::edge::{EdgeEnv, HeaderSource, NoHeaders};
    use serde_json::json;

    struct MapHeaders(Vec<(&'static str, &'static str)>);

    impl HeaderSource for MapHeaders {
        fn header_keys(&self) -> Vec<String> {
            self.0.iter().map(|(k, _)| k.to_string()).collect()
        }

        fn header(&self, key: &str) -> Option<String> {
            self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
        }
    }

    fn edge_env(path: &str, host: &str, secure: bool) -> EdgeEnv {
        EdgeEnv {
            path: path.to_string(),
            method: "GET".to_string(),
            host: host.to_string(),
            host_no_port: host.split(':').next().unwrap().to_string(),
            secure,
            ..Default::default()
        }
    }

    #[test]
    fn test_path_and_search() {
        let env = edge_env("/a/b?x=1&y=2", "shop.example.com", true);
        let req = Request::from_context(&RequestContext::new(&env, &NoHeaders, "")).unwrap();

        assert_eq!(req.path, "/a/b");
        assert_eq!(req.search, "?x=1&y=2");
        assert_eq!(req.query, json!({"x": "1", "y": "2"}));

        let env = edge_env("/a/b", "shop.example.com", true);
        let req = Request::from_context(&RequestContext::new(&env, &NoHeaders, "")).unwrap();
        assert_eq!(req.path, "/a/b");
        assert_eq!(req.search, "");
        assert_eq!(req.query, json!({}));
    }

    #[test]
    fn test_port_and_protocol() {
        let secure = edge_env("/", "shop.example.com", true);
        let req = Request::from_context(&RequestContext::new(&secure, &NoHeaders, "")).unwrap();
        assert_eq!(req.port, 443);
        assert_eq!(req.protocol, "https:");

        let plain = edge_env("/", "shop.example.com", false);
        let req = Request::from_context(&RequestContext::new(&plain, &NoHeaders, "")).unwrap();
        assert_eq!(req.port, 80);
        assert_eq!(req.protocol, "http:");

        let local = edge_env("/", "localhost:8080", true);
        let req = Request::from_context(&RequestContext::new(&local, &NoHeaders, "")).unwrap();
        assert_eq!(req.port, 8080);
        assert_eq!(req.hostname, "localhost");
        assert_eq!(req.protocol, "http:");

        let empty_port = edge_env("/", "shop.example.com:", true);
        let req = Request::from_context(&RequestContext::new(&empty_port, &NoHeaders, "")).unwrap();
        assert_eq!(req.port, 443);
        assert_eq!(req.hostname, "shop.example.com");

        let bad = edge_env("/", "shop.example.com:http", true);
        assert!(matches!(
            Request::from_context(&RequestContext::new(&bad, &NoHeaders, "")),
            Err(Error::MalformedHost(_))
        ));
    }

    #[test]
    fn test_headers_from_blob_or_source() {
        let mut with_blob = edge_env("/", "shop.example.com", true);
        with_blob.headers_json = Some(r#"{"X-Device":"mobile","Accept":"text/html"}"#.to_string());
        let source = MapHeaders(vec![("x-device", "desktop")]);

        let req = Request::from_context(&RequestContext::new(&with_blob, &source, "")).unwrap();
        assert_eq!(req.header("x-device"), Some("mobile"));
        assert_eq!(req.header("ACCEPT"), Some("text/html"));

        let without = edge_env("/", "shop.example.com", true);
        let req = Request::from_context(&RequestContext::new(&without, &source, "")).unwrap();
        assert_eq!(req.header("X-Device"), Some("desktop"));

        let mut broken = edge_env("/", "shop.example.com", true);
        broken.headers_json = Some("{not json".to_string());
        assert!(matches!(
            Request::from_context(&RequestContext::new(&broken, &source, "")),
            Err(Error::HeaderBlob(_))
        ));
    }

    #[test]
    fn test_json_body() {
        let env = edge_env("/cart", "shop.example.com", true);
        let source = MapHeaders(vec![("Content-Type", "application/json; charset=utf-8")]);

        let req = Request::from_context(&RequestContext::new(
            &env,
            &source,
            r#"{"sku":"x1","qty":2}"#,
        ))
        .unwrap();
        assert_eq!(req.body, Some(json!({"sku": "x1", "qty": 2})));

        let err = Request::from_context(&RequestContext::new(&env, &source, "{sku")).unwrap_err();
        assert!(
            err.to_string()
                .contains("could not parse request body as application/json")
        );
    }

    #[test]
    fn test_form_and_other_bodies() {
        let env = edge_env("/search", "shop.example.com", true);

        let form = MapHeaders(vec![("content-type", "application/x-www-form-urlencoded")]);
        let req =
            Request::from_context(&RequestContext::new(&env, &form, "q=shoes&filter[size]=9"))
                .unwrap();
        assert_eq!(req.body, Some(json!({"q": "shoes", "filter": {"size": "9"}})));

        let text = MapHeaders(vec![("content-type", "text/plain")]);
        let req = Request::from_context(&RequestContext::new(&env, &text, "hello")).unwrap();
        assert_eq!(req.body, None);

        let req = Request::from_context(&RequestContext::new(&env, &NoHeaders, "hello")).unwrap();
        assert_eq!(req.body, None);
    }

    #[test]
    fn test_multipart_body() {
        let env = edge_env("/upload", "shop.example.com", true);
        let source = MapHeaders(vec![("content-type", "multipart/form-data; boundary=xyz")]);
        let body = "--xyz\r\nContent-Disposition: form-data; name=\"email\"\r\n\r\na@b.c\r\n--xyz--\r\n";

        let req = Request::from_context(&RequestContext::new(&env, &source, body)).unwrap();
        assert_eq!(req.body, Some(json!({"email": "a@b.c"})));

        let broken = MapHeaders(vec![("content-type", "multipart/form-data")]);
        let err = Request::from_context(&RequestContext::new(&env, &broken, body)).unwrap_err();
        assert!(
            err.to_string()
                .contains("could not parse request body as multipart/form-data")
        );
    }
}
