//! Rewriting of upstream `Set-Cookie` values.
//!
//! When a route proxies a backend, the backend's cookies are scoped to the
//! backend's domain. Before they are relayed to the browser, any `Domain=`
//! attribute is dropped and the cookie is re-emitted once for the upstream
//! domain and, when it differs, once more for the domain serving the app.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

static DOMAIN_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i);\s*domain=[^;]*").expect("DOMAIN_ATTR regex"));

/// Removes every `Domain=` attribute from a `Set-Cookie` value.
pub fn strip_domain(cookie: &str) -> String {
    DOMAIN_ATTR.replace_all(cookie, "").into_owned()
}

/// Inserts `Domain=<domain>` right after the `name=value` pair.
///
/// ```
/// use storefront_edge::http::cookies::inject_domain;
/// assert_eq!(
///     inject_domain("sid=abc; Path=/", "shop.example.com"),
///     "sid=abc; Domain=shop.example.com; Path=/"
/// );
/// assert_eq!(inject_domain("sid=abc", "shop.example.com"), "sid=abc; Domain=shop.example.com");
/// ```
pub fn inject_domain(cookie: &str, domain: &str) -> String {
    let (pair, rest) = match cookie.find(';') {
        Some(i) => (&cookie[..i], &cookie[i + 1..]),
        None => (cookie, ""),
    };
    let rest = rest.trim().trim_end_matches(';').trim_end();

    let mut result = format!("{}; Domain={}", pair.trim(), domain);
    if !rest.is_empty() {
        result.push_str("; ");
        result.push_str(rest);
    }
    result
}

/// Expands the upstream cookie map into the `Set-Cookie` values to send.
///
/// For each cookie the upstream-domain variant comes first, followed by the
/// `hostname` variant if the two domains differ.
pub fn relay_upstream(upstream: &IndexMap<String, Vec<String>>, hostname: &str) -> Result<Vec<String>> {
    let mut relayed = Vec::new();

    for (domain, cookies) in upstream {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(Error::MalformedUpstreamCookies("empty domain"));
        }

        for cookie in cookies {
            if cookie.trim().is_empty() {
                return Err(Error::MalformedUpstreamCookies("empty cookie value"));
            }

            let stripped = strip_domain(cookie);
            relayed.push(inject_domain(&stripped, domain));
            if hostname != domain {
                relayed.push(inject_domain(&stripped, hostname));
            }
        }

        debug!("relayed {} upstream cookie(s) from {}", cookies.len(), domain);
    }

    Ok(relayed)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_strip_domain() {
        assert_eq!(
            strip_domain("sid=abc; Domain=api.example.com; Path=/"),
            "sid=abc; Path=/"
        );
        assert_eq!(strip_domain("sid=abc; path=/; domain=.example.com"), "sid=abc; path=/");
        assert_eq!(strip_domain("sid=abc"), "sid=abc");
    }

    #[test]
    fn test_inject_domain() {
        assert_eq!(
            inject_domain("sid=abc; Path=/", "shop.example.com"),
            "sid=abc; Domain=shop.example.com; Path=/"
        );
        assert_eq!(
            inject_domain("sid=abc; Path=/; HttpOnly;", "shop.example.com"),
            "sid=abc; Domain=shop.example.com; Path=/; HttpOnly"
        );
        assert_eq!(inject_domain("sid=abc", "shop.example.com"), "sid=abc; Domain=shop.example.com");
    }

    #[test]
    fn test_relay_upstream() {
        let mut upstream = IndexMap::new();
        upstream.insert(
            "api.example.com".to_string(),
            vec!["sid=abc; Domain=api.example.com; Path=/".to_string()],
        );

        let relayed = relay_upstream(&upstream, "shop.example.com").unwrap();
        assert_eq!(
            relayed,
            vec![
                "sid=abc; Domain=api.example.com; Path=/",
                "sid=abc; Domain=shop.example.com; Path=/",
            ]
        );

        let same = relay_upstream(&upstream, "api.example.com").unwrap();
        assert_eq!(same, vec!["sid=abc; Domain=api.example.com; Path=/"]);
    }

    #[test]
    fn test_relay_rejects_malformed() {
        let mut upstream = IndexMap::new();
        upstream.insert(" ".to_string(), vec!["a=b".to_string()]);
        assert!(matches!(
            relay_upstream(&upstream, "shop.example.com"),
            Err(Error::MalformedUpstreamCookies(_))
        ));
    }
}
