//! Upgrade target matching logic.
//!
//! # Responsibilities
//! - Extract the routing-relevant parts of a request (hostname, path)
//! - Match hostname (exact match, case-insensitive)
//! - Match path (exact match, case-sensitive)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110), port is ignored
//! - Path matching is case-sensitive and ignores the query string
//! - No regex to guarantee O(n) matching

use axum::http::uri::Authority;
use axum::http::{header, Request};

/// The routing-relevant view of an upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeTarget {
    /// Lowercased hostname without port.
    pub host: String,
    /// Request path without query string.
    pub path: String,
}

impl UpgradeTarget {
    pub fn new(host: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            host: normalize_host(host.as_ref()),
            path: path.into(),
        }
    }

    /// Read the hostname from the `Host` header, falling back to the URI authority.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().authority().map(Authority::as_str))
            .unwrap_or("");

        Self::new(host, req.uri().path())
    }
}

/// Strip any port and userinfo, and lowercase what remains.
fn normalize_host(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<Authority>() {
        Ok(authority) => authority
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_lowercase(),
        Err(_) => raw.to_lowercase(),
    }
}

/// Trait for matching upgrade targets against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the target matches this condition.
    fn matches(&self, target: &UpgradeTarget) -> bool;
}

/// Matches the hostname.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized the same way request hosts are.
    pub fn new(host: impl AsRef<str>) -> Self {
        Self {
            expected_host: normalize_host(host.as_ref()),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, target: &UpgradeTarget) -> bool {
        target.host == self.expected_host
    }
}

/// Matches the request path exactly.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    path: String,
}

impl PathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for PathMatcher {
    fn matches(&self, target: &UpgradeTarget) -> bool {
        target.path == self.path
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, target: &UpgradeTarget) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");

        assert!(matcher.matches(&UpgradeTarget::new("example.com", "/")));
        assert!(matcher.matches(&UpgradeTarget::new("EXAMPLE.COM", "/"))); // Case insensitive
        assert!(matcher.matches(&UpgradeTarget::new("example.com:8443", "/")));
        assert!(!matcher.matches(&UpgradeTarget::new("other.com", "/")));
        assert!(!matcher.matches(&UpgradeTarget::new("", "/")));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathMatcher::new("/myresource");

        assert!(matcher.matches(&UpgradeTarget::new("example.com", "/myresource")));
        assert!(!matcher.matches(&UpgradeTarget::new("example.com", "/myresource/sub")));
        assert!(!matcher.matches(&UpgradeTarget::new("example.com", "/MyResource")));
        assert!(!matcher.matches(&UpgradeTarget::new("example.com", "")));
    }

    #[test]
    fn test_and_matcher() {
        let matcher = AndMatcher::new(vec![
            Box::new(HostMatcher::new("example.com")),
            Box::new(PathMatcher::new("/myresource")),
        ]);

        assert!(matcher.matches(&UpgradeTarget::new("example.com", "/myresource")));
        assert!(!matcher.matches(&UpgradeTarget::new("example.com", "/wrong")));
        assert!(!matcher.matches(&UpgradeTarget::new("other.com", "/myresource")));
    }

    #[test]
    fn target_from_request_headers() {
        let req = Request::builder()
            .uri("/myresource?token=abc")
            .header("Host", "Example.com:443")
            .body(Body::default())
            .unwrap();

        assert_eq!(
            UpgradeTarget::from_request(&req),
            UpgradeTarget {
                host: "example.com".into(),
                path: "/myresource".into(),
            }
        );
    }

    #[test]
    fn target_from_request_falls_back_to_uri_authority() {
        let req = Request::builder()
            .uri("http://localhost:8080/anything")
            .body(Body::default())
            .unwrap();

        let target = UpgradeTarget::from_request(&req);
        assert_eq!(target.host, "localhost");
        assert_eq!(target.path, "/anything");
    }

    #[test]
    fn ipv6_literal_hosts_lose_brackets_and_port() {
        assert_eq!(UpgradeTarget::new("[::1]:9000", "/").host, "::1");
    }
}
