//! Upgrade admission.
//!
//! # Responsibilities
//! - Evaluate every incoming request against the routing rule
//! - Log and count each decision
//! - Refuse rejected requests so the connection is dropped without a response
//!
//! # Design Decisions
//! - The check runs before the WebSocket codec sees the request
//! - A rejection is an error, not a status code: the peer gets no bytes back

use std::net::SocketAddr;

use axum::http::Request;
use thiserror::Error;
use tracing::{info, warn};

use crate::net::connection::canonical_ip;
use crate::observability::metrics;
use crate::routing::{RouteDecision, RoutingRule, UpgradeTarget};

/// Why a connection is being torn down before the handshake.
#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("upgrade rejected for host={host} path={path}")]
    Rejected { host: String, path: String },
}

/// Admission check applied to every request on a connection.
#[derive(Debug)]
pub struct Gatekeeper {
    rule: RoutingRule,
}

impl Gatekeeper {
    pub fn new(rule: RoutingRule) -> Self {
        Self { rule }
    }

    /// Decide whether the request may proceed to the handshake.
    pub fn admit<B>(&self, req: &Request<B>, peer: SocketAddr) -> Result<UpgradeTarget, UpgradeError> {
        let target = UpgradeTarget::from_request(req);
        let decision = self.rule.decide(&target);
        metrics::record_upgrade_decision(decision.as_str());

        match decision {
            RouteDecision::Accept(_) => {
                info!(
                    peer_addr = %canonical_ip(peer),
                    host = %target.host,
                    path = %target.path,
                    outcome = %decision,
                    "Upgrade request admitted"
                );
                Ok(target)
            }
            RouteDecision::Reject => {
                warn!(
                    peer_addr = %canonical_ip(peer),
                    host = %target.host,
                    path = %target.path,
                    outcome = %decision,
                    "Upgrade request rejected, aborting connection"
                );
                Err(UpgradeError::Rejected {
                    host: target.host,
                    path: target.path,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingConfig;
    use axum::http::header;

    fn gatekeeper() -> Gatekeeper {
        Gatekeeper::new(RoutingRule::from_config(&RoutingConfig::default()))
    }

    fn request(host: &str, uri: &str) -> Request<()> {
        Request::builder()
            .uri(uri)
            .header(header::HOST, host)
            .body(())
            .unwrap()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn admits_expected_target() {
        let target = gatekeeper()
            .admit(&request("example.com", "/myresource"), peer())
            .unwrap();
        assert_eq!(target, UpgradeTarget::new("example.com", "/myresource"));
    }

    #[test]
    fn admits_with_port_and_query() {
        assert!(gatekeeper()
            .admit(&request("Example.COM:8080", "/myresource?token=1"), peer())
            .is_ok());
    }

    #[test]
    fn admits_loopback_on_any_path() {
        assert!(gatekeeper().admit(&request("localhost:8080", "/anything"), peer()).is_ok());
    }

    #[test]
    fn rejects_wrong_path() {
        let err = gatekeeper()
            .admit(&request("example.com", "/other"), peer())
            .unwrap_err();
        match err {
            UpgradeError::Rejected { host, path } => {
                assert_eq!(host, "example.com");
                assert_eq!(path, "/other");
            }
        }
    }

    #[test]
    fn rejects_missing_host() {
        let req = Request::builder().uri("/myresource").body(()).unwrap();
        assert!(gatekeeper().admit(&req, peer()).is_err());
    }
}
