//! Upgrade admission rule.
//!
//! # Responsibilities
//! - Hold the compiled routing rule
//! - Decide ACCEPT or REJECT for an upgrade target
//!
//! # Design Decisions
//! - Immutable after construction (shared across connections without locks)
//! - Loopback host is accepted on any path, independent of the exact rule
//! - Explicit Reject rather than silent default

use std::fmt;

use crate::config::RoutingConfig;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathMatcher, UpgradeTarget};

/// Why a target was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptReason {
    /// Host and path both matched the expected values.
    ExactMatch,
    /// Host is the loopback host; path was not checked.
    Loopback,
}

/// Outcome of evaluating a target against the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Accept(AcceptReason),
    Reject,
}

impl RouteDecision {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDecision::Accept(AcceptReason::ExactMatch) => "accept",
            RouteDecision::Accept(AcceptReason::Loopback) => "accept_loopback",
            RouteDecision::Reject => "reject",
        }
    }
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The process-wide routing rule.
#[derive(Debug)]
pub struct RoutingRule {
    expected: AndMatcher,
    loopback: HostMatcher,
}

impl RoutingRule {
    pub fn new(expected_host: &str, expected_path: &str, loopback_host: &str) -> Self {
        Self {
            expected: AndMatcher::new(vec![
                Box::new(HostMatcher::new(expected_host)),
                Box::new(PathMatcher::new(expected_path)),
            ]),
            loopback: HostMatcher::new(loopback_host),
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::new(
            &config.expected_host,
            &config.expected_path,
            &config.loopback_host,
        )
    }

    /// Evaluate a target. Exact match is checked first so logs show the stronger reason.
    pub fn decide(&self, target: &UpgradeTarget) -> RouteDecision {
        if self.expected.matches(target) {
            RouteDecision::Accept(AcceptReason::ExactMatch)
        } else if self.loopback.matches(target) {
            RouteDecision::Accept(AcceptReason::Loopback)
        } else {
            RouteDecision::Reject
        }
    }
}
