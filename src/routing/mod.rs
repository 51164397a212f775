//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming upgrade request (Host header, path)
//!     → matcher.rs (UpgradeTarget extraction, host/path conditions)
//!     → router.rs (RoutingRule evaluation)
//!     → Return: Accept(reason) or Reject
//!
//! Rule Compilation (at startup):
//!     RoutingConfig
//!     → expected host AND expected path
//!     → loopback host (any path)
//!     → Freeze as immutable RoutingRule
//! ```
//!
//! # Design Decisions
//! - Rule compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always yields the same decision

pub mod matcher;
pub mod router;

pub use matcher::UpgradeTarget;
pub use router::{AcceptReason, RouteDecision, RoutingRule};
