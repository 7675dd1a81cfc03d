//! API layer
//!
//! HTTP handlers for:
//! - Account and follow-graph endpoints
//! - Metrics (Prometheus)

mod dto;
pub mod metrics;
mod users;

pub use dto::*;

pub use metrics::metrics_router;
pub use users::users_router;
