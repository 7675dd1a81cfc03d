//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate the account store and token issuer.

mod account;
mod graph;

pub use account::{AccountService, AuthenticatedAccount, Registration};
pub use graph::{DeletionSummary, FollowGraph};
