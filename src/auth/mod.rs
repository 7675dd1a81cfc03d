//! Bearer-token authentication
//!
//! Handles:
//! - Token issuing and validation
//! - Current-account extraction for protected handlers

mod middleware;
pub mod token;

pub use middleware::CurrentAccount;
pub use token::{TokenClaims, TokenIssuer};
