//! Data layer module
//!
//! Handles all account persistence:
//! - `AccountStore` trait used by the services
//! - SQLite backend
//! - In-memory backend

mod database;
mod memory;
mod models;
mod store;

pub use database::Database;
pub use memory::MemoryStore;
pub use models::*;
pub use store::AccountStore;

#[cfg(test)]
pub use store::MockAccountStore;
