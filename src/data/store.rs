//! Account store interface
//!
//! The follow graph only talks to storage through this trait. Set
//! membership changes are single conditional updates scoped to one
//! account, so callers never read a set and write it back.

use async_trait::async_trait;

use super::models::{Account, AccountFilter, AccountPatch, Relation, SetUpdate};
use crate::error::AppError;

/// Persistence backend for accounts and their adjacency sets.
///
/// Implementations must be thread-safe and must apply each
/// `add_to_relation` / `remove_from_relation` call atomically with the
/// matching count update.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load an account with both relationship sets.
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, AppError>;

    /// Load the first account matching `filter`.
    async fn find_one(&self, filter: &AccountFilter) -> Result<Option<Account>, AppError>;

    /// Insert a new account.
    ///
    /// # Returns
    /// `false` if the email is already taken.
    async fn create(&self, account: &Account) -> Result<bool, AppError>;

    /// Apply a field-level patch and return the updated account.
    ///
    /// # Returns
    /// `None` if no account has this id.
    async fn update_fields(
        &self,
        id: &str,
        patch: &AccountPatch,
    ) -> Result<Option<Account>, AppError>;

    /// Delete an account record and its own relationship sets.
    ///
    /// Peers that reference it are left alone.
    ///
    /// # Returns
    /// `true` if a record was removed.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    /// Add `peer_id` to one of `id`'s sets if absent, bumping its count.
    async fn add_to_relation(
        &self,
        id: &str,
        relation: Relation,
        peer_id: &str,
    ) -> Result<SetUpdate, AppError>;

    /// Remove `peer_id` from one of `id`'s sets if present, dropping its count.
    async fn remove_from_relation(
        &self,
        id: &str,
        relation: Relation,
        peer_id: &str,
    ) -> Result<SetUpdate, AppError>;
}
