//! In-memory account store
//!
//! Volatile backend for tests and throwaway instances. Each account sits in
//! its own `DashMap` shard entry; holding that entry's write guard for the
//! whole add/remove gives the same per-account atomicity the SQLite store
//! gets from its transaction. No method ever holds two entries at once.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::models::{Account, AccountFilter, AccountPatch, Relation, SetUpdate};
use super::store::AccountStore;
use crate::error::AppError;

#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<String, Account>,
    /// email -> account id, claimed before the account is inserted
    emails: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn change_relation(
        &self,
        id: &str,
        relation: Relation,
        peer_id: &str,
        insert: bool,
    ) -> SetUpdate {
        let Some(mut account) = self.accounts.get_mut(id) else {
            return SetUpdate::MissingAccount;
        };

        if account.apply(relation, peer_id, insert) {
            SetUpdate::Applied
        } else {
            SetUpdate::Unchanged
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.get(id).map(|account| account.clone()))
    }

    async fn find_one(&self, filter: &AccountFilter) -> Result<Option<Account>, AppError> {
        match filter {
            AccountFilter::Id(id) => self.find_by_id(id).await,
            AccountFilter::Email(email) => {
                let Some(id) = self.emails.get(email).map(|id| id.clone()) else {
                    return Ok(None);
                };
                self.find_by_id(&id).await
            }
        }
    }

    async fn create(&self, account: &Account) -> Result<bool, AppError> {
        match self.emails.entry(account.email.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                if self.accounts.contains_key(&account.id) {
                    return Ok(false);
                }
                slot.insert(account.id.clone());
                self.accounts.insert(account.id.clone(), account.clone());
                Ok(true)
            }
        }
    }

    async fn update_fields(
        &self,
        id: &str,
        patch: &AccountPatch,
    ) -> Result<Option<Account>, AppError> {
        let Some(mut account) = self.accounts.get_mut(id) else {
            return Ok(None);
        };

        if patch.is_empty() {
            return Ok(Some(account.clone()));
        }
        if let Some(name) = &patch.name {
            account.name = name.clone();
        }
        if let Some(dob) = patch.dob {
            account.dob = dob;
        }
        if let Some(password_hash) = &patch.password_hash {
            account.password_hash = password_hash.clone();
        }
        account.updated_at = Utc::now();

        Ok(Some(account.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let Some((_, account)) = self.accounts.remove(id) else {
            return Ok(false);
        };
        self.emails.remove(&account.email);
        Ok(true)
    }

    async fn add_to_relation(
        &self,
        id: &str,
        relation: Relation,
        peer_id: &str,
    ) -> Result<SetUpdate, AppError> {
        Ok(self.change_relation(id, relation, peer_id, true))
    }

    async fn remove_from_relation(
        &self,
        id: &str,
        relation: Relation,
        peer_id: &str,
    ) -> Result<SetUpdate, AppError> {
        Ok(self.change_relation(id, relation, peer_id, false))
    }
}
