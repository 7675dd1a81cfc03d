//! Data models
//!
//! Rust structs representing stored accounts and the follow graph.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Follow graph
// =============================================================================

/// One of the two adjacency sets every account carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Accounts that follow this account
    Followers,
    /// Accounts this account follows
    Following,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Followers => "followers",
            Self::Following => "following",
        }
    }

    /// Column holding the cached cardinality of this set
    pub(crate) fn count_column(&self) -> &'static str {
        match self {
            Self::Followers => "followers_count",
            Self::Following => "following_count",
        }
    }

    /// The set on the peer that mirrors this one
    pub fn inverse(&self) -> Self {
        match self {
            Self::Followers => Self::Following,
            Self::Following => Self::Followers,
        }
    }
}

/// Outcome of an atomic add-to-set / remove-from-set on one account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetUpdate {
    /// Membership changed and the count was adjusted
    Applied,
    /// The set already had (or already lacked) the peer
    Unchanged,
    /// The account the set belongs to does not exist
    MissingAccount,
}

// =============================================================================
// Account
// =============================================================================

/// A registered account together with its follow-graph adjacency sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Unique, stored lowercased
    pub email: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub dob: NaiveDate,
    pub followers: BTreeSet<String>,
    pub followers_count: i64,
    pub following: BTreeSet<String>,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Fresh account with empty relationship sets
    pub fn new(name: String, email: String, password_hash: String, dob: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new().0,
            name,
            email,
            password_hash,
            dob,
            followers: BTreeSet::new(),
            followers_count: 0,
            following: BTreeSet::new(),
            following_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn relation(&self, relation: Relation) -> &BTreeSet<String> {
        match relation {
            Relation::Followers => &self.followers,
            Relation::Following => &self.following,
        }
    }

    /// Adds or removes `peer_id` and keeps the cached count in step.
    ///
    /// Returns `true` when membership changed.
    pub(crate) fn apply(&mut self, relation: Relation, peer_id: &str, insert: bool) -> bool {
        let set = match relation {
            Relation::Followers => &mut self.followers,
            Relation::Following => &mut self.following,
        };
        let changed = if insert {
            set.insert(peer_id.to_string())
        } else {
            set.remove(peer_id)
        };

        if changed {
            let len = set.len() as i64;
            match relation {
                Relation::Followers => self.followers_count = len,
                Relation::Following => self.following_count = len,
            }
            self.updated_at = Utc::now();
        }
        changed
    }
}

/// Account columns as stored in SQLite (without the relation sets)
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AccountRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub dob: NaiveDate,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountRow {
    pub(crate) fn into_account(
        self,
        followers: BTreeSet<String>,
        following: BTreeSet<String>,
    ) -> Account {
        Account {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            dob: self.dob,
            followers,
            followers_count: self.followers_count,
            following,
            following_count: self.following_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Lookup key for [`AccountStore::find_one`](super::AccountStore::find_one)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    Id(String),
    Email(String),
}

/// Field-level update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub password_hash: Option<String>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.dob.is_none() && self.password_hash.is_none()
    }
}
