//! Request and response DTOs
//!
//! Data Transfer Objects for the `/api/users` endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::data::Account;

/// Registration request
///
/// Every field is optional at the JSON level so a missing one is reported
/// as a validation error rather than a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub dob: Option<NaiveDate>,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Profile update request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
}

/// Password update request
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// Follow / unfollow request naming the target account
#[derive(Debug, Clone, Deserialize)]
pub struct TargetRequest {
    pub id: String,
}

/// Returned by registration and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub token: String,
}

/// Acknowledges a mutation by echoing the affected account ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

/// Account profile (never includes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub dob: NaiveDate,
    pub followers: Vec<String>,
    pub followers_count: i64,
    pub following: Vec<String>,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            dob: account.dob,
            followers: account.followers.into_iter().collect(),
            followers_count: account.followers_count,
            following: account.following.into_iter().collect(),
            following_count: account.following_count,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
