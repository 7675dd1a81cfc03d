//! Account service
//!
//! Registration, login and field-level profile updates. Relationship sets
//! are never written here; see [`FollowGraph`](super::FollowGraph).

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::NaiveDate;

use crate::auth::TokenIssuer;
use crate::data::{Account, AccountFilter, AccountPatch, AccountStore};
use crate::error::AppError;
use crate::metrics::{ACCOUNTS_REGISTERED_TOTAL, LOGINS_TOTAL};

/// Registration input
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub dob: NaiveDate,
}

/// Account identity plus a freshly issued token
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account: Account,
    pub token: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn normalize_required(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
    .map_err(AppError::from)
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)?;
        Ok::<_, argon2::password_hash::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
    .map_err(AppError::from)
}

/// Account service
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    tokens: Arc<TokenIssuer>,
}

impl AccountService {
    /// Create new account service
    pub fn new(store: Arc<dyn AccountStore>, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    /// Register a new account with empty relationship sets
    ///
    /// # Errors
    /// `Validation` if a field is blank or the email is taken
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<AuthenticatedAccount, AppError> {
        let (Some(name), Some(email)) = (
            normalize_required(&registration.name),
            normalize_required(&normalize_email(&registration.email)),
        ) else {
            return Err(AppError::Validation("please add all fields".to_string()));
        };
        if registration.password.is_empty() {
            return Err(AppError::Validation("please add all fields".to_string()));
        }

        // Fast-path guard before expensive hashing.
        if self
            .store
            .find_one(&AccountFilter::Email(email.clone()))
            .await?
            .is_some()
        {
            return Err(AppError::Validation("account already exists".to_string()));
        }

        let password_hash = hash_password(registration.password).await?;
        let account = Account::new(name, email, password_hash, registration.dob);

        if !self.store.create(&account).await? {
            return Err(AppError::Validation("account already exists".to_string()));
        }

        ACCOUNTS_REGISTERED_TOTAL.inc();
        tracing::info!(account = %account.id, "Account registered");

        let token = self.tokens.issue(&account.id)?;
        Ok(AuthenticatedAccount { account, token })
    }

    /// Check credentials and issue a new token
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown email or wrong password
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedAccount, AppError> {
        let account = self
            .store
            .find_one(&AccountFilter::Email(normalize_email(email)))
            .await?;

        let Some(account) = account else {
            LOGINS_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), account.password_hash.clone()).await? {
            LOGINS_TOTAL.with_label_values(&["rejected"]).inc();
            tracing::debug!(account = %account.id, "Login rejected");
            return Err(AppError::InvalidCredentials);
        }

        LOGINS_TOTAL.with_label_values(&["accepted"]).inc();
        let token = self.tokens.issue(&account.id)?;
        Ok(AuthenticatedAccount { account, token })
    }

    /// Get an account with its relationship sets
    pub async fn get_profile(&self, account_id: &str) -> Result<Account, AppError> {
        self.store
            .find_by_id(account_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Update display name and/or date of birth
    ///
    /// Omitted fields are left unchanged; a blank name is rejected.
    pub async fn update_profile(
        &self,
        account_id: &str,
        name: Option<String>,
        dob: Option<NaiveDate>,
    ) -> Result<Account, AppError> {
        let name = match name {
            Some(name) => Some(
                normalize_required(&name)
                    .ok_or_else(|| AppError::Validation("name cannot be empty".to_string()))?,
            ),
            None => None,
        };

        let patch = AccountPatch {
            name,
            dob,
            password_hash: None,
        };

        self.store
            .update_fields(account_id, &patch)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Replace the password hash
    pub async fn update_password(
        &self,
        account_id: &str,
        password: String,
    ) -> Result<Account, AppError> {
        if password.is_empty() {
            return Err(AppError::Validation("password cannot be empty".to_string()));
        }

        let patch = AccountPatch {
            password_hash: Some(hash_password(password).await?),
            ..AccountPatch::default()
        };

        let account = self
            .store
            .update_fields(account_id, &patch)
            .await?
            .ok_or(AppError::NotFound)?;
        tracing::info!(account = %account_id, "Password changed");
        Ok(account)
    }
}
