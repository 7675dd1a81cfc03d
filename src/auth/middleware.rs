//! Authentication extractor
//!
//! Protects routes that require an authenticated account.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::error::AppError;

const TOKEN_COOKIE: &str = "token";

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(TOKEN_COOKIE).map(|cookie| cookie.value().to_owned())
        })
}

/// Extractor for the authenticated account's ID
///
/// The token must verify and the account must still exist; a token for a
/// deleted account is rejected.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentAccount(account_id): CurrentAccount) -> String {
///     account_id
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAccount
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentAccount>().cloned() {
            return Ok(current);
        }

        let state = AppState::from_ref(state);
        let token = extract_token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
        let account_id = state.tokens.validate(&token)?;

        if state.store.find_by_id(&account_id).await?.is_none() {
            tracing::debug!(%account_id, "token refers to a deleted account");
            return Err(AppError::Unauthorized);
        }

        let current = CurrentAccount(account_id);
        parts.extensions.insert(current.clone());
        Ok(current)
    }
}
