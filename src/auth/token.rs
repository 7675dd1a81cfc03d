//! Token issuing
//!
//! Uses HMAC-signed tokens handed to the client at registration and login.
//! No server-side token storage needed.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::AuthConfig;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried inside a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account ID the token is bound to
    pub sub: String,
    /// When the token was issued
    pub iat: DateTime<Utc>,
    /// When the token expires
    pub exp: DateTime<Utc>,
}

impl TokenClaims {
    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now()
    }
}

/// Mints and validates bearer tokens
///
/// The signing secret and lifetime come from [`AuthConfig`]; nothing is
/// read from the environment here.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    max_age: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.token_secret.clone(),
            max_age: Duration::seconds(config.token_max_age),
        }
    }

    /// Create a signed token for `account_id`
    ///
    /// Token format: base64(claims).base64(hmac_sha256(claims))
    pub fn issue(&self, account_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        self.sign(&TokenClaims {
            sub: account_id.to_string(),
            iat: now,
            exp: now + self.max_age,
        })
    }

    pub(crate) fn sign(&self, claims: &TokenClaims) -> Result<String, AppError> {
        let payload = serde_json::to_string(claims).map_err(|e| AppError::Internal(e.into()))?;
        let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

        let mut mac = self.mac()?;
        mac.update(payload_b64.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        Ok(format!("{}.{}", payload_b64, signature_b64))
    }

    /// Verify a token and return the account ID it is bound to
    ///
    /// # Errors
    /// `Unauthorized` if the token is malformed, forged or expired
    pub fn validate(&self, token: &str) -> Result<String, AppError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(AppError::Unauthorized)?;

        let signature = general_purpose::URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AppError::Unauthorized)?;

        let mut mac = self.mac()?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AppError::Unauthorized)?;

        let payload = general_purpose::URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AppError::Unauthorized)?;
        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| AppError::Unauthorized)?;

        if claims.is_expired() {
            return Err(AppError::Unauthorized);
        }

        Ok(claims.sub)
    }

    fn mac(&self) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::Encryption(e.to_string()))
    }
}
