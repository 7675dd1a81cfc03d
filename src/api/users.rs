//! `/api/users` endpoints
//!
//! Registration and login are public; everything else requires a bearer
//! token for the account being acted on. Malformed JSON bodies are reported
//! as `{"error": ...}` like every other failure.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use axum_extra::extract::WithRejection;

use super::dto::{
    AccountResponse, AuthResponse, IdResponse, LoginRequest, RegisterRequest, TargetRequest,
    UpdatePasswordRequest, UpdateProfileRequest,
};
use crate::AppState;
use crate::auth::CurrentAccount;
use crate::error::AppError;
use crate::service::{AuthenticatedAccount, Registration};

/// Create users router
pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", post(register).delete(delete_account))
        .route("/login", post(login))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/password", put(update_password))
        .route("/follow", post(follow))
        .route("/unfollow", post(unfollow))
}

impl From<AuthenticatedAccount> for AuthResponse {
    fn from(authenticated: AuthenticatedAccount) -> Self {
        Self {
            id: authenticated.account.id,
            name: authenticated.account.name,
            email: authenticated.account.email,
            token: authenticated.token,
        }
    }
}

/// POST /api/users
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (Some(name), Some(email), Some(password), Some(dob)) =
        (request.name, request.email, request.password, request.dob)
    else {
        return Err(AppError::Validation("please add all fields".to_string()));
    };

    let registered = state
        .accounts
        .register(Registration {
            name,
            email,
            password,
            dob,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(registered.into())))
}

/// POST /api/users/login
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<AuthResponse>, AppError> {
    let authenticated = state
        .accounts
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(authenticated.into()))
}

/// GET /api/users/profile
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentAccount(account_id): CurrentAccount,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state.accounts.get_profile(&account_id).await?;
    Ok(Json(account.into()))
}

/// PUT /api/users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentAccount(account_id): CurrentAccount,
    WithRejection(Json(request), _): WithRejection<Json<UpdateProfileRequest>, AppError>,
) -> Result<Json<IdResponse>, AppError> {
    let account = state
        .accounts
        .update_profile(&account_id, request.name, request.dob)
        .await?;
    Ok(Json(IdResponse { id: account.id }))
}

/// PUT /api/users/password
pub async fn update_password(
    State(state): State<AppState>,
    CurrentAccount(account_id): CurrentAccount,
    WithRejection(Json(request), _): WithRejection<Json<UpdatePasswordRequest>, AppError>,
) -> Result<Json<IdResponse>, AppError> {
    let account = state
        .accounts
        .update_password(&account_id, request.password)
        .await?;
    Ok(Json(IdResponse { id: account.id }))
}

/// DELETE /api/users
pub async fn delete_account(
    State(state): State<AppState>,
    CurrentAccount(account_id): CurrentAccount,
) -> Result<Json<IdResponse>, AppError> {
    let summary = state.graph.delete_account(&account_id).await?;
    Ok(Json(IdResponse { id: summary.id }))
}

/// POST /api/users/follow
pub async fn follow(
    State(state): State<AppState>,
    CurrentAccount(account_id): CurrentAccount,
    WithRejection(Json(request), _): WithRejection<Json<TargetRequest>, AppError>,
) -> Result<Json<IdResponse>, AppError> {
    let id = state.graph.follow(&account_id, request.id.trim()).await?;
    Ok(Json(IdResponse { id }))
}

/// POST /api/users/unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    CurrentAccount(account_id): CurrentAccount,
    WithRejection(Json(request), _): WithRejection<Json<TargetRequest>, AppError>,
) -> Result<Json<IdResponse>, AppError> {
    let id = state.graph.unfollow(&account_id, request.id.trim()).await?;
    Ok(Json(IdResponse { id }))
}
