//! Password reset endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthService;
use crate::email::Mailer;
use crate::error::AuthError;
use crate::store::{AccountStore, SessionStore};

#[derive(Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct RequestResetResponse {
    pub success: bool,
}

/// POST /api/auth/request_reset
///
/// Success-shaped for known and unknown emails alike; the response carries no
/// account-enumeration signal.
pub async fn request_reset<A, S, M>(
    State(service): State<Arc<AuthService<A, S, M>>>,
    Json(req): Json<RequestResetRequest>,
) -> Result<Json<RequestResetResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
    M: Mailer,
{
    service.request_password_reset(&req.email)?;
    Ok(Json(RequestResetResponse { success: true }))
}

#[derive(Deserialize)]
pub struct CompleteResetRequest {
    pub token: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Serialize)]
pub struct CompleteResetResponse {
    pub success: bool,
}

/// POST /api/auth/complete_reset
///
/// No session is created; the user logs in with the new password.
pub async fn complete_reset<A, S, M>(
    State(service): State<Arc<AuthService<A, S, M>>>,
    Json(req): Json<CompleteResetRequest>,
) -> Result<Json<CompleteResetResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
    M: Mailer,
{
    service.complete_password_reset(&req.token, &req.password, &req.password_confirmation)?;
    Ok(Json(CompleteResetResponse { success: true }))
}
