//! Registration, verification and resend endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::auth::{AuthService, RegisterInput, ResendTarget};
use crate::email::Mailer;
use crate::error::AuthError;
use crate::store::{AccountStore, SessionStore};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    /// "user" (default) or "artist"
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub account_id: u64,
    /// False when the verification email could not be dispatched;
    /// the account exists and a resend is possible
    pub email_sent: bool,
}

/// POST /api/auth/register
pub async fn register<A, S, M>(
    State(service): State<Arc<AuthService<A, S, M>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
    M: Mailer,
{
    let registration = service.register(RegisterInput {
        username: req.username,
        email: req.email,
        password: req.password,
        password_confirmation: req.password_confirmation,
        role_hint: req.role,
    })?;

    Ok(Json(RegisterResponse {
        success: true,
        account_id: registration.account_id.0,
        email_sent: registration.email_sent,
    }))
}

#[derive(Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub success: bool,
}

/// GET /api/auth/verify?token=...
/// The link target from the verification email; the front end redirects to
/// login on success.
pub async fn verify_email<A, S, M>(
    State(service): State<Arc<AuthService<A, S, M>>>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
    M: Mailer,
{
    service.verify_email(&query.token)?;
    Ok(Json(VerifyResponse { success: true }))
}

#[derive(Deserialize, Default)]
pub struct ResendRequest {
    /// Only consulted when no session cookie is present
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct ResendResponse {
    pub success: bool,
    pub email_sent: bool,
}

/// POST /api/auth/resend_verification
pub async fn resend_verification<A, S, M>(
    State(service): State<Arc<AuthService<A, S, M>>>,
    cookies: Cookies,
    Json(req): Json<ResendRequest>,
) -> Result<Json<ResendResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
    M: Mailer,
{
    let target = match super::session::get_session_from_cookies(&cookies, &service)? {
        Some(session) => ResendTarget::Account(session.account_id),
        None => match req.email {
            Some(email) => ResendTarget::Email(email),
            None => return Err(AuthError::validation("email required when not logged in")),
        },
    };

    let email_sent = service.resend_verification(target)?;
    Ok(Json(ResendResponse {
        success: true,
        email_sent,
    }))
}
