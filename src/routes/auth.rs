//! Login and logout endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::auth::AuthService;
use crate::email::Mailer;
use crate::error::AuthError;
use crate::store::{AccountStore, SessionStore};

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email address
    pub identifier: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    /// The caller picks the post-login destination from this
    pub role: &'static str,
}

/// POST /api/auth/login
pub async fn login<A, S, M>(
    State(service): State<Arc<AuthService<A, S, M>>>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
    M: Mailer,
{
    let session = service.login(&req.identifier, &req.password)?;
    super::session::set_session_cookie(&cookies, &session.id.0);

    Ok(Json(LoginResponse {
        success: true,
        role: session.role.as_str(),
    }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// POST /api/auth/logout
pub async fn logout<A, S, M>(
    State(service): State<Arc<AuthService<A, S, M>>>,
    cookies: Cookies,
) -> Result<Json<LogoutResponse>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
    M: Mailer,
{
    if let Some(session) = super::session::get_session_from_cookies(&cookies, &service)? {
        service.logout(&session.id)?;
    }

    super::session::clear_session_cookie(&cookies);

    Ok(Json(LogoutResponse { success: true }))
}
