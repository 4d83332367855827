//! Session context endpoint and cookie helpers

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tower_cookies::Cookies;

use crate::auth::AuthService;
use crate::email::Mailer;
use crate::error::AuthError;
use crate::store::{AccountStore, Session, SessionId, SessionStore};

const SESSION_COOKIE: &str = "tunelobby_session";

#[derive(Serialize)]
pub struct SessionContext {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    pub server_time: i64,
}

/// GET /api/auth/session
pub async fn session_context<A, S, M>(
    State(service): State<Arc<AuthService<A, S, M>>>,
    cookies: Cookies,
) -> Result<Json<SessionContext>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
    M: Mailer,
{
    let session = get_session_from_cookies(&cookies, &service)?;

    let context = if let Some(session) = session {
        SessionContext {
            authenticated: true,
            account_id: Some(session.account_id.0),
            username: Some(session.username),
            role: Some(session.role.as_str()),
            csrf_token: Some(session.csrf_token),
            server_time: chrono::Utc::now().timestamp(),
        }
    } else {
        SessionContext {
            authenticated: false,
            account_id: None,
            username: None,
            role: None,
            csrf_token: None,
            server_time: chrono::Utc::now().timestamp(),
        }
    };

    Ok(Json(context))
}

/// Helper to resolve the current session from cookies.
/// A missing cookie or unknown session is `None`; a store failure surfaces
/// as an error rather than reading as anonymous.
pub fn get_session_from_cookies<A, S, M>(
    cookies: &Cookies,
    service: &AuthService<A, S, M>,
) -> Result<Option<Session>, AuthError>
where
    A: AccountStore,
    S: SessionStore,
    M: Mailer,
{
    match cookies.get(SESSION_COOKIE) {
        Some(c) => {
            let session_id = SessionId(c.value().to_string());
            service.current_session(&session_id)
        }
        None => Ok(None),
    }
}

/// Helper to set the session cookie
pub fn set_session_cookie(cookies: &Cookies, session_id: &str) {
    use tower_cookies::Cookie;
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .build();
    cookies.add(cookie);
}

/// Helper to clear the session cookie
pub fn clear_session_cookie(cookies: &Cookies) {
    use tower_cookies::Cookie;
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}
