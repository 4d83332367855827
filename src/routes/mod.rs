//! HTTP surface: thin JSON handlers over the lifecycle engine
//!
//! Handlers parse a request, call one engine operation and serialize the
//! result; no business logic lives here.

mod account;
mod auth;
mod reset;
mod session;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthService;
use crate::email::Mailer;
use crate::store::{AccountStore, SessionStore};

/// Create the router with all account routes
pub fn create_router<A, S, M>(service: Arc<AuthService<A, S, M>>) -> Router
where
    A: AccountStore + 'static,
    S: SessionStore + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route("/api/auth/register", post(account::register))
        .route("/api/auth/verify", get(account::verify_email))
        .route("/api/auth/resend_verification", post(account::resend_verification))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(session::session_context))
        .route("/api/auth/request_reset", post(reset::request_reset))
        .route("/api/auth/complete_reset", post(reset::complete_reset))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
