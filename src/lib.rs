//! TuneLobby Accounts
//!
//! Account identity and session lifecycle for the TuneLobby music-sharing
//! platform: registration, email verification, login/logout, password reset.
//! Storage and outbound email sit behind traits; the HTTP handlers are thin
//! wrappers around the [`auth::AuthService`] engine.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod routes;
pub mod store;

pub use auth::{AuthService, RegisterInput, Registration, ResendTarget};
pub use config::Config;
pub use email::{ConsoleMailer, Mailer, SmtpConfig, SmtpMailer};
pub use error::AuthError;
pub use store::{
    AccountStore, InMemoryAccountStore, InMemorySessionStore, SessionStore, SqliteStore,
};
