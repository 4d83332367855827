//! Outbound email abstractions
//!
//! Delivery is best-effort: the engine commits its writes first, then attempts
//! dispatch and degrades a failure into a logged warning.

pub mod console;
pub mod smtp;

pub use console::ConsoleMailer;
pub use smtp::{SmtpConfig, SmtpMailer};

/// Trait for sending account lifecycle emails
///
/// Implementations receive the raw token and render the link themselves.
pub trait Mailer: Send + Sync {
    /// Send an email-verification link
    fn send_verification(&self, email: &str, token: &str) -> Result<(), String>;

    /// Send a password-reset link
    fn send_password_reset(&self, email: &str, token: &str) -> Result<(), String>;
}

/// Allow using Box<dyn Mailer> as a Mailer
impl Mailer for Box<dyn Mailer> {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), String> {
        (**self).send_verification(email, token)
    }

    fn send_password_reset(&self, email: &str, token: &str) -> Result<(), String> {
        (**self).send_password_reset(email, token)
    }
}

/// Render the verification link a mail body carries
pub fn verification_link(base_url: &str, token: &str) -> String {
    format!("{}/api/auth/verify?token={}", base_url.trim_end_matches('/'), token)
}

/// Render the password-reset link a mail body carries
pub fn reset_link(base_url: &str, token: &str) -> String {
    format!("{}/reset?token={}", base_url.trim_end_matches('/'), token)
}
