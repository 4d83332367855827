//! Console-based mailer for development

use super::{reset_link, verification_link, Mailer};

/// Mailer that prints links to the console (for development)
pub struct ConsoleMailer {
    base_url: String,
}

impl ConsoleMailer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Mailer for ConsoleMailer {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), String> {
        let link = verification_link(&self.base_url, token);

        println!();
        println!("========================================");
        println!("  VERIFY YOUR TUNELOBBY ACCOUNT: {}", email);
        println!("  LINK: {}", link);
        println!("========================================");
        println!();

        tracing::info!(email = %email, "Verification link sent");

        Ok(())
    }

    fn send_password_reset(&self, email: &str, token: &str) -> Result<(), String> {
        let link = reset_link(&self.base_url, token);

        println!();
        println!("========================================");
        println!("  PASSWORD RESET FOR: {}", email);
        println!("  LINK: {}", link);
        println!("========================================");
        println!();

        tracing::info!(email = %email, "Password reset link sent");

        Ok(())
    }
}
