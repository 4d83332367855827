//! Account lifecycle engine
//!
//! One method per account operation: registration, login/logout, email
//! verification, resend, and the two halves of password reset. The engine
//! holds no HTTP state; handlers pass session ids in and get typed results
//! back. All shared mutation goes through the store traits, and no store
//! write is pending while the mailer runs.

use chrono::{Duration, Utc};

use crate::crypto::{generate_token, hash_password, verify_password};
use crate::email::Mailer;
use crate::error::AuthError;
use crate::store::{
    Account, AccountId, AccountStore, NewAccount, Role, Session, SessionId, SessionStore, Token,
    TokenPurpose,
};

/// How long a verification link stays valid
pub const VERIFY_TOKEN_TTL_HOURS: i64 = 24;
/// How long a reset link stays valid
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length
pub const MAX_PASSWORD_LENGTH: usize = 80;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 30;

/// Registration request
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    /// Optional role hint; only "user" and "artist" are accepted
    pub role_hint: Option<String>,
}

/// Successful registration result
#[derive(Debug, Clone)]
pub struct Registration {
    pub account_id: AccountId,
    /// Whether the verification email was dispatched; false is a soft
    /// warning, the account exists either way and a resend is possible
    pub email_sent: bool,
}

/// Whose verification email should be resent
#[derive(Debug, Clone)]
pub enum ResendTarget {
    /// The authenticated session's account
    Account(AccountId),
    /// A bare email address, when no session exists
    Email(String),
}

/// The account lifecycle engine
pub struct AuthService<A, S, M> {
    accounts: A,
    sessions: S,
    mailer: M,
}

impl<A, S, M> AuthService<A, S, M>
where
    A: AccountStore,
    S: SessionStore,
    M: Mailer,
{
    pub fn new(accounts: A, sessions: S, mailer: M) -> Self {
        Self {
            accounts,
            sessions,
            mailer,
        }
    }

    /// Register a new, unverified account and stage its verification token.
    ///
    /// Uniqueness is enforced by the store's constraints, so a conflicting
    /// concurrent registration surfaces as `Conflict` rather than a duplicate
    /// row. The verification email is attempted only after both writes have
    /// committed.
    pub fn register(&self, input: RegisterInput) -> Result<Registration, AuthError> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        validate_password(&input.password)?;
        if input.password != input.password_confirmation {
            return Err(AuthError::validation("Passwords do not match"));
        }
        let role = parse_role_hint(input.role_hint.as_deref())?;

        let password_hash = hash_password(&input.password).map_err(AuthError::internal)?;

        let account_id = self.accounts.create_account(NewAccount {
            username: input.username,
            email: input.email.clone(),
            password_hash,
            role,
        })?;

        let token = self.issue_token(account_id, TokenPurpose::Verify)?;

        let email_sent = match self.mailer.send_verification(&input.email, &token.value) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(email = %input.email, error = %err, "Verification email failed");
                false
            }
        };

        Ok(Registration {
            account_id,
            email_sent,
        })
    }

    /// Authenticate by username or email and open a session.
    ///
    /// Unknown identifier and wrong password yield the same error; nothing in
    /// the response reveals whether the account exists. Unverified accounts
    /// may log in — verification gates feature access, not login.
    pub fn login(&self, identifier: &str, password: &str) -> Result<Session, AuthError> {
        let account = self
            .accounts
            .find_account(identifier)?
            .ok_or(AuthError::InvalidCredentials)?;

        let valid = verify_password(password, &account.password_hash)
            .map_err(AuthError::internal)?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.sessions.create(&account)?;
        tracing::info!(account_id = account.id.0, role = account.role.as_str(), "Login");
        Ok(session)
    }

    /// Destroy a session. Idempotent; an unknown id is not an error.
    pub fn logout(&self, session_id: &SessionId) -> Result<(), AuthError> {
        self.sessions.delete(session_id)
    }

    /// Look up the session behind an id, if any
    pub fn current_session(&self, session_id: &SessionId) -> Result<Option<Session>, AuthError> {
        self.sessions.get(session_id)
    }

    /// Consume a verification token and mark the owning account verified.
    ///
    /// Consumption is the atomic gate: of two concurrent calls with the same
    /// token, exactly one passes the compare-and-set. `mark_verified` is
    /// idempotent, and a consumed token whose owner is still unverified marks
    /// a write that failed between the two store calls — every later attempt
    /// with that token re-applies `mark_verified` before reporting reuse, so
    /// a retry converges instead of stranding the account.
    pub fn verify_email(&self, token_value: &str) -> Result<(), AuthError> {
        let token = self
            .accounts
            .find_token(token_value)?
            .ok_or(AuthError::TokenNotFound)?;
        if token.purpose != TokenPurpose::Verify {
            return Err(AuthError::TokenNotFound);
        }
        if token.consumed {
            return Err(self.repair_verification(token.account_id));
        }
        if token.is_expired(Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        if !self.accounts.consume_token(&token.value)? {
            // Lost a race since the read: consumed by a concurrent winner,
            // or expired between the check and the compare-and-set.
            return Err(match self.accounts.find_token(token_value)? {
                Some(current) if current.consumed => {
                    self.repair_verification(current.account_id)
                }
                _ => AuthError::TokenExpired,
            });
        }
        self.accounts.mark_verified(token.account_id)?;

        tracing::info!(account_id = token.account_id.0, "Email verified");
        Ok(())
    }

    /// Issue and send a fresh verification token.
    ///
    /// Already-verified accounts and unknown emails are success-shaped no-ops
    /// returning `false`. Prior unconsumed verification tokens are purged so
    /// only the newest link stays live. The returned bool reports whether the
    /// email was dispatched.
    pub fn resend_verification(&self, target: ResendTarget) -> Result<bool, AuthError> {
        let account = match self.resolve_target(target)? {
            Some(account) => account,
            None => return Ok(false),
        };

        if account.email_verified {
            return Ok(false);
        }

        self.accounts.purge_tokens(account.id, TokenPurpose::Verify)?;
        let token = self.issue_token(account.id, TokenPurpose::Verify)?;

        match self.mailer.send_verification(&account.email, &token.value) {
            Ok(()) => Ok(true),
            Err(err) => {
                tracing::warn!(email = %account.email, error = %err, "Verification email failed");
                Ok(false)
            }
        }
    }

    /// Stage a password reset.
    ///
    /// Always success-shaped: an unknown email returns `Ok(())` just like a
    /// known one, and a mailer failure is only logged, so the response gives
    /// no account-enumeration signal.
    pub fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let account = match self.accounts.find_account_by_email(email)? {
            Some(account) => account,
            None => {
                tracing::debug!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        self.accounts.purge_tokens(account.id, TokenPurpose::Reset)?;
        let token = self.issue_token(account.id, TokenPurpose::Reset)?;

        if let Err(err) = self.mailer.send_password_reset(&account.email, &token.value) {
            tracing::warn!(email = %account.email, error = %err, "Reset email failed");
        }

        Ok(())
    }

    /// Complete a password reset with a valid reset token.
    ///
    /// The token is gated by the same compare-and-set as verification, so a
    /// reset link grants exactly one password change. Validation and hashing
    /// both happen before consumption; only the final store write stands
    /// between consuming the token and the new hash landing. No session is
    /// created; the user logs in with the new password.
    pub fn complete_password_reset(
        &self,
        token_value: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;
        if new_password != confirmation {
            return Err(AuthError::validation("Passwords do not match"));
        }

        let token = self.checked_token(token_value, TokenPurpose::Reset)?;

        // Hash before consuming so a hashing failure cannot burn the token
        let password_hash = hash_password(new_password).map_err(AuthError::internal)?;

        if !self.accounts.consume_token(&token.value)? {
            // Lost a race since the read; re-classify for the precise error
            self.checked_token(token_value, TokenPurpose::Reset)?;
            return Err(AuthError::TokenAlreadyUsed);
        }
        self.accounts.update_password(token.account_id, &password_hash)?;

        tracing::info!(account_id = token.account_id.0, "Password reset");
        Ok(())
    }

    fn resolve_target(&self, target: ResendTarget) -> Result<Option<Account>, AuthError> {
        match target {
            ResendTarget::Account(id) => self.accounts.get_account(id),
            ResendTarget::Email(email) => self.accounts.find_account_by_email(&email),
        }
    }

    /// Handle a consumed verification token: if its owner never received the
    /// verified flag, the earlier attempt failed between consuming the token
    /// and updating the account — re-apply the idempotent update so the
    /// account converges, then report the reuse.
    fn repair_verification(&self, account_id: AccountId) -> AuthError {
        match self.accounts.get_account(account_id) {
            Ok(Some(account)) if !account.email_verified => {
                tracing::warn!(account_id = account_id.0, "Re-applying interrupted verification");
                match self.accounts.mark_verified(account_id) {
                    Ok(()) => AuthError::TokenAlreadyUsed,
                    Err(err) => err,
                }
            }
            Ok(_) => AuthError::TokenAlreadyUsed,
            Err(err) => err,
        }
    }

    /// Load a token and check purpose, consumption and expiry.
    /// Purpose mismatches read as not-found so a reset link can't probe
    /// verification state or vice versa.
    fn checked_token(&self, value: &str, purpose: TokenPurpose) -> Result<Token, AuthError> {
        let token = self
            .accounts
            .find_token(value)?
            .ok_or(AuthError::TokenNotFound)?;

        if token.purpose != purpose {
            return Err(AuthError::TokenNotFound);
        }
        if token.consumed {
            return Err(AuthError::TokenAlreadyUsed);
        }
        if token.is_expired(Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        Ok(token)
    }

    fn issue_token(&self, account_id: AccountId, purpose: TokenPurpose) -> Result<Token, AuthError> {
        let now = Utc::now();
        let ttl = match purpose {
            TokenPurpose::Verify => Duration::hours(VERIFY_TOKEN_TTL_HOURS),
            TokenPurpose::Reset => Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        };
        let token = Token {
            value: generate_token(),
            account_id,
            purpose,
            issued_at: now,
            expires_at: now + ttl,
            consumed: false,
        };
        self.accounts.insert_token(token.clone())?;
        Ok(token)
    }
}

fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err(AuthError::validation(format!(
            "Username must be {} to {} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AuthError::validation(
            "Username may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let mut parts = email.split('@');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AuthError::validation("Invalid email address"))
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::validation(format!(
            "Password must be at most {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn parse_role_hint(hint: Option<&str>) -> Result<Role, AuthError> {
    match hint {
        None => Ok(Role::User),
        Some("user") => Ok(Role::User),
        Some("artist") => Ok(Role::Artist),
        // Admin accounts are provisioned out of band, never self-assigned
        Some(_) => Err(AuthError::validation("Invalid role")),
    }
}
