//! Storage abstractions for accounts, tokens and sessions

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::{InMemoryAccountStore, InMemorySessionStore};
pub use models::*;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use crate::error::AuthError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, AuthError>;

/// Trait for account and token storage
pub trait AccountStore: Send + Sync {
    /// Create a new account. Uniqueness of username and (case-insensitive)
    /// email is enforced here, not by a prior read; returns
    /// `AuthError::Conflict` when either collides.
    fn create_account(&self, new: NewAccount) -> StoreResult<AccountId>;

    /// Get an account by id
    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// Look up an account by exact username or case-insensitive email
    fn find_account(&self, identifier: &str) -> StoreResult<Option<Account>>;

    /// Look up an account by case-insensitive email only
    fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Set `email_verified = true`; idempotent
    fn mark_verified(&self, id: AccountId) -> StoreResult<()>;

    /// Replace the account's password hash
    fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()>;

    /// Persist a freshly issued token
    fn insert_token(&self, token: Token) -> StoreResult<()>;

    /// Get a token by its opaque value
    fn find_token(&self, value: &str) -> StoreResult<Option<Token>>;

    /// Atomically flip `consumed` from false to true. Returns false when the
    /// token is missing, already consumed, or past its expiry; of any number
    /// of concurrent callers, exactly one sees true.
    fn consume_token(&self, value: &str) -> StoreResult<bool>;

    /// Delete unconsumed tokens of the given purpose for an account
    /// (invalidate-on-reissue). Returns the number removed.
    fn purge_tokens(&self, account_id: AccountId, purpose: TokenPurpose) -> StoreResult<u64>;

    /// Delete tokens whose expiry has passed. Returns the number removed.
    fn cleanup_expired_tokens(&self) -> StoreResult<u64>;
}

/// Trait for session storage
pub trait SessionStore: Send + Sync {
    /// Create a session holding the given account snapshot
    fn create(&self, account: &Account) -> StoreResult<Session>;

    /// Get a session by id
    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>>;

    /// Delete a session; deleting a missing session is not an error
    fn delete(&self, session_id: &SessionId) -> StoreResult<()>;
}

impl<T: AccountStore + ?Sized> AccountStore for Arc<T> {
    fn create_account(&self, new: NewAccount) -> StoreResult<AccountId> {
        (**self).create_account(new)
    }

    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        (**self).get_account(id)
    }

    fn find_account(&self, identifier: &str) -> StoreResult<Option<Account>> {
        (**self).find_account(identifier)
    }

    fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        (**self).find_account_by_email(email)
    }

    fn mark_verified(&self, id: AccountId) -> StoreResult<()> {
        (**self).mark_verified(id)
    }

    fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        (**self).update_password(id, password_hash)
    }

    fn insert_token(&self, token: Token) -> StoreResult<()> {
        (**self).insert_token(token)
    }

    fn find_token(&self, value: &str) -> StoreResult<Option<Token>> {
        (**self).find_token(value)
    }

    fn consume_token(&self, value: &str) -> StoreResult<bool> {
        (**self).consume_token(value)
    }

    fn purge_tokens(&self, account_id: AccountId, purpose: TokenPurpose) -> StoreResult<u64> {
        (**self).purge_tokens(account_id, purpose)
    }

    fn cleanup_expired_tokens(&self) -> StoreResult<u64> {
        (**self).cleanup_expired_tokens()
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn create(&self, account: &Account) -> StoreResult<Session> {
        (**self).create(account)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        (**self).get(session_id)
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        (**self).delete(session_id)
    }
}
