//! In-memory storage implementations

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;

use super::{
    Account, AccountId, AccountStore, NewAccount, Session, SessionId, SessionStore, StoreResult,
    Token, TokenPurpose,
};
use crate::crypto::{generate_session_id, generate_token};

/// In-memory account and token store
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
    tokens: RwLock<HashMap<String, Token>>,
    next_account_id: AtomicU64,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            next_account_id: AtomicU64::new(1),
        }
    }

    /// Rewrite a token's expiry (for testing expiry handling)
    pub fn backdate_token(
        &self,
        value: &str,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<()> {
        let mut tokens = self.tokens.write().unwrap();
        if let Some(token) = tokens.get_mut(value) {
            token.expires_at = expires_at;
            Ok(())
        } else {
            Err(crate::error::AuthError::TokenNotFound)
        }
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn create_account(&self, new: NewAccount) -> StoreResult<AccountId> {
        let email_lower = new.email.to_lowercase();

        // Conflict scan and insert happen under the same write lock so a
        // concurrent create cannot slip between check and insert.
        let mut accounts = self.accounts.write().unwrap();
        for account in accounts.values() {
            if account.username == new.username {
                return Err(crate::error::AuthError::Conflict("username"));
            }
            if account.email.to_lowercase() == email_lower {
                return Err(crate::error::AuthError::Conflict("email"));
            }
        }

        let id = AccountId(self.next_account_id.fetch_add(1, Ordering::SeqCst));
        accounts.insert(
            id,
            Account {
                id,
                username: new.username,
                email: new.email,
                password_hash: new.password_hash,
                role: new.role,
                email_verified: false,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().unwrap().get(&id).cloned())
    }

    fn find_account(&self, identifier: &str) -> StoreResult<Option<Account>> {
        let email_lower = identifier.to_lowercase();
        let accounts = self.accounts.read().unwrap();
        Ok(accounts
            .values()
            .find(|a| a.username == identifier || a.email.to_lowercase() == email_lower)
            .cloned())
    }

    fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let email_lower = email.to_lowercase();
        let accounts = self.accounts.read().unwrap();
        Ok(accounts
            .values()
            .find(|a| a.email.to_lowercase() == email_lower)
            .cloned())
    }

    fn mark_verified(&self, id: AccountId) -> StoreResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        if let Some(account) = accounts.get_mut(&id) {
            account.email_verified = true;
        }
        Ok(())
    }

    fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        if let Some(account) = accounts.get_mut(&id) {
            account.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    fn insert_token(&self, token: Token) -> StoreResult<()> {
        self.tokens
            .write()
            .unwrap()
            .insert(token.value.clone(), token);
        Ok(())
    }

    fn find_token(&self, value: &str) -> StoreResult<Option<Token>> {
        Ok(self.tokens.read().unwrap().get(value).cloned())
    }

    fn consume_token(&self, value: &str) -> StoreResult<bool> {
        let now = Utc::now();
        let mut tokens = self.tokens.write().unwrap();
        match tokens.get_mut(value) {
            Some(token) if !token.consumed && !token.is_expired(now) => {
                token.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn purge_tokens(&self, account_id: AccountId, purpose: TokenPurpose) -> StoreResult<u64> {
        let mut tokens = self.tokens.write().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| !(t.account_id == account_id && t.purpose == purpose && !t.consumed));
        Ok((before - tokens.len()) as u64)
    }

    fn cleanup_expired_tokens(&self) -> StoreResult<u64> {
        let now = Utc::now();
        let mut tokens = self.tokens.write().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| !t.is_expired(now));
        Ok((before - tokens.len()) as u64)
    }
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, account: &Account) -> StoreResult<Session> {
        let session = Session {
            id: SessionId(generate_session_id()),
            account_id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            csrf_token: generate_token(),
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(session_id);
        Ok(())
    }
}
