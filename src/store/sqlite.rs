//! SQLite-based storage implementation

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    Account, AccountId, AccountStore, NewAccount, Role, Session, SessionId, SessionStore,
    StoreResult, Token, TokenPurpose,
};
use crate::crypto::{generate_session_id, generate_token};
use crate::error::AuthError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite-based store implementing both AccountStore and SessionStore
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, AuthError> {
        let conn = Connection::open(path).map_err(AuthError::internal)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(AuthError::internal)?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), AuthError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(AuthError::internal)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, AuthError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(AuthError::internal)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(AuthError::internal)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), AuthError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Accounts. Uniqueness lives here, not in application reads.
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                email_verified INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email_lower ON users(lower(email));

            -- Verification and reset tokens
            CREATE TABLE IF NOT EXISTS tokens (
                value TEXT PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                purpose TEXT NOT NULL,
                issued_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                consumed INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_tokens_account ON tokens(account_id, purpose);

            -- Sessions (account snapshot taken at login)
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                role TEXT NOT NULL,
                csrf_token TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(AuthError::internal)?;

        Ok(())
    }

    fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
        let role: String = row.get(4)?;
        Ok(Account {
            id: AccountId(row.get::<_, i64>(0)? as u64),
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            role: Role::from_str(&role).unwrap_or(Role::User),
            email_verified: row.get::<_, i64>(5)? != 0,
            created_at: row.get::<_, DateTime<Utc>>(6)?,
        })
    }

    fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
        let purpose: String = row.get(2)?;
        Ok(Token {
            value: row.get(0)?,
            account_id: AccountId(row.get::<_, i64>(1)? as u64),
            purpose: TokenPurpose::from_str(&purpose).unwrap_or(TokenPurpose::Verify),
            issued_at: row.get::<_, DateTime<Utc>>(3)?,
            expires_at: row.get::<_, DateTime<Utc>>(4)?,
            consumed: row.get::<_, i64>(5)? != 0,
        })
    }

    fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
        let role: String = row.get(4)?;
        Ok(Session {
            id: SessionId(row.get(0)?),
            account_id: AccountId(row.get::<_, i64>(1)? as u64),
            username: row.get(2)?,
            email: row.get(3)?,
            role: Role::from_str(&role).unwrap_or(Role::User),
            csrf_token: row.get(5)?,
            created_at: row.get::<_, DateTime<Utc>>(6)?,
        })
    }

    /// Map a failed insert to the conflicting field, falling back to Internal
    fn map_insert_error(err: rusqlite::Error) -> AuthError {
        if let rusqlite::Error::SqliteFailure(e, Some(msg)) = &err {
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                if msg.contains("username") {
                    return AuthError::Conflict("username");
                }
                return AuthError::Conflict("email");
            }
        }
        AuthError::internal(err)
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, username, email, password_hash, role, email_verified, created_at";
const TOKEN_COLUMNS: &str = "value, account_id, purpose, issued_at, expires_at, consumed";
const SESSION_COLUMNS: &str =
    "id, account_id, username, email, role, csrf_token, created_at";

impl AccountStore for SqliteStore {
    fn create_account(&self, new: NewAccount) -> StoreResult<AccountId> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (username, email, password_hash, role, email_verified, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                new.username,
                new.email,
                new.password_hash,
                new.role.as_str(),
                Utc::now()
            ],
        )
        .map_err(Self::map_insert_error)?;

        Ok(AccountId(conn.last_insert_rowid() as u64))
    }

    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ?1"),
            params![id.0 as i64],
            Self::account_from_row,
        )
        .optional()
        .map_err(AuthError::internal)
    }

    fn find_account(&self, identifier: &str) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {ACCOUNT_COLUMNS} FROM users
                 WHERE username = ?1 OR lower(email) = lower(?1)"
            ),
            params![identifier],
            Self::account_from_row,
        )
        .optional()
        .map_err(AuthError::internal)
    }

    fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE lower(email) = lower(?1)"),
            params![email],
            Self::account_from_row,
        )
        .optional()
        .map_err(AuthError::internal)
    }

    fn mark_verified(&self, id: AccountId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET email_verified = 1 WHERE id = ?1",
            params![id.0 as i64],
        )
        .map_err(AuthError::internal)?;
        Ok(())
    }

    fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, id.0 as i64],
        )
        .map_err(AuthError::internal)?;
        Ok(())
    }

    fn insert_token(&self, token: Token) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tokens (value, account_id, purpose, issued_at, expires_at, consumed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.value,
                token.account_id.0 as i64,
                token.purpose.as_str(),
                token.issued_at,
                token.expires_at,
                token.consumed as i64
            ],
        )
        .map_err(AuthError::internal)?;
        Ok(())
    }

    fn find_token(&self, value: &str) -> StoreResult<Option<Token>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE value = ?1"),
            params![value],
            Self::token_from_row,
        )
        .optional()
        .map_err(AuthError::internal)
    }

    fn consume_token(&self, value: &str) -> StoreResult<bool> {
        // Single conditional UPDATE; the affected-row count is the CAS result.
        // Expiry is part of the condition so an expired token can never be
        // consumed, even when it races the caller's own expiry check.
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute(
                "UPDATE tokens SET consumed = 1
                 WHERE value = ?1 AND consumed = 0 AND expires_at > ?2",
                params![value, Utc::now()],
            )
            .map_err(AuthError::internal)?;
        Ok(affected == 1)
    }

    fn purge_tokens(&self, account_id: AccountId, purpose: TokenPurpose) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute(
                "DELETE FROM tokens WHERE account_id = ?1 AND purpose = ?2 AND consumed = 0",
                params![account_id.0 as i64, purpose.as_str()],
            )
            .map_err(AuthError::internal)?;
        Ok(affected as u64)
    }

    fn cleanup_expired_tokens(&self) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute(
                "DELETE FROM tokens WHERE expires_at <= ?1",
                params![Utc::now()],
            )
            .map_err(AuthError::internal)?;
        Ok(affected as u64)
    }
}

impl SessionStore for SqliteStore {
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

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions (id, account_id, username, email, role, csrf_token, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id.0,
                session.account_id.0 as i64,
                session.username,
                session.email,
                session.role.as_str(),
                session.csrf_token,
                session.created_at
            ],
        )
        .map_err(AuthError::internal)?;

        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
            params![session_id.0],
            Self::session_from_row,
        )
        .optional()
        .map_err(AuthError::internal)
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id.0])
            .map_err(AuthError::internal)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn open_temp_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (store, dir)
    }

    fn new_account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hashed".to_string(),
            role: Role::Artist,
        }
    }

    #[test]
    fn test_create_and_find_account() {
        let (store, _dir) = open_temp_store();

        let id = store.create_account(new_account("alice", "alice@x.com")).unwrap();
        let account = store.find_account("Alice@X.com").unwrap().unwrap();
        assert_eq!(account.id, id);
        assert_eq!(account.role, Role::Artist);
        assert!(!account.email_verified);
    }

    #[test]
    fn test_unique_constraints() {
        let (store, _dir) = open_temp_store();
        store.create_account(new_account("alice", "alice@x.com")).unwrap();

        let err = store
            .create_account(new_account("alice", "other@x.com"))
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict("username")));

        let err = store
            .create_account(new_account("alice2", "ALICE@x.com"))
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict("email")));
    }

    #[test]
    fn test_token_consume_cas() {
        let (store, _dir) = open_temp_store();
        let id = store.create_account(new_account("alice", "alice@x.com")).unwrap();
        let now = Utc::now();
        store
            .insert_token(Token {
                value: "tok".to_string(),
                account_id: id,
                purpose: TokenPurpose::Verify,
                issued_at: now,
                expires_at: now + Duration::hours(24),
                consumed: false,
            })
            .unwrap();

        assert!(store.consume_token("tok").unwrap());
        assert!(!store.consume_token("tok").unwrap());
        assert!(store.find_token("tok").unwrap().unwrap().consumed);
    }

    #[test]
    fn test_consume_token_rejects_expired() {
        let (store, _dir) = open_temp_store();
        let id = store.create_account(new_account("alice", "alice@x.com")).unwrap();
        let now = Utc::now();
        store
            .insert_token(Token {
                value: "stale".to_string(),
                account_id: id,
                purpose: TokenPurpose::Verify,
                issued_at: now - Duration::hours(2),
                expires_at: now - Duration::hours(1),
                consumed: false,
            })
            .unwrap();

        assert!(!store.consume_token("stale").unwrap());
        assert!(!store.find_token("stale").unwrap().unwrap().consumed);
    }

    #[test]
    fn test_schema_reopen_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.db");

        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        let id = store.create_account(new_account("alice", "alice@x.com")).unwrap();
        drop(store);

        // Reopen: migrations must be a no-op and data must survive
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        assert_eq!(store.get_account(id).unwrap().unwrap().username, "alice");
    }

    #[test]
    fn test_session_round_trip() {
        let (store, _dir) = open_temp_store();
        let id = store.create_account(new_account("alice", "alice@x.com")).unwrap();
        let account = store.get_account(id).unwrap().unwrap();

        let session = SessionStore::create(&store, &account).unwrap();
        let loaded = SessionStore::get(&store, &session.id).unwrap().unwrap();
        assert_eq!(loaded.account_id, id);
        assert_eq!(loaded.role, Role::Artist);

        SessionStore::delete(&store, &session.id).unwrap();
        assert!(SessionStore::get(&store, &session.id).unwrap().is_none());
    }
}
