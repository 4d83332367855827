//! Common test utilities for accounts integration tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use axum_test::TestServer;
use serde_json::json;
use tunelobby_accounts::{routes, AuthService, InMemoryAccountStore, InMemorySessionStore, Mailer};

/// Mock mailer that captures issued tokens, with a failure switch
#[derive(Default, Clone)]
pub struct MockMailer {
    /// Captured (email, token) pairs
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
    /// When set, dispatch fails
    pub fail: Arc<AtomicBool>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the last token sent to an email
    pub fn get_token(&self, email: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _)| e == email)
            .map(|(_, t)| t.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

impl Mailer for MockMailer {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("mock mailer failure".to_string());
        }
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        Ok(())
    }

    fn send_password_reset(&self, email: &str, token: &str) -> Result<(), String> {
        self.send_verification(email, token)
    }
}

/// Create a test server backed by in-memory stores and a mock mailer
pub fn create_test_server() -> (TestServer, MockMailer, Arc<InMemoryAccountStore>) {
    let accounts = Arc::new(InMemoryAccountStore::new());
    let mailer = MockMailer::new();

    let service = Arc::new(AuthService::new(
        accounts.clone(),
        InMemorySessionStore::new(),
        mailer.clone(),
    ));

    let app = routes::create_router(service);
    let server = TestServer::new(app).expect("Failed to create test server");

    (server, mailer, accounts)
}

/// Register an account (unverified) and return the verification token
pub async fn register_user(
    server: &TestServer,
    mailer: &MockMailer,
    username: &str,
    email: &str,
    password: &str,
) -> String {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": email,
            "password": password,
            "password_confirmation": password,
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    mailer.get_token(email).expect("No verification token sent")
}

/// Register and verify an account
pub async fn register_verified_user(
    server: &TestServer,
    mailer: &MockMailer,
    username: &str,
    email: &str,
    password: &str,
) {
    let token = register_user(server, mailer, username, email, password).await;

    let response = server
        .get(&format!("/api/auth/verify?token={}", token))
        .await;
    assert_eq!(response.status_code(), 200);
}

/// Log in and return the session cookie value
pub async fn login(server: &TestServer, identifier: &str, password: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "identifier": identifier,
            "password": password,
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    response
        .maybe_cookie("tunelobby_session")
        .expect("No session cookie")
        .value()
        .to_string()
}
