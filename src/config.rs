//! Service configuration

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Public base URL used to render verification/reset links
    /// (e.g. "https://tunelobby.example.com")
    pub base_url: String,

    /// Path to the SQLite database; in-memory stores are used when unset
    pub database_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// - PORT (default 3000)
    /// - BASE_URL (default "http://localhost:3000")
    /// - DATABASE_PATH (optional)
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let base_url = std::env::var("BASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let database_path = std::env::var("DATABASE_PATH").ok().filter(|s| !s.is_empty());

        Self {
            port,
            base_url,
            database_path,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            database_path: None,
        }
    }
}
