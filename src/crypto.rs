//! Password hashing and token generation

/// Default bcrypt cost factor
pub const BCRYPT_COST: u32 = 12;

/// Hash a password with bcrypt
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, BCRYPT_COST)
}

/// Verify a password against a bcrypt hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

/// Generate an opaque, unguessable token value for verification/reset links
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Generate a random session identifier
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
