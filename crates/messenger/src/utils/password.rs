//! Password hashing and verification utilities.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{MessengerError, MessengerResult};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> MessengerResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| MessengerError::fatal(format!("password hashing failed: {error}")))
}

/// Verify a password against its PHC hash string
pub fn verify_password(password: &str, hash: &str) -> MessengerResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| MessengerError::invalid_input("stored password hash is malformed"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
