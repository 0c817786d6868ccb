use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use std::sync::OnceLock;

use argon2::Argon2;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::user::{Identity, User};
use crate::errors::AuthError;

/// Hash a plaintext password into an argon2id PHC string.
pub fn hash_password(password: &SecretString) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| AuthError::Hashing(error.to_string()))
}

pub fn verify_password(password_hash: &str, password: &SecretString) -> Result<(), AuthError> {
    let parsed =
        PasswordHash::new(password_hash).map_err(|error| AuthError::Hashing(error.to_string()))?;
    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Hash checked when no account matches, so unknown usernames cost the same
/// argon2 work as known ones.
fn absent_account_hash() -> Option<&'static str> {
    static HASH: OnceLock<Option<String>> = OnceLock::new();
    HASH.get_or_init(|| hash_password(&SecretString::from("no-such-account".to_string())).ok())
        .as_deref()
}

/// Check a sign-in attempt against the stored account.
///
/// A missing account and a wrong password are indistinguishable to the
/// caller, in result and in work done. The role is resolved only after the
/// password matches.
pub fn authenticate(
    account: Option<&User>,
    password: &SecretString,
) -> Result<Identity, AuthError> {
    let Some(account) = account else {
        if let Some(hash) = absent_account_hash() {
            let _ = verify_password(hash, password);
        }
        return Err(AuthError::InvalidCredentials);
    };
    verify_password(&account.password_hash, password)?;
    account.identity()
}
