//! Password hashing and bearer token key generation.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use rand::distr::Alphanumeric;

/// Stored passwords starting with this prefix never verify.
pub const UNUSABLE_PASSWORD_PREFIX: char = '!';

const UNUSABLE_PASSWORD_SUFFIX_LENGTH: usize = 40;

/// Number of random bytes in a token key; hex-encoded to 40 characters.
const TOKEN_KEY_BYTES: usize = 20;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
///
/// Unusable and malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if stored.starts_with(UNUSABLE_PASSWORD_PREFIX) {
        return false;
    }
    let parsed_hash = match PasswordHash::new(stored) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// A password value that can be stored but will never match any input.
pub fn make_unusable_password() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(UNUSABLE_PASSWORD_SUFFIX_LENGTH)
        .map(char::from)
        .collect();
    format!("{UNUSABLE_PASSWORD_PREFIX}{suffix}")
}

/// Generate a random token key
pub fn generate_token_key() -> String {
    let bytes: [u8; TOKEN_KEY_BYTES] = rand::rng().random();
    hex::encode(bytes)
}
