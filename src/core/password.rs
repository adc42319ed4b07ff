//! One-way password hashing
//!
//! Passwords are stored as Argon2id PHC strings (`$argon2id$...`) with the
//! crate's default, fixed cost parameters.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// PHC prefix shared by every hash this module produces
const HASH_PREFIX: &str = "$argon2";

/// Hash a plaintext password
pub fn hash_password(plain: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(plain.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a plaintext password against a stored hash
///
/// Returns false for anything that is not a well-formed hash.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// True when the value already looks like a stored hash
pub fn is_hashed(value: &str) -> bool {
    value.starts_with(HASH_PREFIX) && PasswordHash::new(value).is_ok()
}
