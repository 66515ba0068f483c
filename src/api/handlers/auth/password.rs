//! Argon2id password hashing and verification.
//!
//! Hashes use the PHC string format so the algorithm parameters and salt
//! travel with the hash itself; verification never needs the config that
//! produced the hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Hash a plaintext password with Argon2id and a random salt.
///
/// `time_cost` is the iteration count; memory and parallelism stay at the
/// library defaults.
pub fn hash_password(
    password: &str,
    time_cost: u32,
) -> Result<String, argon2::password_hash::Error> {
    let params = Params::new(
        Params::DEFAULT_M_COST,
        time_cost,
        Params::DEFAULT_P_COST,
        None,
    )?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch; other errors (malformed hash) propagate.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("correct-horse-battery-staple", 2).expect("hashing succeeds");
        assert!(hash.starts_with("$argon2id$"), "expected argon2id PHC prefix");
        assert!(verify_password("correct-horse-battery-staple", &hash).expect("verify succeeds"));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let hash = hash_password("real-password", 2).expect("hashing succeeds");
        assert!(!verify_password("wrong-password", &hash).expect("verify succeeds"));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password("same-password", 2).expect("hashing succeeds");
        let second = hash_password("same-password", 2).expect("hashing succeeds");
        assert_ne!(first, second);
    }
}
