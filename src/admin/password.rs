use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Lowercase hex SHA-256 of the password, the format of `ADMIN_PASSWORD_HASH`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Constant-time check of `password` against a stored hex hash.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let expected = password_hash.trim().to_ascii_lowercase();
    let actual = hash_password(password);
    bool::from(actual.as_bytes().ct_eq(expected.as_bytes()))
}
