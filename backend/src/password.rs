//! One-way password hashing used by the user handlers.

/// Work factor applied when hashing new passwords.
pub const HASH_COST: u32 = 10;

/// Hash a plaintext password for storage.
///
/// # Errors
///
/// Returns the underlying bcrypt error when hashing fails.
pub fn hash(plain: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, HASH_COST)
}

/// Compare a plaintext password against a stored hash.
///
/// A malformed or empty stored hash counts as a mismatch, not an error, so
/// the caller reports the same failure for both cases.
#[must_use]
pub fn verify(plain: &str, hashed: &str) -> bool {
    bcrypt::verify(plain, hashed).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrips() {
        let hashed = hash("correct horse battery staple").expect("hash");
        assert!(verify("correct horse battery staple", &hashed));
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let hashed = hash("original").expect("hash");
        assert!(!verify("different", &hashed));
    }

    #[test]
    fn malformed_stored_hash_is_a_mismatch() {
        assert!(!verify("anything", "not-a-bcrypt-hash"));
        assert!(!verify("anything", ""));
    }
}
