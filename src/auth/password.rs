use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{AppError, AppResult};

pub fn hash_password(password: &str) -> AppResult<String> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// A stored value that is not a PHC hash (e.g. an unconverted legacy hash) never verifies.
pub fn verify_password(password: &str, hashed: &str) -> AppResult<()> {
    let parsed = PasswordHash::new(hashed).map_err(|_| AppError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::InvalidCredentials)
}

pub fn is_argon2_hash(hashed: &str) -> bool {
    hashed.starts_with("$argon2") && PasswordHash::new(hashed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_original_password() {
        let hashed = hash_password("s3cret").unwrap();
        assert!(is_argon2_hash(&hashed));
        assert!(verify_password("s3cret", &hashed).is_ok());
        assert!(matches!(
            verify_password("wrong", &hashed),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn legacy_hashes_never_verify() {
        let legacy = "pbkdf2_sha256$600000$salt$abc=";
        assert!(!is_argon2_hash(legacy));
        assert!(matches!(
            verify_password("anything", legacy),
            Err(AppError::InvalidCredentials)
        ));
    }
}
