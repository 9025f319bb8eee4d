//! Secret hashing and verification.
//!
//! bcrypt is CPU-bound, so both directions run on the blocking pool.

use crate::error::{AuthError, Result};
use crate::state::SecretHash;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Hash `secret` with the given bcrypt cost.
///
/// # Errors
///
/// Returns [`AuthError::Infrastructure`] if hashing fails or the blocking
/// task is cancelled.
pub async fn hash_secret(secret: &str, cost: u32) -> Result<SecretHash> {
    let secret = secret.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(secret, cost))
        .await
        .map_err(|e| AuthError::Infrastructure(format!("Hashing task failed: {e}")))?
        .map_err(|e| AuthError::Infrastructure(format!("Failed to hash secret: {e}")))?;
    Ok(SecretHash::new(hash))
}

/// Check `secret` against a stored hash.
///
/// # Errors
///
/// Returns [`AuthError::Infrastructure`] if the stored hash is malformed or
/// the blocking task is cancelled. A wrong secret is `Ok(false)`.
pub async fn verify_secret(secret: &str, hash: &SecretHash) -> Result<bool> {
    let secret = secret.to_string();
    let hash = hash.as_str().to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash))
        .await
        .map_err(|e| AuthError::Infrastructure(format!("Verification task failed: {e}")))?
        .map_err(|e| AuthError::Infrastructure(format!("Failed to verify secret: {e}")))
}

/// Random 24-character secret for accounts created without one.
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 18];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let Ok(hash) = hash_secret("secret1", 4).await else {
            unreachable!("hashing with a valid cost succeeds");
        };
        assert_ne!(hash.as_str(), "secret1");
        assert_eq!(verify_secret("secret1", &hash).await, Ok(true));
        assert_eq!(verify_secret("secret2", &hash).await, Ok(false));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_infrastructure() {
        let result = verify_secret("secret1", &SecretHash::new("plaintext".into())).await;
        assert!(matches!(result, Err(AuthError::Infrastructure(_))));
    }

    #[test]
    fn test_generated_secrets_differ() {
        let a = generate_secret();
        assert_eq!(a.len(), 24);
        assert_ne!(a, generate_secret());
    }
}
