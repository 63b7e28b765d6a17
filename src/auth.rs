use argon2::password_hash::{SaltString, rand_core::OsRng as PhOsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Argon2id with a fresh random salt; the PHC string goes in
/// `usuario.password_hash`.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut PhOsRng);
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("argon2 hash error: {e}"))?;
    Ok(phc.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Opaque bearer token handed to the client. Only its SHA-256 fingerprint is
/// stored server-side.
pub fn new_access_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn token_fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_de_password() {
        let phc = hash_password("secreta123").unwrap();
        assert!(verify_password("secreta123", &phc));
        assert!(!verify_password("otra", &phc));
        assert!(!verify_password("secreta123", "not-a-phc-string"));
    }

    #[test]
    fn tokens_son_unicos_y_la_huella_es_estable() {
        let a = new_access_token();
        let b = new_access_token();
        assert_ne!(a, b);
        assert_eq!(token_fingerprint(&a), token_fingerprint(&a));
        assert_ne!(token_fingerprint(&a), token_fingerprint(&b));
    }
}
