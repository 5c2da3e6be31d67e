use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

use super::error::CryptError;

const NONCE_LEN: usize = 12;

/// Symmetric encryption of cookie values, base64 encoded for transport.
pub trait Crypt: Send + Sync {
    fn encrypt_base64(&self, plaintext: &str) -> Result<String, CryptError>;
    fn decrypt_base64(&self, encoded: &str) -> Result<String, CryptError>;
}

/// AES-256-GCM. The encoded payload is `base64(nonce || ciphertext)`.
pub struct AesCrypt {
    cipher: Aes256Gcm,
}

impl AesCrypt {
    /// Build from a raw 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, CryptError> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptError::InvalidKey)?;
        Ok(Self { cipher })
    }

    /// Derive the key as the SHA-256 digest of a passphrase.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CryptError> {
        let digest = Sha256::digest(passphrase.as_bytes());
        Self::new(&digest[..])
    }
}

impl Crypt for AesCrypt {
    fn encrypt_base64(&self, plaintext: &str) -> Result<String, CryptError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptError::Encrypt)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    fn decrypt_base64(&self, encoded: &str) -> Result<String, CryptError> {
        let payload = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptError::Encoding(e.to_string()))?;
        if payload.len() < NONCE_LEN {
            return Err(CryptError::Decrypt);
        }
        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CryptError::Utf8)
    }
}
