//! # Crypto Box
//!
//! AES-GCM authenticated encryption with a 16-byte (AES-128) key, matching
//! the wire format's `(nonce, ciphertext, tag)` triple.

use crate::CryptoError;
use aes_gcm::{
    aead::{AeadMutInPlace, KeyInit},
    Aes128Gcm, Nonce as AesNonce, Tag,
};
use zeroize::Zeroize;

/// Symmetric message key (128-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; 16]);

impl SecretKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generates a random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// 96-bit AES-GCM nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; 12]);

impl Nonce {
    /// Creates a nonce from raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Returns the raw nonce bytes.
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// A complete encrypted message: a fresh nonce, the ciphertext, and the
/// 16-byte authentication tag.
pub struct EncryptedMessage {
    /// Nonce used for this encryption, generated fresh per call.
    pub nonce: Nonce,
    /// Ciphertext bytes (same length as the plaintext).
    pub ciphertext: Vec<u8>,
    /// 16-byte GCM authentication tag.
    pub tag: [u8; 16],
}

/// Encrypts `plaintext` under `key`, returning a fresh nonce alongside the
/// ciphertext and authentication tag.
pub fn encrypt(key: &SecretKey, plaintext: &[u8]) -> Result<EncryptedMessage, CryptoError> {
    let mut cipher = Aes128Gcm::new(key.as_bytes().into());
    let nonce = Nonce::generate();
    let mut buffer = plaintext.to_vec();

    let tag = cipher
        .encrypt_in_place_detached(AesNonce::from_slice(nonce.as_bytes()), b"", &mut buffer)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedMessage { nonce, ciphertext: buffer, tag: tag.into() })
}

/// Decrypts and verifies `(nonce, ciphertext, tag)` under `key`.
///
/// Returns [`CryptoError::AuthFailure`] if the tag does not verify.
pub fn decrypt(
    key: &SecretKey,
    nonce: &Nonce,
    ciphertext: &[u8],
    tag: &[u8; 16],
) -> Result<Vec<u8>, CryptoError> {
    let mut cipher = Aes128Gcm::new(key.as_bytes().into());
    let mut buffer = ciphertext.to_vec();

    cipher
        .decrypt_in_place_detached(
            AesNonce::from_slice(nonce.as_bytes()),
            b"",
            &mut buffer,
            Tag::from_slice(tag),
        )
        .map_err(|_| CryptoError::AuthFailure)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = SecretKey::generate();
        let plaintext = b"Hello, qchat!";

        let msg = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &msg.nonce, &msg.ciphertext, &msg.tag).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = SecretKey::generate();
        let key2 = SecretKey::generate();
        let plaintext = b"Secret message";

        let msg = encrypt(&key1, plaintext).unwrap();
        let result = decrypt(&key2, &msg.nonce, &msg.ciphertext, &msg.tag);

        assert_eq!(result, Err(CryptoError::AuthFailure));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = SecretKey::generate();
        let plaintext = b"Secret message";

        let mut msg = encrypt(&key, plaintext).unwrap();
        msg.ciphertext[0] ^= 0xFF;

        let result = decrypt(&key, &msg.nonce, &msg.ciphertext, &msg.tag);
        assert_eq!(result, Err(CryptoError::AuthFailure));
    }

    #[test]
    fn test_tampered_tag_fails() {
        let key = SecretKey::generate();
        let plaintext = b"Secret message";

        let mut msg = encrypt(&key, plaintext).unwrap();
        msg.tag[0] ^= 0xFF;

        let result = decrypt(&key, &msg.nonce, &msg.ciphertext, &msg.tag);
        assert_eq!(result, Err(CryptoError::AuthFailure));
    }

    #[test]
    fn test_nonce_uniqueness() {
        let n1 = Nonce::generate();
        let n2 = Nonce::generate();
        assert_ne!(n1, n2);
    }
}
