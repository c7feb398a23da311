//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// AES-GCM encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// AES-GCM tag did not verify at decrypt.
    #[error("authentication tag mismatch")]
    AuthFailure,

    /// RSA key generation failed.
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// A DER blob did not parse as a valid RSA public key.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// A DER blob did not parse as a valid RSA private key.
    #[error("invalid private key")]
    InvalidPrivateKey,
}
