//! # Crypto Box
//!
//! The cryptographic primitives a node needs to authenticate and encrypt
//! messages on the classical channel.
//!
//! | Module | Algorithm | Use case |
//! |--------|-----------|----------|
//! | `symmetric` | AES-128-GCM | Per-message encryption of QCHT payloads |
//! | `signing` | RSA-PKCS#1v1.5 / SHA-384 | Frame authentication |

#![warn(missing_docs)]

pub mod errors;
pub mod signing;
pub mod symmetric;

pub use errors::CryptoError;
pub use signing::{Signer, Verifier, DEFAULT_KEY_BITS};
pub use symmetric::{decrypt, encrypt, EncryptedMessage, Nonce, SecretKey};
