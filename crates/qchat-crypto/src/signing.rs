//! RSA-PKCS#1v1.5 signing and verification over SHA-384, used to authenticate
//! every framed message that the router marks `verify`.

use crate::CryptoError;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha384;

/// Default RSA modulus size for freshly generated keys. The source used
/// 1024 bits; callers wanting 1024-bit interop for test vectors should call
/// [`Signer::generate`] with that size explicitly.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Holds a private key and can produce signatures over arbitrary byte
/// strings.
pub struct Signer {
    key: SigningKey<Sha384>,
}

impl Signer {
    /// Generates a fresh RSA key of `bits` size.
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        Ok(Self { key: SigningKey::new(private_key) })
    }

    /// Restores a signer from a PKCS#1 DER-encoded private key.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self, CryptoError> {
        let private_key =
            RsaPrivateKey::from_pkcs1_der(der).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { key: SigningKey::new(private_key) })
    }

    /// Returns the matching public key's PKCS#1 DER encoding.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CryptoError> {
        self.key
            .as_ref()
            .to_pkcs1_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Signs `data`, returning the raw PKCS#1v1.5 signature bytes.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.key.sign_with_rng(&mut rand::thread_rng(), data).to_bytes().to_vec()
    }
}

/// Holds a public key and can check signatures produced by its matching
/// [`Signer`].
pub struct Verifier {
    key: VerifyingKey<Sha384>,
}

impl Verifier {
    /// Loads a verifier from a PKCS#1 DER-encoded public key.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self, CryptoError> {
        let public_key =
            RsaPublicKey::from_pkcs1_der(der).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { key: VerifyingKey::new(public_key) })
    }

    /// Verifies `sig` over `data`, returning `true` iff it matches.
    pub fn verify(&self, data: &[u8], sig: &[u8]) -> bool {
        let Ok(signature) = Signature::try_from(sig) else {
            return false;
        };
        self.key.verify(data, &signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let signer = Signer::generate(1024).unwrap();
        let verifier = Verifier::from_pkcs1_der(&signer.public_key_der().unwrap()).unwrap();

        let sig = signer.sign(b"hello qchat");
        assert!(verifier.verify(b"hello qchat", &sig));
    }

    #[test]
    fn test_tampered_message_fails_verification() {
        let signer = Signer::generate(1024).unwrap();
        let verifier = Verifier::from_pkcs1_der(&signer.public_key_der().unwrap()).unwrap();

        let sig = signer.sign(b"hello qchat");
        assert!(!verifier.verify(b"goodbye qchat", &sig));
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let signer1 = Signer::generate(1024).unwrap();
        let signer2 = Signer::generate(1024).unwrap();
        let verifier = Verifier::from_pkcs1_der(&signer2.public_key_der().unwrap()).unwrap();

        let sig = signer1.sign(b"hello qchat");
        assert!(!verifier.verify(b"hello qchat", &sig));
    }
}
