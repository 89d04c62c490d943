//! Cryptographic error types for `coffre-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed (salt/iteration validation, platform failure).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Symmetric encryption failure (AES-256-GCM seal path).
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authentication tag verification failed — ciphertext tampered or wrong key.
    ///
    /// Deliberately carries no detail: wrong password, wrong key, and
    /// corrupted data must stay indistinguishable at every boundary.
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    /// Invalid key material (wrong length, corrupted bytes).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Hex or wire-format decoding failure on an envelope.
    #[error("envelope encoding error: {0}")]
    Encoding(String),

    /// Secure memory allocation failure (CSPRNG, mlock bookkeeping).
    #[error("secure memory error: {0}")]
    SecureMemory(String),
}
