//! Vault error types for `coffre-vault`.

use coffre_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Incorrect master password — the vault key could not be unwrapped.
    #[error("invalid password")]
    InvalidPassword,

    /// Incorrect recovery code (unknown code or failed unwrap).
    #[error("invalid recovery code")]
    InvalidRecoveryCode,

    /// The storage collaborator failed to read or write a record.
    /// Propagated unchanged — the core performs no implicit retries.
    #[error("storage error: {0}")]
    Storage(String),

    /// No vault record exists for this user.
    #[error("vault not found: {0}")]
    NotFound(String),

    /// A vault record already exists for this user.
    #[error("vault already provisioned: {0}")]
    AlreadyProvisioned(String),

    /// A persisted record failed structural parsing.
    /// Safe to report — detected before any cryptographic attempt.
    #[error("stored record is malformed")]
    CorruptRecord,
}
