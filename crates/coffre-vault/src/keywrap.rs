//! Vault key wrap/unwrap under the master password.
//!
//! This module provides:
//! - [`VaultKey`] — the single 256-bit secret protecting all vault content
//! - [`WrappedKeyRecord`] — the persisted envelope + KDF parameters
//! - [`create_wrapped_vault_key`] — wrap under a password-derived key
//! - [`recover_vault_key`] — unwrap, with a uniform failure shape
//! - [`rotate_master_password`] — re-wrap without changing the key
//!
//! # Key Hierarchy
//!
//! ```text
//! Master Password ──PBKDF2──► Wrapping Key ──► wraps ──► Vault Key
//! Recovery Code   ──PBKDF2──► Wrapping Key ──► wraps ──► Vault Key (same)
//! ```
//!
//! The vault key is generated exactly once, at account creation. Every
//! later operation changes only its wrappings — rotation produces a new
//! envelope under a new salt while recovery-code wrappings stay valid
//! untouched.

use coffre_crypto_core::envelope::{self, WrapContext, WrappedSecret, KEY_LEN};
use coffre_crypto_core::kdf::{self, HashAlg, KdfParams};
use coffre_crypto_core::memory::SecretBytes;
use coffre_crypto_core::CryptoError;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::VaultError;

/// Vault key length in bytes (256 bits).
pub const VAULT_KEY_LEN: usize = KEY_LEN;

/// Salt length in bytes for master-password derivation.
const SALT_LEN: usize = 16;

// ---------------------------------------------------------------------------
// VaultKey
// ---------------------------------------------------------------------------

/// The single symmetric secret that ultimately protects vault content.
///
/// Held only in volatile, session-scoped memory — never persisted in
/// plaintext, never transmitted. The bytes are zeroized on drop and the
/// `Debug`/`Display` output is masked.
pub struct VaultKey(SecretBytes<VAULT_KEY_LEN>);

impl VaultKey {
    /// Generate a fresh vault key from the OS CSPRNG.
    ///
    /// Called exactly once per account, at creation.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self(SecretBytes::random()?))
    }

    /// Take ownership of raw key bytes (no copy remains with the caller).
    #[must_use]
    pub fn from_bytes(bytes: [u8; VAULT_KEY_LEN]) -> Self {
        Self(SecretBytes::new(bytes))
    }

    /// Parse the 64-character lowercase hex representation.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` on bad hex or wrong length.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let mut decoded = data_encoding::HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|e| CryptoError::InvalidKeyMaterial(format!("invalid hex: {e}")))?;
        if decoded.len() != VAULT_KEY_LEN {
            decoded.zeroize();
            return Err(CryptoError::InvalidKeyMaterial(format!(
                "vault key is {} bytes (expected {VAULT_KEY_LEN})",
                decoded.len()
            )));
        }
        let mut bytes = [0u8; VAULT_KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        let key = Self::from_bytes(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// The 64-character lowercase hex representation.
    ///
    /// The caller owns the returned string and is responsible for
    /// zeroizing it once it has served its purpose.
    #[must_use]
    pub fn to_hex(&self) -> String {
        data_encoding::HEXLOWER.encode(self.0.expose())
    }

    /// Expose the raw key bytes for cryptographic operations.
    #[must_use]
    pub const fn expose(&self) -> &[u8; VAULT_KEY_LEN] {
        self.0.expose()
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(***)")
    }
}

// ---------------------------------------------------------------------------
// WrappedKeyRecord
// ---------------------------------------------------------------------------

/// Persisted wrapped-vault-key record.
///
/// Opaque to the storage collaborator; the format is owned here. The
/// salt is stored per record and regenerated on every rotation, so an
/// old envelope and a new one never share derivation inputs.
#[must_use = "the wrapped key record must be persisted"]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKeyRecord {
    /// Hex envelope: the vault key under the password-derived key.
    pub wrapped_vault_key: String,
    /// Hex-encoded 16-byte KDF salt.
    pub kdf_salt: String,
    /// PBKDF2 iteration count used for this record.
    pub kdf_iterations: u32,
    /// PRF hash function used for this record.
    pub kdf_hash: HashAlg,
}

// ---------------------------------------------------------------------------
// Wrap / recover
// ---------------------------------------------------------------------------

/// Wrap the vault key under a master password.
///
/// Generates a fresh 16-byte salt, derives the wrapping key at the
/// interactive iteration count, and seals the vault key. Called once at
/// account creation and again (with a new salt) on every rotation.
///
/// # Errors
///
/// Returns `CryptoError` variants if derivation or sealing fails.
pub fn create_wrapped_vault_key(
    vault_key: &VaultKey,
    password: &str,
) -> Result<WrappedKeyRecord, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let params = KdfParams::interactive();
    let wrapping_key = kdf::derive(password.as_bytes(), &salt, &params)?;

    let wrapped = envelope::wrap(
        vault_key.expose(),
        wrapping_key.expose(),
        WrapContext::MasterPassword,
    )?;

    Ok(WrappedKeyRecord {
        wrapped_vault_key: wrapped.to_hex(),
        kdf_salt: data_encoding::HEXLOWER.encode(&salt),
        kdf_iterations: params.iterations,
        kdf_hash: params.hash,
    })
}

/// Attempt to recover the vault key from a record with a password.
///
/// Returns `None` on any failure — wrong password, malformed record,
/// tampered envelope — without distinguishing why. No error message or
/// timing side channel narrows the search space beyond the KDF cost
/// itself.
#[must_use]
pub fn recover_vault_key(record: &WrappedKeyRecord, password: &str) -> Option<VaultKey> {
    let salt = data_encoding::HEXLOWER_PERMISSIVE
        .decode(record.kdf_salt.as_bytes())
        .ok()?;
    let params = KdfParams {
        iterations: record.kdf_iterations,
        hash: record.kdf_hash,
    };
    let wrapping_key = kdf::derive(password.as_bytes(), &salt, &params).ok()?;

    let wrapped = WrappedSecret::from_hex(&record.wrapped_vault_key).ok()?;
    let plaintext = envelope::unwrap(&wrapped, wrapping_key.expose(), WrapContext::MasterPassword)
        .ok()?;

    if plaintext.len() != VAULT_KEY_LEN {
        return None;
    }
    let mut bytes = [0u8; VAULT_KEY_LEN];
    bytes.copy_from_slice(plaintext.expose());
    let key = VaultKey::from_bytes(bytes);
    bytes.zeroize();
    Some(key)
}

/// Rotate the master password: recover under the current password, then
/// wrap the same vault key under the new one with a fresh salt.
///
/// The whole operation fails if the current password is wrong; the
/// caller persists the returned record only after success, replacing the
/// old one. The vault key value never changes, so recovery-code
/// wrappings remain valid without being touched.
///
/// # Errors
///
/// - [`VaultError::InvalidPassword`] if the current password does not
///   unwrap the record
/// - [`VaultError::Crypto`] if derivation or sealing fails for the new
///   envelope
pub fn rotate_master_password(
    record: &WrappedKeyRecord,
    current_password: &str,
    new_password: &str,
) -> Result<WrappedKeyRecord, VaultError> {
    let vault_key =
        recover_vault_key(record, current_password).ok_or(VaultError::InvalidPassword)?;
    let rotated = create_wrapped_vault_key(&vault_key, new_password)?;
    Ok(rotated)
}

// ---------------------------------------------------------------------------
// Record fingerprint
// ---------------------------------------------------------------------------

/// Compute a short fingerprint of a wrapped-key record.
///
/// First 8 bytes of the BLAKE3 hash over the record JSON, hex-encoded
/// (16 chars). Changes whenever the wrapping changes (rotation), never
/// reveals anything about the key. Intended for support and display
/// flows.
#[must_use]
pub fn record_fingerprint(record: &WrappedKeyRecord) -> String {
    let json = serde_json::to_vec(record).unwrap_or_default();
    let hash = blake3::hash(&json);
    data_encoding::HEXLOWER.encode(&hash.as_bytes()[..8])
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
