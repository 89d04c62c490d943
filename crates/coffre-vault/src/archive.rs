//! Encrypted export/import archive — self-contained vault backups.
//!
//! Serializes an item collection into a portable JSON archive encrypted
//! under a one-time export password, independent of the account's live
//! vault key and KDF parameters.
//!
//! # Security Model
//!
//! - A fresh KDF salt is generated per archive (same interactive
//!   iteration count as the master-password path)
//! - The archive carries its own KDF parameters inline, so a future
//!   import needs only the file and the password — no server state
//! - Compromise of an archive file reveals nothing about the source
//!   vault's key or records
//!
//! Merge policy on import (append-with-duplicate-skip vs. destructive
//! replace) is the caller's concern; this codec only decrypts faithfully
//! or fails loudly.

use coffre_crypto_core::envelope::{self, WrapContext, WrappedSecret};
use coffre_crypto_core::kdf::{self, KdfParams};
use coffre_crypto_core::CryptoError;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::lifecycle::now_iso8601;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Format tag identifying a COFFRE archive.
pub const ARCHIVE_FORMAT: &str = "coffre-archive";

/// Current archive format version.
pub const ARCHIVE_VERSION: u32 = 1;

/// KDF algorithm name written into the archive.
const ARCHIVE_KDF_ALGORITHM: &str = "PBKDF2";

/// Encryption algorithm name written into the archive.
const ARCHIVE_ENC_ALGORITHM: &str = "AES-256-GCM";

/// Salt length in bytes for archive key derivation.
const SALT_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Categorized error for archive operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The input is not a valid archive (bad JSON, wrong format tag,
    /// unsupported version, malformed structure). Detected before any
    /// cryptographic attempt, so precise reporting leaks nothing.
    #[error("invalid archive format: {0}")]
    FormatInvalid(String),

    /// Decryption failed — wrong password and corrupted data are
    /// deliberately indistinguishable.
    #[error("archive decryption failed")]
    DecryptionFailed,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single credential item as carried in the archive payload.
///
/// Inside the archive the secret fields are plaintext — the archive's
/// own encryption protects them. Inside a live vault the same fields
/// are field-cipher envelopes under the vault key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Archive KDF description — algorithm, salt, and cost parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveKdf {
    /// KDF algorithm name (`"PBKDF2"`).
    pub algorithm: String,
    /// Hex-encoded 16-byte salt, generated per archive.
    pub salt: String,
    /// Cost parameters (iterations + PRF hash).
    pub params: KdfParams,
}

/// Archive encryption description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEncryption {
    /// Cipher name (`"AES-256-GCM"`).
    pub algorithm: String,
    /// Always `true`: the IV is carried as the envelope prefix.
    pub iv_included: bool,
}

/// Self-describing encrypted archive file.
#[must_use = "the archive must be written somewhere to be of use"]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportArchive {
    /// Format tag — [`ARCHIVE_FORMAT`].
    pub format: String,
    /// Format version — [`ARCHIVE_VERSION`].
    pub version: u32,
    /// ISO 8601 UTC timestamp of export.
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// KDF parameters for deriving the archive key from the password.
    pub kdf: ArchiveKdf,
    /// Encryption scheme description.
    pub encryption: ArchiveEncryption,
    /// Hex envelope (IV-prefixed) over the serialized item collection.
    pub ciphertext: String,
}

impl ExportArchive {
    /// Serialize the archive to its JSON file form.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encoding` if serialization fails.
    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CryptoError::Encoding(format!("archive serialization failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Export an item collection as a self-contained encrypted archive.
///
/// Generates an independent KDF salt, serializes the items to canonical
/// JSON, seals the payload under the password-derived key, and assembles
/// the self-describing structure. The account's live vault key plays no
/// part — a backup file outlives password rotations and code
/// regenerations.
///
/// # Errors
///
/// Returns `CryptoError` variants if serialization, derivation, or
/// sealing fails.
pub fn export_archive(
    items: &[VaultItem],
    export_password: &str,
) -> Result<ExportArchive, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let params = KdfParams::interactive();
    let archive_key = kdf::derive(export_password.as_bytes(), &salt, &params)?;

    let mut payload = serde_json::to_vec(items)
        .map_err(|e| CryptoError::Encoding(format!("payload serialization failed: {e}")))?;

    let sealed = envelope::wrap(&payload, archive_key.expose(), WrapContext::Archive);
    payload.zeroize();
    let sealed = sealed?;

    Ok(ExportArchive {
        format: ARCHIVE_FORMAT.to_string(),
        version: ARCHIVE_VERSION,
        created_at: now_iso8601(),
        kdf: ArchiveKdf {
            algorithm: ARCHIVE_KDF_ALGORITHM.to_string(),
            salt: data_encoding::HEXLOWER.encode(&salt),
            params,
        },
        encryption: ArchiveEncryption {
            algorithm: ARCHIVE_ENC_ALGORITHM.to_string(),
            iv_included: true,
        },
        ciphertext: sealed.to_hex(),
    })
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Decrypt an archive file back into its item collection.
///
/// Format and version are validated first — cheap, and failing fast on
/// non-archive input reports a precise [`ArchiveError::FormatInvalid`]
/// since structure leaks nothing about secrets. Once cryptography
/// starts, every failure (tag mismatch, UTF-8 error, malformed payload
/// JSON) collapses into [`ArchiveError::DecryptionFailed`]: wrong
/// password and corruption stay indistinguishable, and partial data is
/// never returned.
///
/// # Errors
///
/// - [`ArchiveError::FormatInvalid`] on structural problems
/// - [`ArchiveError::DecryptionFailed`] on any cryptographic failure
pub fn import_archive(archive_json: &str, password: &str) -> Result<Vec<VaultItem>, ArchiveError> {
    let archive: ExportArchive = serde_json::from_str(archive_json)
        .map_err(|e| ArchiveError::FormatInvalid(format!("not an archive: {e}")))?;

    if archive.format != ARCHIVE_FORMAT {
        return Err(ArchiveError::FormatInvalid(format!(
            "unknown format tag '{}'",
            archive.format
        )));
    }
    if archive.version != ARCHIVE_VERSION {
        return Err(ArchiveError::FormatInvalid(format!(
            "unsupported version {} (expected {ARCHIVE_VERSION})",
            archive.version
        )));
    }
    if archive.kdf.algorithm != ARCHIVE_KDF_ALGORITHM {
        return Err(ArchiveError::FormatInvalid(format!(
            "unsupported KDF '{}'",
            archive.kdf.algorithm
        )));
    }
    if archive.encryption.algorithm != ARCHIVE_ENC_ALGORITHM || !archive.encryption.iv_included {
        return Err(ArchiveError::FormatInvalid(format!(
            "unsupported encryption scheme '{}'",
            archive.encryption.algorithm
        )));
    }

    let salt = data_encoding::HEXLOWER_PERMISSIVE
        .decode(archive.kdf.salt.as_bytes())
        .map_err(|e| ArchiveError::FormatInvalid(format!("invalid salt encoding: {e}")))?;

    let sealed = WrappedSecret::from_hex(&archive.ciphertext)
        .map_err(|e| ArchiveError::FormatInvalid(format!("invalid ciphertext encoding: {e}")))?;

    // Parameter validation (salt length, iteration floor) happens inside
    // derive and is still pre-cryptographic — public data only.
    let archive_key = kdf::derive(password.as_bytes(), &salt, &archive.kdf.params)
        .map_err(|e| ArchiveError::FormatInvalid(format!("invalid KDF parameters: {e}")))?;

    let plaintext = envelope::unwrap(&sealed, archive_key.expose(), WrapContext::Archive)
        .map_err(|_| ArchiveError::DecryptionFailed)?;

    // Anything wrong past this point is indistinguishable from a wrong
    // password by design.
    let items: Vec<VaultItem> =
        serde_json::from_slice(plaintext.expose()).map_err(|_| ArchiveError::DecryptionFailed)?;

    Ok(items)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
