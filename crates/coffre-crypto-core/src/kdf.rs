//! PBKDF2-HMAC key derivation with tiered iteration counts.
//!
//! This module provides:
//! - [`derive`] — derive a 256-bit wrapping key from a password + salt
//! - [`KdfParams`] — serializable parameter set (stored alongside each record)
//! - [`HashAlg`] — supported PRF hash functions
//!
//! # Tiered Iteration Philosophy
//!
//! - **Master-password derivation** uses [`INTERACTIVE_ITERATIONS`]
//!   (100,000) — passwords are attacker-guessable, so cost must be high.
//! - **Recovery-code derivation** uses [`RECOVERY_CODE_ITERATIONS`]
//!   (10,000) — each code already carries 50+ bits of CSPRNG entropy, so
//!   brute-force cost can be lower without weakening the scheme.
//!
//! Both counts keep a single derivation under ~100 ms on typical
//! hardware, so derivation never needs to leave the caller's timeline.

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Output length of the KDF in bytes (256 bits).
const OUTPUT_LEN: usize = 32;

/// Minimum salt length in bytes.
const MIN_SALT_LEN: usize = 16;

/// Iteration count for interactive (master-password) derivation.
pub const INTERACTIVE_ITERATIONS: u32 = 100_000;

/// Iteration count for recovery-code derivation.
pub const RECOVERY_CODE_ITERATIONS: u32 = 10_000;

/// Absolute iteration floor — [`derive`] refuses anything below this.
pub const MIN_ITERATIONS: u32 = 10_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// PRF hash function for PBKDF2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlg {
    /// HMAC-SHA-256 — the default for every wrapping context.
    #[serde(rename = "SHA-256")]
    Sha256,
    /// HMAC-SHA-512 — accepted on import for forward compatibility.
    #[serde(rename = "SHA-512")]
    Sha512,
}

/// PBKDF2 parameter set — stored with each wrapped record.
///
/// The salt travels separately (per-record in the vault-key record,
/// inline in the export archive); this struct carries only the cost
/// parameters that must survive serialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Number of PBKDF2 iterations.
    pub iterations: u32,
    /// PRF hash function.
    pub hash: HashAlg,
}

impl KdfParams {
    /// Parameters for interactive (master-password) derivation.
    #[must_use]
    pub const fn interactive() -> Self {
        Self {
            iterations: INTERACTIVE_ITERATIONS,
            hash: HashAlg::Sha256,
        }
    }

    /// Parameters for recovery-code derivation.
    #[must_use]
    pub const fn recovery_code() -> Self {
        Self {
            iterations: RECOVERY_CODE_ITERATIONS,
            hash: HashAlg::Sha256,
        }
    }
}

// ---------------------------------------------------------------------------
// Core KDF
// ---------------------------------------------------------------------------

/// Derive a 256-bit key from a password and salt using PBKDF2-HMAC.
///
/// Deterministic: the same password, salt, and parameters always yield
/// the same key. The intermediate output buffer is zeroized after
/// copying into the returned [`SecretBuffer`].
///
/// Password strength validation (length, complexity) is the caller's
/// concern — any byte string is accepted, including empty.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if:
/// - The salt is shorter than 16 bytes
/// - The iteration count is below [`MIN_ITERATIONS`]
/// - Secure buffer allocation fails
pub fn derive(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<SecretBuffer, CryptoError> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "salt too short: {} bytes (minimum {MIN_SALT_LEN})",
            salt.len()
        )));
    }
    if params.iterations < MIN_ITERATIONS {
        return Err(CryptoError::KeyDerivation(format!(
            "iteration count too low: {} (minimum {MIN_ITERATIONS})",
            params.iterations
        )));
    }

    let mut output = [0u8; OUTPUT_LEN];
    match params.hash {
        HashAlg::Sha256 => {
            pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, salt, params.iterations, &mut output);
        }
        HashAlg::Sha512 => {
            pbkdf2::pbkdf2_hmac::<sha2::Sha512>(password, salt, params.iterations, &mut output);
        }
    }

    let result = SecretBuffer::new(&output)
        .map_err(|e| CryptoError::KeyDerivation(format!("secure buffer allocation failed: {e}")))?;
    output.zeroize();
    Ok(result)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
