//! AES-256-GCM envelope encryption — the universal wrap/unwrap primitive.
//!
//! This module provides:
//! - [`wrap`] — encrypt plaintext under a 256-bit key with a fresh IV
//! - [`unwrap`] — authenticate and decrypt a [`WrappedSecret`]
//! - [`WrappedSecret`] — IV + ciphertext + tag container
//! - [`WrapContext`] — AAD domain-separation tag per wrapping purpose
//!
//! Every envelope in the system — vault key under a password, vault key
//! under a recovery code, item field under the vault key, archive
//! payload under an export password — has this exact shape. The wire
//! form is a single lowercase hex string, `iv ‖ ciphertext ‖ tag`, to
//! keep persisted records text-safe and debuggable.

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// AES-256-GCM IV length in bytes (96 bits, the AEAD standard nonce size).
pub const IV_LEN: usize = 12;

/// AES-256-GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// AES-256-GCM key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Minimum valid serialized length: IV + empty ciphertext + tag.
const MIN_WRAPPED_LEN: usize = IV_LEN + TAG_LEN;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Domain-separation tag for a wrap operation.
///
/// Each context uses a distinct AAD so an envelope produced for one
/// purpose cannot be replayed as another (e.g. a recovery-code wrapping
/// of the vault key cannot be presented as a field envelope).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapContext {
    /// Vault key wrapped under a master-password-derived key.
    MasterPassword,
    /// Vault key wrapped under a recovery-code-derived key.
    RecoveryCode,
    /// Item field wrapped under the live vault key.
    Field,
    /// Archive payload wrapped under an export-password-derived key.
    Archive,
}

impl WrapContext {
    /// AAD bytes for this context.
    #[must_use]
    pub const fn aad(&self) -> &'static [u8] {
        match self {
            Self::MasterPassword => b"coffre-wrap-master-password",
            Self::RecoveryCode => b"coffre-wrap-recovery-code",
            Self::Field => b"coffre-wrap-field",
            Self::Archive => b"coffre-wrap-archive",
        }
    }
}

/// Authenticated ciphertext container — IV + ciphertext + tag.
///
/// The IV is randomly generated per [`wrap`] call and must travel with
/// the ciphertext. The tag authenticates IV, ciphertext, and AAD — any
/// modification causes [`unwrap`] to fail with
/// [`CryptoError::Decryption`].
#[must_use = "wrapped data must be stored or transmitted"]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedSecret {
    /// 96-bit random IV, unique per wrap.
    pub iv: [u8; IV_LEN],
    /// Encrypted data (same length as the original plaintext).
    pub ciphertext: Vec<u8>,
    /// 128-bit authentication tag.
    pub tag: [u8; TAG_LEN],
}

impl WrappedSecret {
    /// Serialize to the binary wire form: `iv ‖ ciphertext ‖ tag`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let capacity = IV_LEN
            .saturating_add(self.ciphertext.len())
            .saturating_add(TAG_LEN);
        let mut out = Vec::with_capacity(capacity);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Deserialize from the binary wire form.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encoding` if the input is shorter than
    /// 28 bytes (12-byte IV + 0-byte ciphertext + 16-byte tag).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_WRAPPED_LEN {
            return Err(CryptoError::Encoding(format!(
                "wrapped secret too short: {} bytes (minimum {MIN_WRAPPED_LEN})",
                bytes.len()
            )));
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[..IV_LEN]);

        let ct_end = bytes.len().saturating_sub(TAG_LEN);
        let ciphertext = bytes[IV_LEN..ct_end].to_vec();

        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[ct_end..]);

        Ok(Self {
            iv,
            ciphertext,
            tag,
        })
    }

    /// Encode to the lowercase hex wire form used in persisted records.
    #[must_use]
    pub fn to_hex(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.to_bytes())
    }

    /// Decode from the hex wire form. Accepts upper- or lowercase digits.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encoding` if the input is not valid hex or
    /// decodes to fewer than 28 bytes.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = data_encoding::HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|e| CryptoError::Encoding(format!("invalid hex encoding: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

// ---------------------------------------------------------------------------
// Wrap / unwrap
// ---------------------------------------------------------------------------

/// Encrypt plaintext under a 256-bit key with a fresh random IV.
///
/// # Arguments
///
/// - `plaintext` — data to wrap (may be empty)
/// - `key` — exactly 32 bytes
/// - `context` — AAD domain-separation tag
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyMaterial` if the key is not exactly
/// 32 bytes, or `CryptoError::Encryption` if the seal operation fails.
pub fn wrap(
    plaintext: &[u8],
    key: &[u8],
    context: WrapContext,
) -> Result<WrappedSecret, CryptoError> {
    let sealing_key = gcm_key(key)?;

    let mut iv_bytes = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv_bytes);
    let nonce = aead::Nonce::assume_unique_for_key(iv_bytes);

    // Seal in place — the plaintext copy becomes the ciphertext.
    let mut in_out = plaintext.to_vec();
    let Ok(tag) = sealing_key.seal_in_place_separate_tag(
        nonce,
        aead::Aad::from(context.aad()),
        &mut in_out,
    ) else {
        in_out.zeroize();
        return Err(CryptoError::Encryption(
            "AES-256-GCM seal operation failed".into(),
        ));
    };

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_ref());

    Ok(WrappedSecret {
        iv: iv_bytes,
        ciphertext: in_out,
        tag: tag_bytes,
    })
}

/// Authenticate and decrypt a [`WrappedSecret`].
///
/// Returns the plaintext as a [`SecretBuffer`] (zeroized on drop), or
/// [`CryptoError::Decryption`] when the tag check fails — never partial
/// or garbage output. Wrong key, wrong password, and corrupted data are
/// indistinguishable by design.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyMaterial` if the key is not exactly
/// 32 bytes, or `CryptoError::Decryption` on authentication failure.
pub fn unwrap(
    wrapped: &WrappedSecret,
    key: &[u8],
    context: WrapContext,
) -> Result<SecretBuffer, CryptoError> {
    let opening_key = gcm_key(key)?;
    let nonce = aead::Nonce::assume_unique_for_key(wrapped.iv);

    // ring's open_in_place wants ciphertext ‖ tag in one buffer.
    let mut ct_tag = Vec::with_capacity(wrapped.ciphertext.len().saturating_add(TAG_LEN));
    ct_tag.extend_from_slice(&wrapped.ciphertext);
    ct_tag.extend_from_slice(&wrapped.tag);

    let plaintext = opening_key
        .open_in_place(nonce, aead::Aad::from(context.aad()), &mut ct_tag)
        .map_err(|_| CryptoError::Decryption)?;

    let result = SecretBuffer::new(plaintext)
        .map_err(|e| CryptoError::SecureMemory(format!("secure buffer allocation failed: {e}")))?;
    ct_tag.zeroize();
    Ok(result)
}

/// Build a GCM key, validating the key length first.
fn gcm_key(key: &[u8]) -> Result<aead::LessSafeKey, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyMaterial(format!(
            "invalid key length: {} bytes (expected {KEY_LEN})",
            key.len()
        )));
    }
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key)
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: [u8; KEY_LEN] = [0xAA; KEY_LEN];
    const WRONG_KEY: [u8; KEY_LEN] = [0xBB; KEY_LEN];

    #[test]
    fn wrap_produces_correct_lengths() {
        let plaintext = b"hello, COFFRE!";
        let wrapped = wrap(plaintext, &TEST_KEY, WrapContext::Field).expect("wrap should succeed");
        assert_eq!(wrapped.iv.len(), IV_LEN);
        assert_eq!(wrapped.tag.len(), TAG_LEN);
        assert_eq!(wrapped.ciphertext.len(), plaintext.len());
    }

    #[test]
    fn wrap_unwrap_roundtrip() {
        let plaintext = b"vault key bytes";
        let wrapped =
            wrap(plaintext, &TEST_KEY, WrapContext::MasterPassword).expect("wrap should succeed");
        let unwrapped =
            unwrap(&wrapped, &TEST_KEY, WrapContext::MasterPassword).expect("unwrap should succeed");
        assert_eq!(unwrapped.expose(), plaintext);
    }

    #[test]
    fn unwrap_fails_on_tampered_ciphertext() {
        let mut tampered =
            wrap(b"test data", &TEST_KEY, WrapContext::Field).expect("wrap should succeed");
        if let Some(byte) = tampered.ciphertext.first_mut() {
            *byte ^= 0xFF;
        }
        let result = unwrap(&tampered, &TEST_KEY, WrapContext::Field);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn unwrap_fails_on_tampered_tag() {
        let mut tampered =
            wrap(b"test data", &TEST_KEY, WrapContext::Field).expect("wrap should succeed");
        tampered.tag[0] ^= 0xFF;
        let result = unwrap(&tampered, &TEST_KEY, WrapContext::Field);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn unwrap_fails_on_tampered_iv() {
        let mut tampered =
            wrap(b"test data", &TEST_KEY, WrapContext::Field).expect("wrap should succeed");
        tampered.iv[0] ^= 0xFF;
        let result = unwrap(&tampered, &TEST_KEY, WrapContext::Field);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn unwrap_fails_with_wrong_key() {
        let wrapped = wrap(b"test data", &TEST_KEY, WrapContext::Field).expect("wrap");
        let result = unwrap(&wrapped, &WRONG_KEY, WrapContext::Field);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn cross_context_unwrap_fails() {
        let wrapped =
            wrap(b"vault key", &TEST_KEY, WrapContext::MasterPassword).expect("wrap");
        let result = unwrap(&wrapped, &TEST_KEY, WrapContext::RecoveryCode);
        assert!(
            matches!(result, Err(CryptoError::Decryption)),
            "AAD mismatch across contexts must fail authentication"
        );
    }

    #[test]
    fn wrap_rejects_wrong_key_length() {
        let short = wrap(b"test", &[0u8; 31], WrapContext::Field);
        assert!(matches!(short, Err(CryptoError::InvalidKeyMaterial(_))));
        let long = wrap(b"test", &[0u8; 33], WrapContext::Field);
        assert!(matches!(long, Err(CryptoError::InvalidKeyMaterial(_))));
    }

    #[test]
    fn wrap_empty_plaintext_succeeds() {
        let wrapped = wrap(&[], &TEST_KEY, WrapContext::Field).expect("wrap empty");
        assert!(wrapped.ciphertext.is_empty());
        let unwrapped = unwrap(&wrapped, &TEST_KEY, WrapContext::Field).expect("unwrap empty");
        assert!(unwrapped.expose().is_empty());
    }

    #[test]
    fn two_wraps_produce_different_ivs() {
        let a = wrap(b"same data", &TEST_KEY, WrapContext::Field).expect("wrap");
        let b = wrap(b"same data", &TEST_KEY, WrapContext::Field).expect("wrap");
        assert_ne!(a.iv, b.iv, "IVs must be fresh per wrap");
    }

    #[test]
    fn hex_roundtrip() {
        let wrapped = wrap(b"hex test", &TEST_KEY, WrapContext::Field).expect("wrap");
        let hex = wrapped.to_hex();
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(
            hex.chars()
                .filter(char::is_ascii_alphabetic)
                .all(|c| c.is_ascii_lowercase()),
            "wire form must be lowercase hex"
        );
        let restored = WrappedSecret::from_hex(&hex).expect("from_hex should succeed");
        assert_eq!(restored, wrapped);
    }

    #[test]
    fn from_hex_accepts_uppercase() {
        let wrapped = wrap(b"case test", &TEST_KEY, WrapContext::Field).expect("wrap");
        let upper = wrapped.to_hex().to_uppercase();
        let restored = WrappedSecret::from_hex(&upper).expect("permissive decode");
        assert_eq!(restored, wrapped);
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let result = WrappedSecret::from_hex("not hex at all!");
        assert!(matches!(result, Err(CryptoError::Encoding(_))));
    }

    #[test]
    fn from_bytes_rejects_short_input() {
        let result = WrappedSecret::from_bytes(&[0u8; 27]);
        assert!(matches!(result, Err(CryptoError::Encoding(_))));
    }

    #[test]
    fn wrapped_secret_serde_roundtrip() {
        let wrapped = wrap(b"serde test", &TEST_KEY, WrapContext::Archive).expect("wrap");
        let json = serde_json::to_string(&wrapped).expect("serialize");
        let restored: WrappedSecret = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, wrapped);
    }

    #[test]
    fn unwrap_output_is_masked_secret_buffer() {
        let wrapped = wrap(b"secret", &TEST_KEY, WrapContext::Field).expect("wrap");
        let unwrapped = unwrap(&wrapped, &TEST_KEY, WrapContext::Field).expect("unwrap");
        assert_eq!(format!("{unwrapped:?}"), "SecretBuffer(***)");
    }
}
