//! Field cipher — individual sensitive strings under the live vault key.
//!
//! A thin specialization of [`crate::envelope`] scoped to short UTF-8
//! strings (notes, saved usernames). Pure functions of their inputs:
//! the cipher holds no state and never consults the session — callers
//! are responsible for refusing the operation when no live vault key is
//! held.

use crate::envelope::{self, WrapContext, WrappedSecret, KEY_LEN};
use crate::error::CryptoError;

/// Encrypt a short UTF-8 string under the vault key.
///
/// Returns the hex wire form of the envelope, suitable for storing as
/// an opaque field value.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyMaterial` if the key is not exactly
/// 32 bytes, or `CryptoError::Encryption` if the seal operation fails.
pub fn encrypt_field(text: &str, vault_key: &[u8; KEY_LEN]) -> Result<String, CryptoError> {
    let wrapped = envelope::wrap(text.as_bytes(), vault_key, WrapContext::Field)?;
    Ok(wrapped.to_hex())
}

/// Decrypt a field envelope back to its plaintext string.
///
/// Returns `None` on any failure — malformed hex, authentication
/// failure, or invalid UTF-8 after decryption are all collapsed into
/// the same uniform result so the caller learns nothing beyond
/// "this value does not decrypt under this key".
#[must_use]
pub fn decrypt_field(wrapped_hex: &str, vault_key: &[u8; KEY_LEN]) -> Option<String> {
    let wrapped = WrappedSecret::from_hex(wrapped_hex).ok()?;
    let plaintext = envelope::unwrap(&wrapped, vault_key, WrapContext::Field).ok()?;
    String::from_utf8(plaintext.expose().to_vec()).ok()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: [u8; KEY_LEN] = [0x42; KEY_LEN];
    const WRONG_KEY: [u8; KEY_LEN] = [0x43; KEY_LEN];

    #[test]
    fn field_roundtrip() {
        let hex = encrypt_field("saved username", &TEST_KEY).expect("encrypt should succeed");
        let plain = decrypt_field(&hex, &TEST_KEY).expect("decrypt should succeed");
        assert_eq!(plain, "saved username");
    }

    #[test]
    fn field_roundtrip_empty_string() {
        let hex = encrypt_field("", &TEST_KEY).expect("encrypt should succeed");
        assert_eq!(decrypt_field(&hex, &TEST_KEY).as_deref(), Some(""));
    }

    #[test]
    fn field_roundtrip_unicode() {
        let text = "pièce jointe — 添付ファイル";
        let hex = encrypt_field(text, &TEST_KEY).expect("encrypt should succeed");
        assert_eq!(decrypt_field(&hex, &TEST_KEY).as_deref(), Some(text));
    }

    #[test]
    fn decrypt_with_wrong_key_returns_none() {
        let hex = encrypt_field("secret note", &TEST_KEY).expect("encrypt should succeed");
        assert!(decrypt_field(&hex, &WRONG_KEY).is_none());
    }

    #[test]
    fn decrypt_malformed_hex_returns_none() {
        assert!(decrypt_field("zz-not-hex", &TEST_KEY).is_none());
        assert!(decrypt_field("", &TEST_KEY).is_none());
        // Valid hex but shorter than IV + tag.
        assert!(decrypt_field("deadbeef", &TEST_KEY).is_none());
    }

    #[test]
    fn decrypt_tampered_envelope_returns_none() {
        let hex = encrypt_field("secret note", &TEST_KEY).expect("encrypt should succeed");
        let mut bytes: Vec<u8> = hex.into_bytes();
        // Flip one hex digit somewhere in the ciphertext region.
        let mid = bytes.len() / 2;
        bytes[mid] = if bytes[mid] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(bytes).expect("still ASCII");
        assert!(decrypt_field(&tampered, &TEST_KEY).is_none());
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let a = encrypt_field("same", &TEST_KEY).expect("encrypt should succeed");
        let b = encrypt_field("same", &TEST_KEY).expect("encrypt should succeed");
        assert_ne!(a, b, "fresh IV per call must vary the envelope");
    }
}
