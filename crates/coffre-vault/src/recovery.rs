//! Recovery codes — ten independent unlock paths for the vault key.
//!
//! This module provides:
//! - [`RecoveryCodeSet::generate`] — ten human-enterable codes, each
//!   independently wrapping the same vault key
//! - [`RecoveryCodeSet::verify_and_recover`] — exact-match lookup, then
//!   unwrap
//! - informational used-index tracking (codes stay valid until the whole
//!   set is regenerated)
//!
//! # Code Format
//!
//! - **Alphabet**: 32 characters — `abcdefghjkmnopqrstuvwxyz23456789`
//!   (excludes ambiguous glyphs: 0/O, 1/l/i)
//! - **Grouping**: two 5-character groups joined by a dash, e.g.
//!   `mk3vq-8wnpe`
//! - **Entropy**: 10 chars × 5 bits = 50 bits per code
//!
//! # Fixed Context Salt
//!
//! Derivation uses a fixed, implementation-constant salt. Each code
//! already carries 50 bits of CSPRNG entropy, so the salt only needs to
//! prevent cross-protocol key reuse — not add per-record randomness.
//! This must NOT be generalized to the master-password path, which keeps
//! a fresh random salt per record.

use coffre_crypto_core::envelope::{self, WrapContext, WrappedSecret};
use coffre_crypto_core::kdf::{self, KdfParams};
use coffre_crypto_core::CryptoError;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::keywrap::{VaultKey, VAULT_KEY_LEN};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of codes in a set.
pub const CODE_COUNT: usize = 10;

/// Alphabet characters per code (two groups of five).
const CODE_CHARS: usize = 10;

/// Characters per dash-separated group.
const GROUP_SIZE: usize = 5;

/// 32-character alphabet excluding ambiguous glyphs (0/O, 1/l/i).
/// 32 chars = 5 bits per character.
const ALPHABET: &[u8; 32] = b"abcdefghjkmnopqrstuvwxyz23456789";

/// Fixed context salt for recovery-code derivation (see module docs).
const RECOVERY_KDF_SALT: &[u8] = b"coffre-recovery-code-kdf-v1";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Ten recovery codes with their index-aligned vault-key wrappings.
///
/// `encrypted_vault_keys[i]` is the vault key sealed under a key derived
/// solely from `codes[i]` — each code fully and independently recovers
/// the vault key, and corruption of one wrapping never affects the other
/// nine. Regeneration replaces the entire set in one persisted write;
/// there is no partial-set regeneration.
#[must_use = "the recovery record must be persisted"]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryCodeSet {
    /// Human-enterable codes, dash-grouped (`xxxxx-xxxxx`).
    pub codes: Vec<String>,
    /// Hex envelopes, index-aligned with `codes`.
    pub encrypted_vault_keys: Vec<String>,
    /// Indices that have recovered the key at least once. Informational
    /// only — a used code remains valid until the whole set is
    /// regenerated.
    #[serde(default)]
    pub used: Vec<usize>,
}

impl RecoveryCodeSet {
    /// Generate a fresh set of [`CODE_COUNT`] codes wrapping `vault_key`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` variants if the CSPRNG, derivation, or
    /// sealing fails.
    pub fn generate(vault_key: &VaultKey) -> Result<Self, CryptoError> {
        let mut codes = Vec::with_capacity(CODE_COUNT);
        let mut encrypted_vault_keys = Vec::with_capacity(CODE_COUNT);

        for _ in 0..CODE_COUNT {
            let code = random_code();
            let wrapped = wrap_under_code(vault_key, &code)?;
            codes.push(code);
            encrypted_vault_keys.push(wrapped.to_hex());
        }

        Ok(Self {
            codes,
            encrypted_vault_keys,
            used: Vec::new(),
        })
    }

    /// Look up `input` and, on an exact match, unwrap the matching
    /// envelope.
    ///
    /// No match means no derivation is attempted at all — there is no
    /// point paying the KDF cost for input that cannot succeed — but the
    /// result is still the same uniform `None` as a failed unwrap, so
    /// the caller cannot tell "unknown code" from "wrapping did not
    /// open".
    ///
    /// Input is normalized before comparison: case-insensitive, dashes
    /// and surrounding whitespace ignored.
    #[must_use]
    pub fn verify_and_recover(&self, input: &str) -> Option<(usize, VaultKey)> {
        let normalized = normalize_code(input);
        let index = self
            .codes
            .iter()
            .position(|code| normalize_code(code) == normalized)?;

        let wrapped = WrappedSecret::from_hex(self.encrypted_vault_keys.get(index)?).ok()?;
        let wrapping_key = derive_code_key(&normalized).ok()?;
        let plaintext =
            envelope::unwrap(&wrapped, wrapping_key.expose(), WrapContext::RecoveryCode).ok()?;

        if plaintext.len() != VAULT_KEY_LEN {
            return None;
        }
        let mut bytes = [0u8; VAULT_KEY_LEN];
        bytes.copy_from_slice(plaintext.expose());
        let key = VaultKey::from_bytes(bytes);
        bytes.zeroize();
        Some((index, key))
    }

    /// Record that the code at `index` has been used. Idempotent.
    pub fn mark_used(&mut self, index: usize) {
        if index < self.codes.len() && !self.used.contains(&index) {
            self.used.push(index);
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Generate one random dash-grouped code.
///
/// The alphabet has exactly 32 entries, so masking a CSPRNG byte to five
/// bits samples it uniformly — no modulo bias.
fn random_code() -> String {
    let mut raw = [0u8; CODE_CHARS];
    OsRng.fill_bytes(&mut raw);

    let mut code = String::with_capacity(CODE_CHARS.saturating_add(1));
    for (i, byte) in raw.iter().enumerate() {
        if i == GROUP_SIZE {
            code.push('-');
        }
        code.push(char::from(ALPHABET[usize::from(byte & 0x1F)]));
    }
    raw.zeroize();
    code
}

/// Normalize a code for comparison and derivation: lowercase, dashes and
/// surrounding whitespace stripped.
fn normalize_code(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Derive the wrapping key for a normalized code.
fn derive_code_key(
    normalized_code: &str,
) -> Result<coffre_crypto_core::SecretBuffer, CryptoError> {
    kdf::derive(
        normalized_code.as_bytes(),
        RECOVERY_KDF_SALT,
        &KdfParams::recovery_code(),
    )
}

/// Seal the vault key under one code.
fn wrap_under_code(vault_key: &VaultKey, code: &str) -> Result<WrappedSecret, CryptoError> {
    let normalized = normalize_code(code);
    let wrapping_key = derive_code_key(&normalized)?;
    envelope::wrap(
        vault_key.expose(),
        wrapping_key.expose(),
        WrapContext::RecoveryCode,
    )
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vault_key() -> VaultKey {
        VaultKey::from_bytes([0x42; VAULT_KEY_LEN])
    }

    #[test]
    fn generate_produces_ten_aligned_codes() {
        let set = RecoveryCodeSet::generate(&test_vault_key()).expect("generate should succeed");
        assert_eq!(set.codes.len(), CODE_COUNT);
        assert_eq!(set.encrypted_vault_keys.len(), CODE_COUNT);
        assert!(set.used.is_empty());
    }

    #[test]
    fn codes_have_dash_grouped_format() {
        let set = RecoveryCodeSet::generate(&test_vault_key()).expect("generate should succeed");
        for code in &set.codes {
            assert_eq!(code.len(), 11, "5 + dash + 5");
            let groups: Vec<&str> = code.split('-').collect();
            assert_eq!(groups.len(), 2);
            assert!(groups.iter().all(|g| g.len() == GROUP_SIZE));
        }
    }

    #[test]
    fn codes_exclude_ambiguous_characters() {
        let set = RecoveryCodeSet::generate(&test_vault_key()).expect("generate should succeed");
        for code in &set.codes {
            for ch in code.chars().filter(|c| *c != '-') {
                assert!(
                    ch != '0' && ch != 'O' && ch != '1' && ch != 'l' && ch != 'i',
                    "code must not contain ambiguous char '{ch}' (code: {code})"
                );
                assert!(ALPHABET.contains(&(ch as u8)), "char '{ch}' outside alphabet");
            }
        }
    }

    #[test]
    fn codes_are_distinct() {
        let set = RecoveryCodeSet::generate(&test_vault_key()).expect("generate should succeed");
        for (i, a) in set.codes.iter().enumerate() {
            for b in set.codes.iter().skip(i.saturating_add(1)) {
                assert_ne!(a, b, "codes must be distinct");
            }
        }
    }

    #[test]
    fn each_code_independently_recovers_the_vault_key() {
        let key = test_vault_key();
        let set = RecoveryCodeSet::generate(&key).expect("generate should succeed");
        for code in &set.codes {
            let (_, recovered) = set
                .verify_and_recover(code)
                .expect("every code must recover the vault key");
            assert_eq!(recovered.expose(), key.expose());
        }
    }

    #[test]
    fn recover_by_index_three() {
        let key = test_vault_key();
        let set = RecoveryCodeSet::generate(&key).expect("generate should succeed");
        let (index, recovered) = set
            .verify_and_recover(&set.codes[3])
            .expect("code 3 must recover the vault key");
        assert_eq!(index, 3);
        assert_eq!(recovered.expose(), key.expose());
    }

    #[test]
    fn unknown_code_returns_none() {
        let set = RecoveryCodeSet::generate(&test_vault_key()).expect("generate should succeed");
        assert!(set.verify_and_recover("not-a-real-code").is_none());
        assert!(set.verify_and_recover("").is_none());
    }

    #[test]
    fn verify_is_case_and_dash_insensitive() {
        let key = test_vault_key();
        let set = RecoveryCodeSet::generate(&key).expect("generate should succeed");
        let sloppy = format!("  {}  ", set.codes[0].to_uppercase().replace('-', ""));
        let (index, recovered) = set
            .verify_and_recover(&sloppy)
            .expect("normalized input must match");
        assert_eq!(index, 0);
        assert_eq!(recovered.expose(), key.expose());
    }

    #[test]
    fn corrupting_one_wrapping_leaves_the_other_nine_intact() {
        let key = test_vault_key();
        let mut set = RecoveryCodeSet::generate(&key).expect("generate should succeed");

        // Corrupt entry 4's envelope.
        let mut bytes = std::mem::take(&mut set.encrypted_vault_keys[4]).into_bytes();
        bytes[30] = if bytes[30] == b'0' { b'1' } else { b'0' };
        set.encrypted_vault_keys[4] = String::from_utf8(bytes).expect("still ASCII");

        assert!(
            set.verify_and_recover(&set.codes[4]).is_none(),
            "corrupted wrapping must fail"
        );
        for i in (0..CODE_COUNT).filter(|i| *i != 4) {
            let (_, recovered) = set
                .verify_and_recover(&set.codes[i])
                .expect("untouched wrappings must still recover");
            assert_eq!(recovered.expose(), key.expose());
        }
    }

    #[test]
    fn one_code_does_not_open_another_wrapping() {
        let key = test_vault_key();
        let set = RecoveryCodeSet::generate(&key).expect("generate should succeed");

        // Swap two envelopes: code 0 presented against code 1's wrapping.
        let mut crossed = set.clone();
        crossed.encrypted_vault_keys.swap(0, 1);
        assert!(crossed.verify_and_recover(&crossed.codes[0]).is_none());
    }

    #[test]
    fn regeneration_produces_an_entirely_new_set() {
        let key = test_vault_key();
        let old = RecoveryCodeSet::generate(&key).expect("generate should succeed");
        let new = RecoveryCodeSet::generate(&key).expect("generate should succeed");

        for code in &old.codes {
            assert!(
                !new.codes.contains(code),
                "regenerated set must not reuse codes"
            );
            assert!(new.verify_and_recover(code).is_none());
        }
    }

    #[test]
    fn mark_used_is_idempotent_and_bounded() {
        let mut set =
            RecoveryCodeSet::generate(&test_vault_key()).expect("generate should succeed");
        set.mark_used(3);
        set.mark_used(3);
        set.mark_used(99);
        assert_eq!(set.used, vec![3]);
    }

    #[test]
    fn used_code_remains_valid() {
        let key = test_vault_key();
        let mut set = RecoveryCodeSet::generate(&key).expect("generate should succeed");
        let (index, _) = set.verify_and_recover(&set.codes[7]).expect("recover");
        set.mark_used(index);
        // Deliberate design trade-off: use does not revoke.
        let (_, again) = set
            .verify_and_recover(&set.codes[7])
            .expect("used code must stay valid until regeneration");
        assert_eq!(again.expose(), key.expose());
    }

    #[test]
    fn record_serde_roundtrip_matches_wire_shape() {
        let set = RecoveryCodeSet::generate(&test_vault_key()).expect("generate should succeed");
        let json = serde_json::to_string(&set).expect("serialize should succeed");
        assert!(json.contains("\"codes\""));
        assert!(json.contains("encryptedVaultKeys"));
        let restored: RecoveryCodeSet =
            serde_json::from_str(&json).expect("deserialize should succeed");
        assert_eq!(restored, set);
    }

    #[test]
    fn used_field_defaults_when_absent() {
        let set = RecoveryCodeSet::generate(&test_vault_key()).expect("generate should succeed");
        let mut value: serde_json::Value =
            serde_json::to_value(&set).expect("to_value should succeed");
        value
            .as_object_mut()
            .expect("object")
            .remove("used");
        let restored: RecoveryCodeSet =
            serde_json::from_value(value).expect("deserialize should succeed");
        assert!(restored.used.is_empty());
    }
}
