#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for the field cipher.

use coffre_crypto_core::field::{decrypt_field, encrypt_field};
use coffre_crypto_core::KEY_LEN;
use proptest::prelude::*;

const PROP_KEY: [u8; KEY_LEN] = [0x5A; KEY_LEN];

proptest! {
    /// Any UTF-8 string roundtrips through the field cipher.
    #[test]
    fn field_roundtrip(text in ".{0,256}") {
        let hex = encrypt_field(&text, &PROP_KEY).expect("encrypt should succeed");
        let plain = decrypt_field(&hex, &PROP_KEY).expect("decrypt should succeed");
        prop_assert_eq!(plain, text);
    }

    /// A wrong key never decrypts a field envelope.
    #[test]
    fn field_wrong_key_fails(text in ".{1,128}", wrong_byte in 0x00u8..0x5A) {
        let hex = encrypt_field(&text, &PROP_KEY).expect("encrypt should succeed");
        let wrong_key = [wrong_byte; KEY_LEN];
        prop_assert!(decrypt_field(&hex, &wrong_key).is_none());
    }
}
