#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for PBKDF2 key derivation.

use coffre_crypto_core::kdf::{derive, HashAlg, KdfParams, MIN_ITERATIONS};
use proptest::prelude::*;

/// Smallest accepted parameter set — keeps property runs fast.
const PROP_PARAMS: KdfParams = KdfParams {
    iterations: MIN_ITERATIONS,
    hash: HashAlg::Sha256,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Derivation is deterministic for any password/salt pair.
    #[test]
    fn derive_is_deterministic(
        password in proptest::collection::vec(any::<u8>(), 0..64),
        salt in proptest::collection::vec(any::<u8>(), 16..32),
    ) {
        let a = derive(&password, &salt, &PROP_PARAMS).expect("derive should succeed");
        let b = derive(&password, &salt, &PROP_PARAMS).expect("derive should succeed");
        prop_assert_eq!(a.expose(), b.expose());
    }

    /// Distinct passwords never collide under the same salt.
    #[test]
    fn distinct_passwords_diverge(
        password in proptest::collection::vec(any::<u8>(), 1..64),
        suffix in any::<u8>(),
        salt in proptest::collection::vec(any::<u8>(), 16..32),
    ) {
        let mut other = password.clone();
        other.push(suffix);
        let a = derive(&password, &salt, &PROP_PARAMS).expect("derive should succeed");
        let b = derive(&other, &salt, &PROP_PARAMS).expect("derive should succeed");
        prop_assert_ne!(a.expose(), b.expose());
    }

    /// Salts shorter than 16 bytes are always rejected.
    #[test]
    fn short_salts_rejected(
        password in proptest::collection::vec(any::<u8>(), 0..32),
        salt in proptest::collection::vec(any::<u8>(), 0..16),
    ) {
        prop_assert!(derive(&password, &salt, &PROP_PARAMS).is_err());
    }
}
