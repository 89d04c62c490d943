//! `coffre-crypto-core` — Pure cryptographic primitives for COFFRE.
//!
//! This crate is the audit target: zero network, zero async, zero UI
//! dependencies. Everything above it (vault business logic, session
//! control) composes these primitives without adding new cryptography.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;
pub mod envelope;

pub mod field;

pub use envelope::{unwrap, wrap, WrapContext, WrappedSecret, IV_LEN, KEY_LEN, TAG_LEN};
pub use error::CryptoError;
pub use field::{decrypt_field, encrypt_field};
pub use kdf::{
    derive, HashAlg, KdfParams, INTERACTIVE_ITERATIONS, MIN_ITERATIONS, RECOVERY_CODE_ITERATIONS,
};
pub use memory::{disable_core_dumps, SecretBuffer, SecretBytes};
