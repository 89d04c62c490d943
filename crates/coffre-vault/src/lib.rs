//! `coffre-vault` — Vault business logic for COFFRE.
//!
//! Composes `coffre-crypto-core` into the credential-vault core: vault
//! key wrap/unwrap, recovery codes, encrypted archives, the session
//! lock state machine, and the storage collaborator seam.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod storage;

pub mod keywrap;
pub mod recovery;

pub mod archive;

pub mod lifecycle;

pub mod session;

pub use archive::{
    export_archive, import_archive, ArchiveError, ExportArchive, VaultItem, ARCHIVE_FORMAT,
    ARCHIVE_VERSION,
};
pub use error::VaultError;
pub use keywrap::{
    create_wrapped_vault_key, record_fingerprint, recover_vault_key, VaultKey, WrappedKeyRecord,
    VAULT_KEY_LEN,
};
pub use lifecycle::{
    create_credential_vault, regenerate_recovery_codes, rotate_master_password, ProvisionResult,
};
pub use recovery::{RecoveryCodeSet, CODE_COUNT};
pub use session::{
    LockReason, LockState, SessionConfig, SessionController, UnlockMethod,
    DEFAULT_INACTIVITY_TIMEOUT, LIVENESS_SLACK, SECURING_DELAY,
};
pub use storage::{ActivityEvent, MemoryStore, VaultStore};
