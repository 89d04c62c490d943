//! Account lifecycle ceremonies — provision, rotate, regenerate.
//!
//! This module orchestrates the key hierarchy over the storage
//! collaborator: the vault key is born exactly once, at provisioning,
//! and every later ceremony only changes its wrappings. Two opaque
//! records are persisted per user:
//!
//! - the wrapped-vault-key record (master-password path)
//! - the wrapped-recovery record (ten independent code paths)

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::VaultError;
use crate::keywrap::{self, VaultKey, WrappedKeyRecord};
use crate::recovery::RecoveryCodeSet;
use crate::storage::VaultStore;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Result of a successful provisioning.
///
/// Contains the recovery codes for one-time display and record
/// metadata — never raw key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResult {
    /// The ten recovery codes, shown to the user exactly once.
    pub recovery_codes: Vec<String>,
    /// Fingerprint of the wrapped-key record (16 hex chars).
    pub record_fingerprint: String,
    /// ISO 8601 UTC timestamp of provisioning.
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

/// Provision a credential vault for a user.
///
/// Performs the full key ceremony:
/// 1. Refuse if a wrapped-key record already exists
/// 2. Generate the vault key (the only time it is ever created)
/// 3. Wrap it under the master password (fresh salt, interactive KDF)
/// 4. Generate ten recovery codes, each independently wrapping the key
/// 5. Persist the recovery record, then the key record — the key record
///    is written last so its presence implies a complete provisioning
/// 6. Append a `vault_created` activity event
///
/// The vault key itself never leaves this function: only its two
/// wrapped forms are persisted, and only the codes are returned.
///
/// # Errors
///
/// - [`VaultError::AlreadyProvisioned`] if a record exists
/// - [`VaultError::Storage`] if the collaborator fails
/// - [`VaultError::Crypto`] if key generation or wrapping fails
pub fn create_credential_vault<S: VaultStore>(
    store: &S,
    user_id: &str,
    password: &str,
) -> Result<ProvisionResult, VaultError> {
    if store.read_vault_key_record(user_id)?.is_some() {
        return Err(VaultError::AlreadyProvisioned(user_id.to_string()));
    }

    let vault_key = VaultKey::generate()?;
    let key_record = keywrap::create_wrapped_vault_key(&vault_key, password)?;
    let recovery_set = RecoveryCodeSet::generate(&vault_key)?;

    store.write_recovery_record(user_id, &serialize_record(&recovery_set)?)?;
    store.write_vault_key_record(user_id, &serialize_record(&key_record)?)?;

    let fingerprint = keywrap::record_fingerprint(&key_record);
    info!(user_id, %fingerprint, "credential vault provisioned");
    append_event(store, user_id, "vault_created", None);

    Ok(ProvisionResult {
        recovery_codes: recovery_set.codes,
        record_fingerprint: fingerprint,
        created_at: now_iso8601(),
    })
}

// ---------------------------------------------------------------------------
// Master-password rotation
// ---------------------------------------------------------------------------

/// Rotate the master password for a provisioned user.
///
/// Protocol: (a) recover the vault key under the current password —
/// the whole operation fails here on a wrong password; (b) wrap the
/// same key under the new password with a brand-new salt; (c) persist
/// the replacement record only after both steps succeeded. The vault
/// key value is unchanged, so the recovery record is not touched.
///
/// # Errors
///
/// - [`VaultError::NotFound`] if no record exists for the user
/// - [`VaultError::CorruptRecord`] if the stored record fails parsing
/// - [`VaultError::InvalidPassword`] if the current password is wrong
/// - [`VaultError::Storage`] if the collaborator fails
pub fn rotate_master_password<S: VaultStore>(
    store: &S,
    user_id: &str,
    current_password: &str,
    new_password: &str,
) -> Result<(), VaultError> {
    let record = read_key_record(store, user_id)?;
    let rotated = keywrap::rotate_master_password(&record, current_password, new_password)?;
    store.write_vault_key_record(user_id, &serialize_record(&rotated)?)?;

    info!(
        user_id,
        fingerprint = %keywrap::record_fingerprint(&rotated),
        "master password rotated"
    );
    append_event(store, user_id, "password_rotated", None);
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery-code regeneration
// ---------------------------------------------------------------------------

/// Replace the entire recovery-code set for a user.
///
/// Generates ten fresh codes and wrappings and persists them in one
/// write — the previous set is invalidated atomically, and there is no
/// partial-set regeneration. Requires the live vault key, i.e. an
/// unlocked session: the borrow is the capability.
///
/// # Errors
///
/// - [`VaultError::Storage`] if the collaborator fails
/// - [`VaultError::Crypto`] if code generation or wrapping fails
pub fn regenerate_recovery_codes<S: VaultStore>(
    store: &S,
    user_id: &str,
    vault_key: &VaultKey,
) -> Result<Vec<String>, VaultError> {
    let set = RecoveryCodeSet::generate(vault_key)?;
    store.write_recovery_record(user_id, &serialize_record(&set)?)?;

    info!(user_id, "recovery codes regenerated");
    append_event(store, user_id, "recovery_regenerated", None);
    Ok(set.codes)
}

// ---------------------------------------------------------------------------
// Record helpers
// ---------------------------------------------------------------------------

/// Read and parse the wrapped-key record for a user.
fn read_key_record<S: VaultStore>(
    store: &S,
    user_id: &str,
) -> Result<WrappedKeyRecord, VaultError> {
    let blob = store
        .read_vault_key_record(user_id)?
        .ok_or_else(|| VaultError::NotFound(user_id.to_string()))?;
    serde_json::from_str(&blob).map_err(|_| VaultError::CorruptRecord)
}

/// Serialize a record to its opaque persisted form.
fn serialize_record<T: Serialize>(record: &T) -> Result<String, VaultError> {
    serde_json::to_string(record)
        .map_err(|e| VaultError::Storage(format!("record serialization failed: {e}")))
}

/// Append an activity event, swallowing collaborator failures — audit
/// is advisory and never blocks a ceremony that already succeeded.
fn append_event<S: VaultStore>(
    store: &S,
    user_id: &str,
    event_type: &str,
    metadata: Option<serde_json::Value>,
) {
    if let Err(err) = store.append_activity_event(user_id, event_type, metadata) {
        tracing::warn!(%err, event_type, "failed to append activity event");
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub(crate) fn now_iso8601() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let (year, month, day, hour, minute, second) = epoch_to_utc(duration.as_secs());
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

/// Convert epoch seconds to (year, month, day, hour, minute, second) in UTC.
///
/// Civil calendar computation adapted from Howard Hinnant's
/// `civil_from_days` (valid for years 1970–9999).
#[allow(clippy::arithmetic_side_effects)]
const fn epoch_to_utc(epoch_secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    let secs_per_day: u64 = 86_400;
    let total_days = epoch_secs / secs_per_day;
    let remaining_secs = epoch_secs % secs_per_day;

    let hour = remaining_secs / 3600;
    let minute = (remaining_secs % 3600) / 60;
    let second = remaining_secs % 60;

    // Days since 0000-03-01 (shifted epoch for leap year handling).
    let z = total_days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };

    (year, m, d, hour, minute, second)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
