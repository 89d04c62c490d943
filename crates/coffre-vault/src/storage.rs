//! Storage collaborator seam — opaque record persistence.
//!
//! The core never owns persistence. It sees a narrow get/set contract
//! keyed by user identity, with both records travelling as opaque JSON
//! strings whose format is owned by this crate ([`crate::keywrap`] and
//! [`crate::recovery`] define the shapes). Any collaborator failure is
//! surfaced unchanged as [`VaultError::Storage`]; the core performs no
//! implicit retries — retrying a failed password derivation is never
//! useful, and retrying I/O is the caller's policy decision.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::VaultError;

/// Narrow persistence contract consumed by the core.
///
/// Implementations sit on the other side of whatever transport the
/// application uses (HTTP API, local database, test memory). The blobs
/// are opaque at this boundary: the store must return exactly what was
/// written, byte for byte.
pub trait VaultStore {
    /// Read the wrapped-vault-key record, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the collaborator fails.
    fn read_vault_key_record(&self, user_id: &str) -> Result<Option<String>, VaultError>;

    /// Write (create or replace) the wrapped-vault-key record.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the collaborator fails.
    fn write_vault_key_record(&self, user_id: &str, record: &str) -> Result<(), VaultError>;

    /// Read the wrapped-recovery record, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the collaborator fails.
    fn read_recovery_record(&self, user_id: &str) -> Result<Option<String>, VaultError>;

    /// Write (create or replace) the wrapped-recovery record. The whole
    /// record is replaced in one write — recovery-set regeneration
    /// relies on this being atomic at the collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the collaborator fails.
    fn write_recovery_record(&self, user_id: &str, record: &str) -> Result<(), VaultError>;

    /// Append an audit event. Event types and metadata are opaque to
    /// the store.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the collaborator fails.
    fn append_activity_event(
        &self,
        user_id: &str,
        event_type: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), VaultError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// A recorded activity event (test/demo introspection).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityEvent {
    pub user_id: String,
    pub event_type: String,
    pub metadata: Option<serde_json::Value>,
}

/// In-memory [`VaultStore`] backing tests and demos.
///
/// Interior mutability keeps the trait surface `&self` like a real
/// remote collaborator would be.
#[derive(Default)]
pub struct MemoryStore {
    key_records: Mutex<HashMap<String, String>>,
    recovery_records: Mutex<HashMap<String, String>>,
    events: Mutex<Vec<ActivityEvent>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded activity events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    #[must_use]
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl VaultStore for MemoryStore {
    fn read_vault_key_record(&self, user_id: &str) -> Result<Option<String>, VaultError> {
        self.key_records
            .lock()
            .map(|m| m.get(user_id).cloned())
            .map_err(|_| VaultError::Storage("memory store lock poisoned".into()))
    }

    fn write_vault_key_record(&self, user_id: &str, record: &str) -> Result<(), VaultError> {
        self.key_records
            .lock()
            .map(|mut m| {
                m.insert(user_id.to_string(), record.to_string());
            })
            .map_err(|_| VaultError::Storage("memory store lock poisoned".into()))
    }

    fn read_recovery_record(&self, user_id: &str) -> Result<Option<String>, VaultError> {
        self.recovery_records
            .lock()
            .map(|m| m.get(user_id).cloned())
            .map_err(|_| VaultError::Storage("memory store lock poisoned".into()))
    }

    fn write_recovery_record(&self, user_id: &str, record: &str) -> Result<(), VaultError> {
        self.recovery_records
            .lock()
            .map(|mut m| {
                m.insert(user_id.to_string(), record.to_string());
            })
            .map_err(|_| VaultError::Storage("memory store lock poisoned".into()))
    }

    fn append_activity_event(
        &self,
        user_id: &str,
        event_type: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), VaultError> {
        self.events
            .lock()
            .map(|mut e| {
                e.push(ActivityEvent {
                    user_id: user_id.to_string(),
                    event_type: event_type.to_string(),
                    metadata,
                });
            })
            .map_err(|_| VaultError::Storage("memory store lock poisoned".into()))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_start_absent() {
        let store = MemoryStore::new();
        assert!(store.read_vault_key_record("u1").expect("read").is_none());
        assert!(store.read_recovery_record("u1").expect("read").is_none());
    }

    #[test]
    fn write_then_read_returns_exact_blob() {
        let store = MemoryStore::new();
        store
            .write_vault_key_record("u1", "{\"opaque\":true}")
            .expect("write");
        assert_eq!(
            store.read_vault_key_record("u1").expect("read").as_deref(),
            Some("{\"opaque\":true}")
        );
    }

    #[test]
    fn records_are_keyed_by_user() {
        let store = MemoryStore::new();
        store.write_recovery_record("u1", "alpha").expect("write");
        store.write_recovery_record("u2", "beta").expect("write");
        assert_eq!(
            store.read_recovery_record("u1").expect("read").as_deref(),
            Some("alpha")
        );
        assert_eq!(
            store.read_recovery_record("u2").expect("read").as_deref(),
            Some("beta")
        );
    }

    #[test]
    fn write_replaces_previous_record() {
        let store = MemoryStore::new();
        store.write_vault_key_record("u1", "old").expect("write");
        store.write_vault_key_record("u1", "new").expect("write");
        assert_eq!(
            store.read_vault_key_record("u1").expect("read").as_deref(),
            Some("new")
        );
    }

    #[test]
    fn events_append_in_order() {
        let store = MemoryStore::new();
        store
            .append_activity_event("u1", "vault_created", None)
            .expect("append");
        store
            .append_activity_event("u1", "vault_unlocked", Some(serde_json::json!({"m": "p"})))
            .expect("append");
        let events = store.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "vault_created");
        assert_eq!(events[1].event_type, "vault_unlocked");
    }
}
