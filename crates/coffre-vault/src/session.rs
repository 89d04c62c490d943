//! Session lock controller — when the vault key may live in memory.
//!
//! An explicit state machine decides when access to the unwrapped vault
//! key is permitted versus must be actively cleared:
//!
//! ```text
//!               unlock(method) ok
//!   Locked ────────────────────────► Unlocked
//!     ▲                                 │ lock(reason) /
//!     │         securing delay          │ inactivity / liveness gap
//!     └────────── Securing ◄────────────┘
//! ```
//!
//! `Securing` exists only so a UI can show progress — it is not a
//! security state. The vault key is discarded synchronously the moment
//! `Securing` begins, never when `Locked` is reached: a locked-looking
//! UI must never coincide with a still-resident key.
//!
//! The controller is driven by an external tick (nominal 1 s cadence).
//! A tick that arrives more than [`SessionConfig::liveness_slack`] after
//! its predecessor signals that the process was suspended (device sleep,
//! backgrounded tab) — an explicit proxy for "we cannot trust that no
//! one accessed the device while this process was suspended" — and the
//! session locks with reason `System`.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::error::VaultError;
use crate::keywrap::{self, VaultKey, WrappedKeyRecord};
use crate::recovery::RecoveryCodeSet;
use crate::storage::VaultStore;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default inactivity timeout (5 minutes).
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Liveness gap above which a suspend/sleep is assumed (10 seconds —
/// far beyond plausible scheduler jitter for a 1 s tick).
pub const LIVENESS_SLACK: Duration = Duration::from_secs(10);

/// How long the `Securing` phase lingers before settling to `Locked`.
/// A UX affordance, not a security boundary.
pub const SECURING_DELAY: Duration = Duration::from_millis(400);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Why the session became (or is becoming) locked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockReason {
    /// The user locked the vault explicitly.
    Manual,
    /// No user activity within the configured threshold.
    Inactivity,
    /// A liveness gap revealed a suspended process.
    System,
}

impl LockReason {
    /// String representation for logs and activity events.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Inactivity => "inactivity",
            Self::System => "system",
        }
    }
}

/// Session lock state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockState {
    /// No key in memory. `reason` records what caused the last lock
    /// (`None` at application start).
    Locked {
        /// What caused this lock, if anything has happened yet.
        reason: Option<LockReason>,
    },
    /// Transient settling phase after a lock. The key is already gone.
    Securing {
        /// The reason that will be reported once `Locked` is reached.
        reason: LockReason,
    },
    /// The vault key is resident and usable.
    Unlocked,
}

impl LockState {
    /// `true` for both `Locked` and `Securing` — everywhere the key is
    /// not resident.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        !matches!(self, Self::Unlocked)
    }

    /// `true` only when the key is resident.
    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        matches!(self, Self::Unlocked)
    }
}

/// How the caller is trying to unlock.
///
/// A tagged variant dispatched through the single [`SessionController::unlock`]
/// entry point, so new unlock methods never touch the state machine.
/// The contained secret is zeroized on drop and masked in `Debug`.
pub enum UnlockMethod {
    /// Memorized master password.
    Password(String),
    /// One of the ten recovery codes.
    RecoveryCode(String),
}

impl UnlockMethod {
    /// Label for logs and activity events — never includes the secret.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Password(_) => "password",
            Self::RecoveryCode(_) => "recovery_code",
        }
    }
}

impl Drop for UnlockMethod {
    fn drop(&mut self) {
        match self {
            Self::Password(secret) | Self::RecoveryCode(secret) => secret.zeroize(),
        }
    }
}

impl std::fmt::Debug for UnlockMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password(_) => f.write_str("UnlockMethod::Password(***)"),
            Self::RecoveryCode(_) => f.write_str("UnlockMethod::RecoveryCode(***)"),
        }
    }
}

/// Tunable session parameters.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Lock after this much time without observed user activity.
    /// `Duration::ZERO` disables the inactivity lock.
    pub inactivity_timeout: Duration,
    /// Tick gap above which a suspend is assumed.
    pub liveness_slack: Duration,
    /// How long `Securing` lingers before settling to `Locked`.
    pub securing_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            liveness_slack: LIVENESS_SLACK,
            securing_delay: SECURING_DELAY,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// The session lock controller.
///
/// Owns the only mutable copy of the vault key. The key is written
/// exactly once per unlock, borrowed read-only by any number of field
/// cipher calls while `Unlocked`, and dropped (zeroized by
/// [`VaultKey`]'s drop, not merely dereferenced) on every transition out
/// of `Unlocked` — including when the controller itself is dropped at
/// process teardown.
pub struct SessionController<S: VaultStore> {
    store: S,
    user_id: String,
    config: SessionConfig,
    state: LockState,
    vault_key: Option<VaultKey>,
    last_activity_at: Instant,
    last_tick_at: Instant,
    securing_since: Option<Instant>,
}

impl<S: VaultStore> SessionController<S> {
    /// Create a controller in the initial `Locked { reason: None }` state.
    #[must_use]
    pub fn new(store: S, user_id: impl Into<String>, config: SessionConfig) -> Self {
        let now = Instant::now();
        Self {
            store,
            user_id: user_id.into(),
            config,
            state: LockState::Locked { reason: None },
            vault_key: None,
            last_activity_at: now,
            last_tick_at: now,
            securing_since: None,
        }
    }

    /// Current lock state.
    #[must_use]
    pub const fn state(&self) -> LockState {
        self.state
    }

    /// Borrow the live vault key — `Some` only while `Unlocked`.
    ///
    /// This borrow is the capability callers hand to the field cipher;
    /// it cannot outlive the next state transition.
    #[must_use]
    pub fn vault_key(&self) -> Option<&VaultKey> {
        match self.state {
            LockState::Unlocked => self.vault_key.as_ref(),
            LockState::Locked { .. } | LockState::Securing { .. } => None,
        }
    }

    /// Attempt to unlock with the given method.
    ///
    /// Never panics and never surfaces an error: every failure mode —
    /// wrong password, wrong code, storage failure, malformed stored
    /// record — is `false` to the caller, with no partial unlock and no
    /// key retained. Only internal logs distinguish the causes.
    pub fn unlock(&mut self, method: &UnlockMethod) -> bool {
        let label = method.label();
        match self.try_unlock(method) {
            Ok(key) => {
                let now = Instant::now();
                self.vault_key = Some(key);
                self.state = LockState::Unlocked;
                self.securing_since = None;
                self.last_activity_at = now;
                self.last_tick_at = now;
                info!(method = label, "session unlocked");
                self.append_event("vault_unlocked", Some(serde_json::json!({ "method": label })));
                true
            }
            Err(cause) => {
                // The caller sees a bare `false`; the cause stays here.
                debug!(method = label, %cause, "unlock attempt failed");
                false
            }
        }
    }

    /// Lock the session.
    ///
    /// The vault key is discarded *now*, synchronously, as `Securing`
    /// begins — the settling delay that follows is presentation only.
    /// No-op unless currently `Unlocked`.
    pub fn lock(&mut self, reason: LockReason) {
        if !self.state.is_unlocked() {
            return;
        }
        self.vault_key = None;
        self.state = LockState::Securing { reason };
        self.securing_since = Some(Instant::now());
        info!(reason = reason.as_str(), "session locking");
        self.append_event(
            "vault_locked",
            Some(serde_json::json!({ "reason": reason.as_str() })),
        );
    }

    /// Observe user activity (pointer/key/scroll/click), resetting the
    /// inactivity countdown.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity_at = now;
    }

    /// Periodic liveness tick, nominally every second.
    ///
    /// Advances `Securing` to `Locked` after the settling delay, fires
    /// the inactivity lock, and detects suspend gaps. Callers stop
    /// ticking once the state settles to `Locked` and resume on unlock;
    /// ticking in any state is safe.
    pub fn tick(&mut self, now: Instant) {
        let gap = now.saturating_duration_since(self.last_tick_at);

        match self.state {
            LockState::Unlocked => {
                if gap > self.config.liveness_slack {
                    // The process was suspended for longer than plausible
                    // scheduler jitter; the device may have changed hands.
                    debug!(gap_ms = gap.as_millis(), "liveness gap exceeded");
                    self.lock(LockReason::System);
                } else if self.config.inactivity_timeout > Duration::ZERO
                    && now.saturating_duration_since(self.last_activity_at)
                        >= self.config.inactivity_timeout
                {
                    self.lock(LockReason::Inactivity);
                }
            }
            LockState::Securing { reason } => {
                let settled = self
                    .securing_since
                    .is_none_or(|since| now.saturating_duration_since(since) >= self.config.securing_delay);
                if settled {
                    self.state = LockState::Locked {
                        reason: Some(reason),
                    };
                    self.securing_since = None;
                }
            }
            LockState::Locked { .. } => {}
        }

        self.last_tick_at = now;
    }

    // -- internal ----------------------------------------------------------

    /// The fallible unlock path. Causes are for logging only — the
    /// public API collapses them all.
    fn try_unlock(&self, method: &UnlockMethod) -> Result<VaultKey, VaultError> {
        match method {
            UnlockMethod::Password(password) => {
                let blob = self
                    .store
                    .read_vault_key_record(&self.user_id)?
                    .ok_or_else(|| VaultError::NotFound(self.user_id.clone()))?;
                let record: WrappedKeyRecord =
                    serde_json::from_str(&blob).map_err(|_| VaultError::CorruptRecord)?;
                keywrap::recover_vault_key(&record, password).ok_or(VaultError::InvalidPassword)
            }
            UnlockMethod::RecoveryCode(code) => {
                let blob = self
                    .store
                    .read_recovery_record(&self.user_id)?
                    .ok_or_else(|| VaultError::NotFound(self.user_id.clone()))?;
                let mut set: RecoveryCodeSet =
                    serde_json::from_str(&blob).map_err(|_| VaultError::CorruptRecord)?;
                let (index, key) = set
                    .verify_and_recover(code)
                    .ok_or(VaultError::InvalidRecoveryCode)?;

                // Informational tracking only — the code stays valid
                // until the whole set is regenerated. Failure to persist
                // the marker never fails the unlock.
                set.mark_used(index);
                match serde_json::to_string(&set) {
                    Ok(updated) => {
                        if let Err(err) = self.store.write_recovery_record(&self.user_id, &updated)
                        {
                            warn!(%err, "failed to persist recovery-code usage marker");
                        }
                    }
                    Err(err) => warn!(%err, "failed to serialize recovery record"),
                }

                Ok(key)
            }
        }
    }

    /// Append an activity event, logging (not surfacing) failures —
    /// audit is advisory and never blocks a state transition.
    fn append_event(&self, event_type: &str, metadata: Option<serde_json::Value>) {
        if let Err(err) = self
            .store
            .append_activity_event(&self.user_id, event_type, metadata)
        {
            warn!(%err, event_type, "failed to append activity event");
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
