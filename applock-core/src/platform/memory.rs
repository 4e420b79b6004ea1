//! In-memory implementations of the platform traits.
//!
//! These implementations are NOT secure for production use. They back unit
//! and integration tests and the developer CLI.

// Allow certain clippy lints for test-only code
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::Notify;

use crate::error::{AppLockError, AppLockResult, BiometricError};

use super::{
    BiometricProbe, CredentialStore, LifecycleEvent, LifecycleObserver, LifecycleSource,
    LockScreenContent, LockScreenPresenter, PreferenceStore,
};

// =============================================================================
// Memory Credential Store
// =============================================================================

/// Credential store backed by a `HashMap` keyed by (service, account).
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    secrets: RwLock<HashMap<(String, String), String>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.read().unwrap().len()
    }

    /// Returns `true` if no secrets are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.read().unwrap().is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, service: String, account: String) -> AppLockResult<Option<String>> {
        Ok(self.secrets.read().unwrap().get(&(service, account)).cloned())
    }

    fn set(&self, service: String, account: String, secret: String) -> AppLockResult<()> {
        self.secrets
            .write()
            .unwrap()
            .insert((service, account), secret);
        Ok(())
    }

    fn delete(&self, service: String, account: String) -> AppLockResult<()> {
        self.secrets.write().unwrap().remove(&(service, account));
        Ok(())
    }
}

// =============================================================================
// Memory Preference Store
// =============================================================================

/// Preference store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, bool>>,
    fail_reads: AtomicBool,
}

impl MemoryPreferenceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read fail, simulating an unreadable store.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_bool(&self, key: String) -> AppLockResult<Option<bool>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppLockError::PreferenceStore("read refused".to_string()));
        }
        Ok(self.values.read().unwrap().get(&key).copied())
    }

    fn set_bool(&self, key: String, value: bool) -> AppLockResult<()> {
        self.values.write().unwrap().insert(key, value);
        Ok(())
    }
}

// =============================================================================
// Scripted Biometric Probe
// =============================================================================

/// Biometric probe whose availability and challenge outcome are set by the caller.
///
/// When held (see [`Self::hold`]) every challenge waits until
/// [`Self::release`] is called, which lets tests observe the handler while a
/// challenge is in flight.
#[derive(Debug)]
pub struct ScriptedBiometricProbe {
    available: AtomicBool,
    outcome: Mutex<Result<(), BiometricError>>,
    challenges: AtomicUsize,
    held: AtomicBool,
    gate: Notify,
    last_reason: Mutex<Option<String>>,
}

impl ScriptedBiometricProbe {
    /// Creates a probe reporting `available` whose challenges succeed.
    #[must_use]
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            outcome: Mutex::new(Ok(())),
            challenges: AtomicUsize::new(0),
            held: AtomicBool::new(false),
            gate: Notify::new(),
            last_reason: Mutex::new(None),
        }
    }

    /// Changes the reported availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Sets the outcome of subsequent challenges.
    pub fn set_outcome(&self, outcome: Result<(), BiometricError>) {
        *self.outcome.lock().unwrap() = outcome;
    }

    /// Number of challenges started so far.
    #[must_use]
    pub fn challenge_count(&self) -> usize {
        self.challenges.load(Ordering::SeqCst)
    }

    /// Reason passed to the most recent challenge.
    #[must_use]
    pub fn last_reason(&self) -> Option<String> {
        self.last_reason.lock().unwrap().clone()
    }

    /// Makes subsequent challenges wait for [`Self::release`].
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Lets one held challenge complete.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait::async_trait]
impl BiometricProbe for ScriptedBiometricProbe {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn challenge(&self, reason: String) -> Result<(), BiometricError> {
        self.challenges.fetch_add(1, Ordering::SeqCst);
        *self.last_reason.lock().unwrap() = Some(reason);
        if self.held.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        self.outcome.lock().unwrap().clone()
    }
}

// =============================================================================
// Manual Lifecycle
// =============================================================================

/// Lifecycle source whose events are emitted synchronously by the caller.
#[derive(Default)]
pub struct ManualLifecycle {
    observers: Mutex<Vec<(u64, Arc<dyn LifecycleObserver>)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ManualLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualLifecycle")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl ManualLifecycle {
    /// Creates a source without subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every current subscriber, in subscription order.
    pub fn emit(&self, event: LifecycleEvent) {
        // Observers may unsubscribe while handling the event.
        let observers: Vec<_> = self
            .observers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer.on_event(event);
        }
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.observers.lock().unwrap().len()
    }
}

impl LifecycleSource for ManualLifecycle {
    fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.lock().unwrap().push((id, observer));
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.observers
            .lock()
            .unwrap()
            .retain(|(subscription, _)| *subscription != id);
    }
}

// =============================================================================
// Recording Presenter
// =============================================================================

/// Presenter that records what would have been shown.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    presented: AtomicUsize,
    dismissed: AtomicUsize,
    visible: AtomicBool,
    fail_next: AtomicBool,
    last_content: Mutex<Option<LockScreenContent>>,
}

impl RecordingPresenter {
    /// Creates a presenter with nothing shown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed presentations.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }

    /// Number of dismissals.
    #[must_use]
    pub fn dismiss_count(&self) -> usize {
        self.dismissed.load(Ordering::SeqCst)
    }

    /// Whether a lock screen is currently shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Content of the most recent presentation.
    #[must_use]
    pub fn last_content(&self) -> Option<LockScreenContent> {
        self.last_content.lock().unwrap().clone()
    }

    /// Makes the next presentation fail.
    pub fn fail_next_present(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl LockScreenPresenter for RecordingPresenter {
    fn present(&self, content: LockScreenContent) -> AppLockResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AppLockError::Presentation(
                "no visible screen to present over".to_string(),
            ));
        }
        *self.last_content.lock().unwrap() = Some(content);
        self.presented.fetch_add(1, Ordering::SeqCst);
        self.visible.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn dismiss(&self) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
        self.visible.store(false, Ordering::SeqCst);
    }
}
