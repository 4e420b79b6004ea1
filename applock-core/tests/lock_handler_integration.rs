//! End-to-end lock scenarios driven through the public API and lifecycle events.

use std::sync::Arc;

use applock_core::platform::memory::{
    ManualLifecycle, MemoryCredentialStore, MemoryPreferenceStore, RecordingPresenter,
    ScriptedBiometricProbe,
};
use applock_core::platform::{CredentialStore, LifecycleEvent};
use applock_core::{Lock, LockConfig, LockHandler, UnlockError, UnlockMethod};

struct App {
    credentials: Arc<MemoryCredentialStore>,
    preferences: Arc<MemoryPreferenceStore>,
    probe: Arc<ScriptedBiometricProbe>,
    lifecycle: Arc<ManualLifecycle>,
    presenter: Arc<RecordingPresenter>,
}

impl App {
    fn new(biometrics_available: bool) -> Self {
        Self {
            credentials: Arc::new(MemoryCredentialStore::new()),
            preferences: Arc::new(MemoryPreferenceStore::new()),
            probe: Arc::new(ScriptedBiometricProbe::new(biometrics_available)),
            lifecycle: Arc::new(ManualLifecycle::new()),
            presenter: Arc::new(RecordingPresenter::new()),
        }
    }

    fn lock(&self) -> Lock {
        Lock::new(
            LockConfig::new("vault", "com.example.vault", "app-passcode"),
            self.credentials.clone(),
            self.preferences.clone(),
            self.probe.clone(),
        )
        .expect("create lock")
    }

    fn handler(&self, lock: Lock) -> LockHandler {
        LockHandler::new(
            Arc::new(lock),
            self.lifecycle.clone(),
            self.presenter.clone(),
        )
    }
}

fn passcode(candidate: &str) -> UnlockMethod {
    UnlockMethod::Passcode {
        candidate: candidate.to_string(),
    }
}

#[tokio::test]
async fn test_background_lock_and_passcode_unlock() {
    let app = App::new(false);
    let lock = app.lock();
    lock.set_passcode(Some("1234".to_string())).unwrap();
    let handler = app.handler(lock);

    app.lifecycle.emit(LifecycleEvent::DidEnterBackground);
    assert!(handler.is_locked());

    assert_eq!(
        handler.unlock_with_type(passcode("0000")).await,
        Err(UnlockError::InvalidPasscode)
    );
    assert!(handler.is_locked());
    assert!(app.presenter.is_visible());

    assert_eq!(handler.unlock_with_type(passcode("1234")).await, Ok(()));
    assert!(!handler.is_locked());
    assert!(!app.presenter.is_visible());
}

#[tokio::test]
async fn test_app_without_passcode_never_locks() {
    let app = App::new(true);
    let handler = app.handler(app.lock());
    assert!(!handler.lock().have_passcode().unwrap());

    app.lifecycle.emit(LifecycleEvent::DidFinishLaunching);
    handler.lock_if_needed().unwrap();
    assert!(!handler.is_locked());
    assert_eq!(app.presenter.present_count(), 0);

    assert_eq!(handler.unlock_with_type(UnlockMethod::Biometrics).await, Ok(()));
    assert_eq!(app.probe.challenge_count(), 0);
}

#[tokio::test]
async fn test_biometrics_enabled_but_sensor_unavailable() {
    let app = App::new(false);
    let lock = app.lock();
    lock.set_passcode(Some("1234".to_string())).unwrap();
    lock.set_should_use_biometrics_authentication(true).unwrap();
    let handler = app.handler(lock);
    handler.lock_if_needed().unwrap();

    assert_eq!(
        handler.unlock_with_type(UnlockMethod::Biometrics).await,
        Err(UnlockError::BiometricsUnavailable)
    );
    assert_eq!(app.probe.challenge_count(), 0);
    assert!(handler.is_locked());
}

#[tokio::test]
async fn test_biometric_unlock_after_relaunch() {
    let app = App::new(true);
    app.lock().set_passcode(Some("2468".to_string())).unwrap();

    // A second lock over the same stores sees the persisted passcode and preference.
    let handler = app.handler(app.lock());
    app.lifecycle.emit(LifecycleEvent::DidFinishLaunching);
    assert!(handler.is_locked());
    assert_eq!(
        app.presenter.last_content().map(|content| content.offer_biometrics),
        Some(true)
    );

    assert_eq!(handler.unlock_with_type(UnlockMethod::Biometrics).await, Ok(()));
    assert!(!handler.is_locked());
    assert_eq!(app.probe.challenge_count(), 1);
}

#[test]
fn test_passcode_lives_in_credential_store() {
    let app = App::new(false);
    app.lock().set_passcode(Some("1234".to_string())).unwrap();
    assert_eq!(
        app.credentials
            .get("com.example.vault".to_string(), "app-passcode".to_string())
            .unwrap()
            .as_deref(),
        Some("1234")
    );
}

#[test]
fn test_dropping_handler_releases_lock_screen() {
    let app = App::new(false);
    let lock = app.lock();
    lock.set_passcode(Some("1234".to_string())).unwrap();
    let handler = app.handler(lock);
    app.lifecycle.emit(LifecycleEvent::DidEnterBackground);
    assert!(app.presenter.is_visible());

    drop(handler);
    assert!(!app.presenter.is_visible());
    assert_eq!(app.lifecycle.subscriber_count(), 0);

    // Events after teardown reach nobody.
    app.lifecycle.emit(LifecycleEvent::DidEnterBackground);
    assert_eq!(app.presenter.present_count(), 1);
}
