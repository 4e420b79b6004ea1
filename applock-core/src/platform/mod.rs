//! Host capabilities the lock depends on.
//!
//! The core never talks to the operating system directly. Every capability is
//! a trait the host application implements (in Swift or Kotlin through
//! `UniFFI`, or in Rust):
//!
//! - [`CredentialStore`]: secure key-value storage for the passcode
//! - [`PreferenceStore`]: plain boolean preferences
//! - [`BiometricProbe`]: biometric capability check and challenge
//! - [`LifecycleSource`]: app lifecycle notifications
//! - [`LockScreenPresenter`]: shows and hides the lock screen over the top-most screen
//! - [`AppearanceProvider`]: builds the lock screen content
//!
//! ## iOS (Swift)
//! - `CredentialStore`: Keychain generic passwords
//! - `PreferenceStore`: `UserDefaults`
//! - `BiometricProbe`: `LAContext.canEvaluatePolicy` / `evaluatePolicy`
//! - `LifecycleSource`: `NotificationCenter` app notifications
//!
//! ## Android (Kotlin)
//! - `CredentialStore`: `EncryptedSharedPreferences`
//! - `PreferenceStore`: `SharedPreferences`
//! - `BiometricProbe`: `BiometricManager` / `BiometricPrompt`
//! - `LifecycleSource`: `ProcessLifecycleOwner`
//!
//! In-memory implementations for tests live in [`memory`].

use std::sync::Arc;

use strum::{Display, EnumString};

use crate::error::{AppLockResult, BiometricError};

pub mod memory;

/// Opaque secure storage mapping (`service`, `account`) to a secret string.
#[uniffi::export(with_foreign)]
pub trait CredentialStore: Send + Sync {
    /// Reads the secret stored for (`service`, `account`), if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, service: String, account: String) -> AppLockResult<Option<String>>;

    /// Stores `secret` for (`service`, `account`), replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store refuses the write.
    fn set(&self, service: String, account: String, secret: String) -> AppLockResult<()>;

    /// Removes the secret for (`service`, `account`). Removing a missing entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store refuses the delete.
    fn delete(&self, service: String, account: String) -> AppLockResult<()>;
}

/// Boolean preference storage.
#[uniffi::export(with_foreign)]
pub trait PreferenceStore: Send + Sync {
    /// Reads the preference stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get_bool(&self, key: String) -> AppLockResult<Option<bool>>;

    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store refuses the write.
    fn set_bool(&self, key: String, value: bool) -> AppLockResult<()>;
}

/// Biometric sensor of the device.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait BiometricProbe: Send + Sync {
    /// Whether biometric authentication is usable right now (hardware present and enrolled).
    fn is_available(&self) -> bool;

    /// Runs a biometric challenge, showing `reason` to the user.
    ///
    /// # Errors
    ///
    /// Returns the sensor's failure when the challenge does not succeed.
    async fn challenge(&self, reason: String) -> Result<(), BiometricError>;
}

/// Application lifecycle notifications relevant to the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleEvent {
    /// The app moved to the background.
    DidEnterBackground,
    /// The app finished launching.
    DidFinishLaunching,
    /// The app is about to return to the foreground.
    WillEnterForeground,
}

/// Receiver of lifecycle notifications.
#[uniffi::export(with_foreign)]
pub trait LifecycleObserver: Send + Sync {
    /// Called for every lifecycle notification emitted by the source.
    fn on_event(&self, event: LifecycleEvent);
}

/// Emitter of lifecycle notifications.
#[uniffi::export(with_foreign)]
pub trait LifecycleSource: Send + Sync {
    /// Registers `observer` and returns a subscription id for [`Self::unsubscribe`].
    fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) -> u64;

    /// Removes the subscription `id`. Unknown ids are ignored.
    fn unsubscribe(&self, id: u64);
}

/// What the appearance provider knows about the lock being shown.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct LockScreenContext {
    /// Identifier of the lock being shown.
    pub identifier: String,
    /// Whether a biometric unlock can be offered right now.
    pub offer_biometrics: bool,
}

/// Visual content of the lock screen, rendered by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct LockScreenContent {
    /// Headline of the lock screen.
    pub title: Option<String>,
    /// Secondary text of the lock screen.
    pub message: Option<String>,
    /// Whether the screen shows a biometric unlock button.
    pub offer_biometrics: bool,
}

/// Factory of the lock screen content.
#[uniffi::export(with_foreign)]
pub trait AppearanceProvider: Send + Sync {
    /// Builds the content presented when the lock engages.
    fn build_lock_screen(&self, context: LockScreenContext) -> LockScreenContent;
}

/// Appearance used until the host installs its own: empty content.
#[derive(Debug, Default)]
pub struct BlankAppearance;

impl AppearanceProvider for BlankAppearance {
    fn build_lock_screen(&self, _context: LockScreenContext) -> LockScreenContent {
        LockScreenContent::default()
    }
}

/// Host UI layer that shows the lock screen above everything else.
#[uniffi::export(with_foreign)]
pub trait LockScreenPresenter: Send + Sync {
    /// Presents `content` over the current top-most screen.
    ///
    /// Returns once the presentation has completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the host has nothing to present over.
    fn present(&self, content: LockScreenContent) -> AppLockResult<()>;

    /// Dismisses the presented lock screen.
    fn dismiss(&self);
}
