//! Passcode and biometric credentials of one app lock.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::LockConfig;
use crate::error::{AppLockError, AppLockResult, UnlockError};
use crate::platform::{BiometricProbe, CredentialStore, PreferenceStore};

/// The way a user tries to unlock.
#[derive(Clone, PartialEq, Eq, uniffi::Enum)]
pub enum UnlockMethod {
    /// Run a biometric challenge.
    Biometrics,
    /// Compare the candidate with the stored passcode.
    Passcode {
        /// Passcode entered by the user.
        candidate: String,
    },
}

impl std::fmt::Debug for UnlockMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Biometrics => f.write_str("Biometrics"),
            Self::Passcode { .. } => f
                .debug_struct("Passcode")
                .field("candidate", &"<redacted>")
                .finish(),
        }
    }
}

/// One passcode credential plus the user's preference for biometric unlocking.
///
/// The passcode is kept in the host's [`CredentialStore`]; the biometrics
/// preference in its [`PreferenceStore`]. Nothing is cached, so every read
/// reflects the current state of the stores and of the sensor.
#[derive(uniffi::Object)]
pub struct Lock {
    config: LockConfig,
    credentials: Arc<dyn CredentialStore>,
    preferences: Arc<dyn PreferenceStore>,
    biometrics: Arc<dyn BiometricProbe>,
}

impl std::fmt::Debug for Lock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock")
            .field("identifier", &self.config.identifier)
            .finish_non_exhaustive()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl Lock {
    /// Creates a lock over the given stores and sensor.
    ///
    /// The first lock constructed for an identifier records biometrics as
    /// enabled; an existing preference is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the preference
    /// store cannot be read or written.
    #[uniffi::constructor]
    pub fn new(
        config: LockConfig,
        credentials: Arc<dyn CredentialStore>,
        preferences: Arc<dyn PreferenceStore>,
        biometrics: Arc<dyn BiometricProbe>,
    ) -> AppLockResult<Self> {
        config.validate()?;
        let key = config.biometrics_preference_key();
        if preferences.get_bool(key.clone())?.is_none() {
            log::debug!("no biometrics preference for {}, enabling", config.identifier);
            preferences.set_bool(key, true)?;
        }
        Ok(Self {
            config,
            credentials,
            preferences,
            biometrics,
        })
    }

    /// Identifier of this lock.
    #[must_use]
    pub fn identifier(&self) -> String {
        self.config.identifier.clone()
    }

    /// Whether a passcode is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be read.
    pub fn have_passcode(&self) -> AppLockResult<bool> {
        Ok(self.stored_passcode()?.is_some())
    }

    /// Stores a new passcode, or removes it when `passcode` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`AppLockError::EmptyPasscode`] for an empty passcode, or the
    /// credential store's error.
    pub fn set_passcode(&self, passcode: Option<String>) -> AppLockResult<()> {
        match passcode.map(Zeroizing::new) {
            Some(passcode) if passcode.is_empty() => Err(AppLockError::EmptyPasscode),
            Some(passcode) => {
                self.credentials.set(
                    self.config.service_name.clone(),
                    self.config.account_name.clone(),
                    passcode.to_string(),
                )?;
                log::info!("passcode set for {}", self.config.identifier);
                Ok(())
            }
            None => {
                self.credentials.delete(
                    self.config.service_name.clone(),
                    self.config.account_name.clone(),
                )?;
                log::info!("passcode removed for {}", self.config.identifier);
                Ok(())
            }
        }
    }

    /// Whether `candidate` is exactly the stored passcode.
    ///
    /// Always `false` when no passcode is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be read.
    pub fn validate_passcode(&self, candidate: String) -> AppLockResult<bool> {
        let candidate = Zeroizing::new(candidate);
        Ok(self.stored_passcode()?.is_some_and(|stored| {
            stored.as_bytes().ct_eq(candidate.as_bytes()).into()
        }))
    }

    /// Whether biometric unlocking should be offered: the user enabled it
    /// and the sensor is available right now.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference store cannot be read.
    pub fn should_use_biometrics_authentication(&self) -> AppLockResult<bool> {
        Ok(self.biometrics_enabled()? && self.biometrics.is_available())
    }

    /// The user's biometrics preference as stored, ignoring sensor availability.
    ///
    /// A missing preference reads as enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference store cannot be read.
    pub fn biometrics_enabled(&self) -> AppLockResult<bool> {
        Ok(self
            .preferences
            .get_bool(self.config.biometrics_preference_key())?
            .unwrap_or(true))
    }

    /// Persists the user's biometrics preference, regardless of sensor availability.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference store refuses the write.
    pub fn set_should_use_biometrics_authentication(&self, enabled: bool) -> AppLockResult<()> {
        self.preferences
            .set_bool(self.config.biometrics_preference_key(), enabled)
    }

    /// Whether the biometric sensor is usable right now.
    #[must_use]
    pub fn biometrics_available(&self) -> bool {
        self.biometrics.is_available()
    }

    /// Attempts to unlock with `method`.
    ///
    /// # Errors
    ///
    /// - [`UnlockError::BiometricsUnavailable`] if biometrics were requested
    ///   while the sensor is unavailable or the user disabled them; the sensor
    ///   is not challenged in that case.
    /// - [`UnlockError::BiometricsChallengeFailed`] with the sensor's failure.
    /// - [`UnlockError::InvalidPasscode`] if the candidate does not match.
    /// - [`UnlockError::Storage`] if a store cannot be read.
    pub async fn attempt_unlock(&self, method: UnlockMethod) -> Result<(), UnlockError> {
        match method {
            UnlockMethod::Biometrics => {
                if !self.should_use_biometrics_authentication()? {
                    log::debug!("biometrics unavailable for {}", self.config.identifier);
                    return Err(UnlockError::BiometricsUnavailable);
                }
                self.biometrics
                    .challenge(self.config.biometric_reason.clone())
                    .await
                    .map_err(|cause| {
                        log::info!("biometric challenge failed: {cause}");
                        UnlockError::from(cause)
                    })
            }
            UnlockMethod::Passcode { candidate } => {
                if self.validate_passcode(candidate)? {
                    Ok(())
                } else {
                    log::info!("invalid passcode for {}", self.config.identifier);
                    Err(UnlockError::InvalidPasscode)
                }
            }
        }
    }
}

impl Lock {
    fn stored_passcode(&self) -> AppLockResult<Option<Zeroizing<String>>> {
        Ok(self
            .credentials
            .get(
                self.config.service_name.clone(),
                self.config.account_name.clone(),
            )?
            .map(Zeroizing::new))
    }
}
