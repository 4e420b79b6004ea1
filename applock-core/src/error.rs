use thiserror::Error;

/// Result type for configuration and collaborator operations.
pub type AppLockResult<T> = Result<T, AppLockError>;

/// Errors raised by the lock configuration and the host-provided collaborators.
#[derive(Debug, Error, uniffi::Error)]
pub enum AppLockError {
    /// The lock configuration is not usable.
    #[error("invalid_config: {0}")]
    InvalidConfig(String),

    /// An empty string cannot be stored as a passcode.
    #[error("empty_passcode")]
    EmptyPasscode,

    /// Errors coming from the secure credential store.
    #[error("credential store error: {0}")]
    CredentialStore(String),

    /// Errors coming from the preference store.
    #[error("preference store error: {0}")]
    PreferenceStore(String),

    /// The host could not present the lock screen.
    #[error("presentation error: {0}")]
    Presentation(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for AppLockError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

/// Failure reported by the host's biometric sensor for a challenge.
///
/// Values are passed through to the unlock caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum BiometricError {
    /// The user dismissed the prompt.
    #[error("user_cancel")]
    UserCancel,
    /// The user chose the passcode fallback instead.
    #[error("user_fallback")]
    UserFallback,
    /// The system cancelled the prompt (e.g. another app came to the foreground).
    #[error("system_cancel")]
    SystemCancel,
    /// Too many failed attempts; the sensor is locked out.
    #[error("lockout")]
    Lockout,
    /// No biometric identity is enrolled on the device.
    #[error("not_enrolled")]
    NotEnrolled,
    /// The presented biometric did not match.
    #[error("authentication_failed")]
    AuthenticationFailed,
    /// Any other sensor failure.
    #[error("biometric_error: {message}")]
    Other {
        /// Host-provided description.
        message: String,
    },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for BiometricError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Other {
            message: error.reason,
        }
    }
}

/// Outcome of a failed unlock attempt.
///
/// Unlock failures are never fatal: the lock screen stays presented and the
/// attempt can be retried immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum UnlockError {
    /// Biometrics were requested but the sensor is unavailable or the user disabled them.
    #[error("biometrics_not_available")]
    BiometricsUnavailable,
    /// The biometric sensor rejected the challenge.
    #[error("biometric challenge failed: {cause}")]
    BiometricsChallengeFailed {
        /// Failure reported by the sensor.
        cause: BiometricError,
    },
    /// The passcode candidate does not match the stored passcode.
    #[error("invalid_passcode")]
    InvalidPasscode,
    /// A biometric challenge is already running for this handler.
    #[error("challenge_in_progress")]
    ChallengeInProgress,
    /// The handler was torn down while the attempt was in flight.
    #[error("cancelled")]
    Cancelled,
    /// A collaborator store failed while checking credentials.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the store failure.
        message: String,
    },
}

impl From<AppLockError> for UnlockError {
    fn from(error: AppLockError) -> Self {
        Self::Storage {
            message: error.to_string(),
        }
    }
}

impl From<BiometricError> for UnlockError {
    fn from(cause: BiometricError) -> Self {
        Self::BiometricsChallengeFailed { cause }
    }
}
