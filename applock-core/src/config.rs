use serde::{Deserialize, Serialize};

use crate::error::{AppLockError, AppLockResult};

/// Reason shown by the biometric prompt unless the host overrides it.
pub const DEFAULT_BIOMETRIC_REASON: &str = "Unlock to access your data";

/// Suffix appended to the lock identifier to form the biometrics preference key.
pub const BIOMETRICS_PREFERENCE_SUFFIX: &str = ".biometrics_enabled";

fn default_biometric_reason() -> String {
    DEFAULT_BIOMETRIC_REASON.to_string()
}

/// Static configuration of a [`Lock`](crate::Lock).
///
/// The passcode lives in the credential store under
/// (`service_name`, `account_name`); the biometrics preference lives in the
/// preference store under `identifier` + [`BIOMETRICS_PREFERENCE_SUFFIX`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct LockConfig {
    /// Stable identifier of the lock, used to key its persisted preferences.
    pub identifier: String,
    /// Credential store service of the passcode entry.
    pub service_name: String,
    /// Credential store account of the passcode entry.
    pub account_name: String,
    /// Human-readable reason passed to the biometric prompt.
    #[serde(default = "default_biometric_reason")]
    pub biometric_reason: String,
}

impl LockConfig {
    /// Creates a configuration with the default biometric reason.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        service_name: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            service_name: service_name.into(),
            account_name: account_name.into(),
            biometric_reason: default_biometric_reason(),
        }
    }

    /// Replaces the reason shown by the biometric prompt.
    #[must_use]
    pub fn with_biometric_reason(mut self, reason: impl Into<String>) -> Self {
        self.biometric_reason = reason.into();
        self
    }

    /// Parses a configuration from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`AppLockError::InvalidConfig`] if the JSON is malformed or a
    /// required field is empty.
    pub fn from_json(json: &str) -> AppLockResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| AppLockError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every storage key component is present.
    ///
    /// # Errors
    ///
    /// Returns [`AppLockError::InvalidConfig`] naming the first empty field.
    pub fn validate(&self) -> AppLockResult<()> {
        let fields = [
            ("identifier", &self.identifier),
            ("service_name", &self.service_name),
            ("account_name", &self.account_name),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(AppLockError::InvalidConfig(format!("{name} is empty")));
            }
        }
        Ok(())
    }

    /// Key of the biometrics-enabled preference for this lock.
    #[must_use]
    pub fn biometrics_preference_key(&self) -> String {
        format!("{}{BIOMETRICS_PREFERENCE_SUFFIX}", self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_applies_default_reason() {
        let config = LockConfig::from_json(
            r#"{"identifier":"main","service_name":"com.example.app","account_name":"passcode"}"#,
        )
        .unwrap();
        assert_eq!(config.biometric_reason, DEFAULT_BIOMETRIC_REASON);
        assert_eq!(config.biometrics_preference_key(), "main.biometrics_enabled");
    }

    #[test]
    fn test_from_json_rejects_empty_identifier() {
        let err = LockConfig::from_json(
            r#"{"identifier":" ","service_name":"com.example.app","account_name":"passcode"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AppLockError::InvalidConfig(msg) if msg.contains("identifier")));
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        assert!(matches!(
            LockConfig::from_json("{"),
            Err(AppLockError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_custom_reason() {
        let config = LockConfig::new("main", "svc", "acct").with_biometric_reason("Open vault");
        assert_eq!(config.biometric_reason, "Open vault");
        assert!(config.validate().is_ok());
    }
}
