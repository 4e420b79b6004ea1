//! Scripted lock screen sessions against a real [`LockHandler`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use applock_core::platform::memory::{ManualLifecycle, ScriptedBiometricProbe};
use applock_core::platform::{
    CredentialStore, LifecycleEvent, LockScreenContent, LockScreenPresenter, PreferenceStore,
};
use applock_core::{AppLockResult, BiometricError, Lock, LockConfig, LockHandler, UnlockMethod};
use clap::ValueEnum;

/// One action of a simulated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Deliver a lifecycle notification.
    Event(LifecycleEvent),
    /// Try to unlock with a passcode.
    Passcode(String),
    /// Try to unlock with biometrics.
    Biometrics,
    /// Tear the handler down.
    Teardown,
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(candidate) = s.strip_prefix("passcode:") {
            return Ok(Self::Passcode(candidate.to_string()));
        }
        match s {
            "background" => Ok(Self::Event(LifecycleEvent::DidEnterBackground)),
            "launch" => Ok(Self::Event(LifecycleEvent::DidFinishLaunching)),
            "foreground" => Ok(Self::Event(LifecycleEvent::WillEnterForeground)),
            "biometrics" => Ok(Self::Biometrics),
            "teardown" => Ok(Self::Teardown),
            other => LifecycleEvent::from_str(other)
                .map(Self::Event)
                .map_err(|_| format!("unknown step `{other}`")),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(event) => write!(f, "event {event}"),
            Self::Passcode(_) => f.write_str("passcode"),
            Self::Biometrics => f.write_str("biometrics"),
            Self::Teardown => f.write_str("teardown"),
        }
    }
}

/// Result the simulated biometric sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BiometricOutcome {
    /// The challenge succeeds.
    Success,
    /// The user cancels the prompt.
    UserCancel,
    /// The sensor is locked out.
    Lockout,
    /// No biometric identity is enrolled.
    NotEnrolled,
    /// The biometric does not match.
    Failed,
}

impl From<BiometricOutcome> for Result<(), BiometricError> {
    fn from(outcome: BiometricOutcome) -> Self {
        match outcome {
            BiometricOutcome::Success => Ok(()),
            BiometricOutcome::UserCancel => Err(BiometricError::UserCancel),
            BiometricOutcome::Lockout => Err(BiometricError::Lockout),
            BiometricOutcome::NotEnrolled => Err(BiometricError::NotEnrolled),
            BiometricOutcome::Failed => Err(BiometricError::AuthenticationFailed),
        }
    }
}

/// Knobs of a simulated session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Whether the handler engages at all.
    pub enabled: bool,
    /// Whether the simulated sensor is usable.
    pub biometrics_available: bool,
    /// What the simulated sensor answers.
    pub biometric_outcome: BiometricOutcome,
    /// Actions to run, in order.
    pub steps: Vec<Step>,
}

/// What happened for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Description of the step.
    pub step: String,
    /// `ok` or the unlock error.
    pub outcome: String,
    /// Lock state after the step.
    pub locked: bool,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.locked { "locked" } else { "unlocked" };
        write!(f, "{:<32} {:<40} {state}", self.step, self.outcome)
    }
}

/// Presenter that only logs what a host would show.
struct TerminalPresenter;

impl LockScreenPresenter for TerminalPresenter {
    fn present(&self, content: LockScreenContent) -> AppLockResult<()> {
        tracing::info!(
            title = content.title.as_deref().unwrap_or(""),
            offer_biometrics = content.offer_biometrics,
            "lock screen presented"
        );
        Ok(())
    }

    fn dismiss(&self) {
        tracing::info!("lock screen dismissed");
    }
}

/// Runs `session` against a lock backed by `store`.
pub async fn run<S>(
    config: LockConfig,
    store: Arc<S>,
    session: Session,
) -> eyre::Result<Vec<StepReport>>
where
    S: CredentialStore + PreferenceStore + 'static,
{
    let probe = Arc::new(ScriptedBiometricProbe::new(session.biometrics_available));
    probe.set_outcome(session.biometric_outcome.into());
    let lifecycle = Arc::new(ManualLifecycle::new());

    let lock = Lock::new(config, store.clone(), store, probe)?;
    let handler = LockHandler::new(
        Arc::new(lock),
        lifecycle.clone(),
        Arc::new(TerminalPresenter),
    );
    handler.set_enabled(session.enabled);

    let mut reports = Vec::with_capacity(session.steps.len());
    for step in session.steps {
        let description = step.to_string();
        let outcome = match step {
            Step::Event(event) => {
                lifecycle.emit(event);
                "ok".to_string()
            }
            Step::Passcode(candidate) => describe(
                handler
                    .unlock_with_type(UnlockMethod::Passcode { candidate })
                    .await,
            ),
            Step::Biometrics => describe(handler.unlock_with_type(UnlockMethod::Biometrics).await),
            Step::Teardown => {
                handler.teardown();
                "ok".to_string()
            }
        };
        reports.push(StepReport {
            step: description,
            outcome,
            locked: handler.is_locked(),
        });
    }
    Ok(reports)
}

fn describe<E: fmt::Display>(result: Result<(), E>) -> String {
    result.map_or_else(|err| err.to_string(), |()| "ok".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;

    fn steps(raw: &[&str]) -> Vec<Step> {
        raw.iter().map(|step| step.parse().unwrap()).collect()
    }

    #[test]
    fn test_parse_steps() {
        assert_eq!(
            steps(&["background", "did_finish_launching", "passcode:12:34", "biometrics"]),
            vec![
                Step::Event(LifecycleEvent::DidEnterBackground),
                Step::Event(LifecycleEvent::DidFinishLaunching),
                Step::Passcode("12:34".to_string()),
                Step::Biometrics,
            ]
        );
        assert!("sideways".parse::<Step>().is_err());
    }

    #[test]
    fn test_passcode_step_display_hides_candidate() {
        assert_eq!(Step::Passcode("1234".to_string()).to_string(), "passcode");
    }

    #[tokio::test]
    async fn test_session_locks_and_unlocks() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path().join("applock.json")).unwrap());
        let config = LockConfig::new("main", "dev.applock.cli", "passcode");
        Lock::new(
            config.clone(),
            store.clone(),
            store.clone(),
            Arc::new(ScriptedBiometricProbe::new(false)),
        )
        .unwrap()
        .set_passcode(Some("1234".to_string()))
        .unwrap();

        let reports = run(
            config,
            store,
            Session {
                enabled: true,
                biometrics_available: true,
                biometric_outcome: BiometricOutcome::Lockout,
                steps: steps(&["background", "passcode:0000", "biometrics", "passcode:1234"]),
            },
        )
        .await
        .unwrap();

        let summary: Vec<_> = reports
            .iter()
            .map(|report| (report.outcome.as_str(), report.locked))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("ok", true),
                ("invalid_passcode", true),
                ("biometric challenge failed: lockout", true),
                ("ok", false),
            ]
        );
    }
}
