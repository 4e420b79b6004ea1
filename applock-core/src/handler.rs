//! Lifecycle-driven lock screen state machine.
//!
//! A [`LockHandler`] engages the lock screen when the app goes to the
//! background or finishes launching, and releases it after a successful
//! unlock:
//!
//! ```text
//!            lock_if_needed()                 present() completed
//! Unlocked ──────────────────► Presenting ──────────────────────► Locked
//!    ▲                              │                                │
//!    │     present() failed /       │                                │
//!    └──────── released ◄───────────┘                                │
//!    └──────────────── unlock_with_type() succeeded / teardown() ◄───┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{AppLockResult, UnlockError};
use crate::lock::{Lock, UnlockMethod};
use crate::platform::{
    AppearanceProvider, BlankAppearance, LifecycleEvent, LifecycleObserver, LifecycleSource,
    LockScreenContext, LockScreenPresenter,
};
use crate::token::{AttemptToken, AttemptTokens};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Unlocked,
    /// Presentation requested but not completed yet.
    Presenting {
        engagement: u64,
    },
    Locked,
}

struct HandlerState {
    enabled: bool,
    screen: Screen,
    appearance: Arc<dyn AppearanceProvider>,
    engagements: u64,
    tokens: AttemptTokens,
    challenge_in_flight: bool,
    torn_down: bool,
}

impl HandlerState {
    const fn may_engage(&self) -> bool {
        !self.torn_down && self.enabled && matches!(self.screen, Screen::Unlocked)
    }

    /// Moves to `Unlocked`; true if a completed presentation must be dismissed.
    fn unlock(&mut self) -> bool {
        let presented = self.screen == Screen::Locked;
        self.screen = Screen::Unlocked;
        presented
    }
}

struct HandlerCore {
    lock: Arc<Lock>,
    presenter: Arc<dyn LockScreenPresenter>,
    state: Mutex<HandlerState>,
}

impl HandlerCore {
    fn state(&self) -> MutexGuard<'_, HandlerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_if_needed(&self) -> AppLockResult<()> {
        let may_engage = self.state().may_engage();
        if !may_engage || !self.lock.have_passcode()? {
            return Ok(());
        }

        let (engagement, appearance) = {
            let mut state = self.state();
            if !state.may_engage() {
                return Ok(());
            }
            state.engagements = state.engagements.wrapping_add(1);
            state.tokens.invalidate_all();
            state.screen = Screen::Presenting {
                engagement: state.engagements,
            };
            (state.engagements, Arc::clone(&state.appearance))
        };

        let offer_biometrics = self
            .lock
            .should_use_biometrics_authentication()
            .unwrap_or_else(|err| {
                log::warn!("could not read biometrics preference: {err}");
                false
            });
        let content = appearance.build_lock_screen(LockScreenContext {
            identifier: self.lock.identifier(),
            offer_biometrics,
        });

        let presented = self.presenter.present(content);
        let current = {
            let mut state = self.state();
            let current = state.screen == Screen::Presenting { engagement };
            if current {
                state.screen = if presented.is_ok() {
                    Screen::Locked
                } else {
                    Screen::Unlocked
                };
            }
            current
        };
        match presented {
            Ok(()) if current => {
                log::info!("lock screen engaged for {}", self.lock.identifier());
                Ok(())
            }
            Ok(()) => {
                // Released or torn down while the presentation was running.
                self.presenter.dismiss();
                Ok(())
            }
            Err(err) => {
                log::warn!("could not present lock screen: {err}");
                Err(err)
            }
        }
    }

    async fn unlock_with_type(&self, method: UnlockMethod) -> Result<(), UnlockError> {
        let token = {
            let state = self.state();
            if state.torn_down {
                return Err(UnlockError::Cancelled);
            }
            state.tokens.issue()
        };

        if !self.lock.have_passcode()? {
            log::debug!("no passcode configured, unlocking without challenge");
            return self.release(token);
        }

        let outcome = {
            let _challenge = match method {
                UnlockMethod::Biometrics => Some(ChallengeGuard::acquire(self)?),
                UnlockMethod::Passcode { .. } => None,
            };
            self.lock.attempt_unlock(method).await
        };
        match outcome {
            Ok(()) => self.release(token),
            Err(_) if !self.state().tokens.is_valid(token) => Err(UnlockError::Cancelled),
            Err(err) => Err(err),
        }
    }

    fn release(&self, token: AttemptToken) -> Result<(), UnlockError> {
        let dismiss = {
            let mut state = self.state();
            if state.tokens.is_valid(token) {
                state.tokens.invalidate_all();
                Some(state.unlock())
            } else {
                None
            }
        };
        let Some(dismiss) = dismiss else {
            log::debug!("unlock completed for a stale lock session, ignoring");
            return Err(UnlockError::Cancelled);
        };
        if dismiss {
            self.presenter.dismiss();
            log::info!("lock screen released for {}", self.lock.identifier());
        }
        Ok(())
    }

    /// Forces the handler into `Unlocked` for good. Returns false if it was
    /// already torn down.
    fn tear_down(&self) -> bool {
        let dismiss = {
            let mut state = self.state();
            if state.torn_down {
                return false;
            }
            state.torn_down = true;
            state.tokens.invalidate_all();
            state.unlock()
        };
        if dismiss {
            self.presenter.dismiss();
        }
        true
    }
}

/// Marks a biometric challenge as running until dropped.
struct ChallengeGuard<'a> {
    core: &'a HandlerCore,
}

impl<'a> ChallengeGuard<'a> {
    fn acquire(core: &'a HandlerCore) -> Result<Self, UnlockError> {
        let mut state = core.state();
        if state.challenge_in_flight {
            return Err(UnlockError::ChallengeInProgress);
        }
        state.challenge_in_flight = true;
        Ok(Self { core })
    }
}

impl Drop for ChallengeGuard<'_> {
    fn drop(&mut self) {
        self.core.state().challenge_in_flight = false;
    }
}

/// Forwards lifecycle notifications to the handler core.
struct LifecycleBridge {
    core: Arc<HandlerCore>,
}

impl LifecycleObserver for LifecycleBridge {
    fn on_event(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::DidEnterBackground | LifecycleEvent::DidFinishLaunching => {
                if let Err(err) = self.core.lock_if_needed() {
                    log::warn!("lock not engaged on {event}: {err}");
                }
            }
            LifecycleEvent::WillEnterForeground => {}
        }
    }
}

/// Shows the lock screen of one [`Lock`] whenever the app returns from the
/// background, and hides it after a successful unlock.
///
/// The handler subscribes to the lifecycle source when created and
/// unsubscribes on [`teardown`](Self::teardown), which also runs on drop.
/// Teardown dismisses any presented lock screen.
///
/// An unlock attempt only acts on the lock session it started in. If the
/// screen is engaged again, released by another attempt or torn down while
/// it runs, it completes with [`UnlockError::Cancelled`] and leaves the
/// screen alone.
#[derive(uniffi::Object)]
pub struct LockHandler {
    core: Arc<HandlerCore>,
    lifecycle: Arc<dyn LifecycleSource>,
    subscription: u64,
}

impl std::fmt::Debug for LockHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandler")
            .field("lock", &self.core.lock)
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl LockHandler {
    /// Creates an enabled, unlocked handler and subscribes it to `lifecycle`.
    #[uniffi::constructor]
    pub fn new(
        lock: Arc<Lock>,
        lifecycle: Arc<dyn LifecycleSource>,
        presenter: Arc<dyn LockScreenPresenter>,
    ) -> Self {
        let core = Arc::new(HandlerCore {
            lock,
            presenter,
            state: Mutex::new(HandlerState {
                enabled: true,
                screen: Screen::Unlocked,
                appearance: Arc::new(BlankAppearance),
                engagements: 0,
                tokens: AttemptTokens::default(),
                challenge_in_flight: false,
                torn_down: false,
            }),
        });
        let subscription = lifecycle.subscribe(Arc::new(LifecycleBridge {
            core: Arc::clone(&core),
        }));
        Self {
            core,
            lifecycle,
            subscription,
        }
    }

    /// The lock managed by this handler.
    #[must_use]
    pub fn lock(&self) -> Arc<Lock> {
        Arc::clone(&self.core.lock)
    }

    /// Whether the handler engages the lock screen at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.core.state().enabled
    }

    /// Turns engagement on or off. Does not release a presented lock screen.
    pub fn set_enabled(&self, enabled: bool) {
        self.core.state().enabled = enabled;
    }

    /// Whether the lock screen is presented.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.core.state().screen == Screen::Locked
    }

    /// Replaces the factory of the lock screen content.
    pub fn set_appearance_provider(&self, provider: Arc<dyn AppearanceProvider>) {
        self.core.state().appearance = provider;
    }

    /// Presents the lock screen if the handler is enabled, a passcode is set
    /// and the screen is not already up.
    ///
    /// # Errors
    ///
    /// Returns an error if the passcode cannot be read or the host fails to
    /// present the lock screen; the handler stays unlocked in that case.
    pub fn lock_if_needed(&self) -> AppLockResult<()> {
        self.core.lock_if_needed()
    }

    /// Attempts to unlock with `method` and dismisses the lock screen on success.
    ///
    /// Succeeds immediately when no passcode is configured.
    ///
    /// # Errors
    ///
    /// Returns the failure of the attempt; the lock screen stays presented.
    /// [`UnlockError::ChallengeInProgress`] is returned for a biometric attempt
    /// while another one is running, and [`UnlockError::Cancelled`] if the
    /// lock session it started in is over or the handler was torn down.
    pub async fn unlock_with_type(&self, method: UnlockMethod) -> Result<(), UnlockError> {
        self.core.unlock_with_type(method).await
    }

    /// Unsubscribes from lifecycle events and dismisses any presented lock
    /// screen. Later calls do nothing.
    pub fn teardown(&self) {
        if self.core.tear_down() {
            self.lifecycle.unsubscribe(self.subscription);
            log::debug!("lock handler for {} torn down", self.core.lock.identifier());
        }
    }
}

impl Drop for LockHandler {
    fn drop(&mut self) {
        self.teardown();
    }
}
