#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Screen lock for mobile apps.
//!
//! A [`Lock`] owns one passcode and the user's biometrics preference; a
//! [`LockHandler`] watches the app lifecycle and presents the lock screen when
//! the app comes back from the background, dismissing it after a successful
//! [`LockHandler::unlock_with_type`].
//!
//! Storage, the biometric sensor, lifecycle notifications and the lock screen
//! UI are provided by the host through the traits in [`platform`].

mod config;
pub use config::*;

mod error;
pub use error::*;

mod handler;
pub use handler::*;

mod lock;
pub use lock::*;

pub mod logger;
pub mod platform;

// private modules
mod token;

uniffi::setup_scaffolding!("applock_core");
