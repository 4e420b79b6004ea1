//! `applock`: developer CLI for the AppLock core.
//!
//! Manages the passcode and biometrics preference in a local JSON store and
//! replays scripted lock screen sessions against a real `LockHandler`.

mod simulate;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use applock_core::platform::memory::ScriptedBiometricProbe;
use applock_core::{Lock, LockConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use eyre::{eyre, WrapErr};
use tracing_subscriber::EnvFilter;

use crate::simulate::{BiometricOutcome, Session, Step};
use crate::store::FileStore;

#[derive(Parser)]
#[command(name = "applock")]
#[command(about = "Manage and exercise an AppLock screen lock", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the local store
    #[arg(long, env = "APPLOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JSON lock configuration; overrides the identifier/service/account flags
    #[arg(long, env = "APPLOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Lock identifier
    #[arg(long, default_value = "main")]
    identifier: String,

    /// Credential store service of the passcode
    #[arg(long, default_value = "dev.applock.cli")]
    service: String,

    /// Credential store account of the passcode
    #[arg(long, default_value = "passcode")]
    account: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether a passcode is set and the biometrics preference
    Status,

    /// Store a new passcode
    SetPasscode {
        /// The new passcode
        passcode: String,
    },

    /// Remove the passcode; the app then never locks
    ClearPasscode,

    /// Turn biometric unlocking on or off
    Biometrics {
        /// Desired preference
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Replay a lock screen session
    Simulate(SimulateArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Args)]
struct SimulateArgs {
    /// Start with the handler disabled
    #[arg(long)]
    disabled: bool,

    /// Report the biometric sensor as available
    #[arg(long)]
    biometrics_available: bool,

    /// Answer of the simulated biometric sensor
    #[arg(long, value_enum, default_value = "success")]
    biometric_outcome: BiometricOutcome,

    /// Steps: background, launch, foreground, passcode:<PASSCODE>, biometrics, teardown
    #[arg(long = "step", required = true)]
    steps: Vec<Step>,
}

impl Cli {
    fn lock_config(&self) -> eyre::Result<LockConfig> {
        if let Some(path) = &self.config {
            let json = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("cannot read {}", path.display()))?;
            return Ok(LockConfig::from_json(&json)?);
        }
        let config = LockConfig::new(&self.identifier, &self.service, &self.account);
        config.validate()?;
        Ok(config)
    }

    fn store_path(&self) -> eyre::Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .ok_or_else(|| eyre!("no data directory on this platform; pass --data-dir"))?
                .join("applock"),
        };
        Ok(dir.join("applock.json"))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.lock_config()?;
    let store = Arc::new(FileStore::open(cli.store_path()?)?);
    tracing::debug!(path = %store.path().display(), "store opened");

    // The CLI has no sensor; settings commands only touch the stored preference.
    let lock = || {
        Lock::new(
            config.clone(),
            store.clone(),
            store.clone(),
            Arc::new(ScriptedBiometricProbe::new(false)),
        )
    };

    match cli.command {
        Commands::Status => {
            let lock = lock()?;
            println!("store:      {}", store.path().display());
            println!("identifier: {}", lock.identifier());
            println!("passcode:   {}", if lock.have_passcode()? { "set" } else { "not set" });
            println!(
                "biometrics: {}",
                if lock.biometrics_enabled()? { "enabled" } else { "disabled" }
            );
        }
        Commands::SetPasscode { passcode } => {
            lock()?.set_passcode(Some(passcode))?;
            println!("passcode set");
        }
        Commands::ClearPasscode => {
            lock()?.set_passcode(None)?;
            println!("passcode cleared");
        }
        Commands::Biometrics { state } => {
            lock()?.set_should_use_biometrics_authentication(state == Toggle::On)?;
            println!("biometrics {}", if state == Toggle::On { "enabled" } else { "disabled" });
        }
        Commands::Simulate(args) => {
            let session = Session {
                enabled: !args.disabled,
                biometrics_available: args.biometrics_available,
                biometric_outcome: args.biometric_outcome,
                steps: args.steps,
            };
            for report in simulate::run(config, store, session).await? {
                println!("{report}");
            }
        }
    }
    Ok(())
}
