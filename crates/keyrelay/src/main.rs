//! keyrelay: entry point.
//!
//! Relays keystrokes from one host machine to any number of client machines
//! over UDP, substituting keys through a persisted mapping table.
//!
//! # Usage
//!
//! ```text
//! keyrelay [OPTIONS] <COMMAND>
//!
//! Commands:
//!   host              Relay typed keys to every client that joins
//!   join [ADDRESS]    Join a host; without ADDRESS, rejoin the last one
//!   remap <MAPPINGS>  Add substitutions, e.g. "a=b,c=d"
//!   mappings          Print the substitution table
//!
//! Options:
//!   --settings  <PATH>  Settings file [default: platform config dir]
//!   --port      <PORT>  Local UDP port [default: 11000]
//!   --peer-port <PORT>  UDP port on the other side [default: 11000]
//!   --bind      <IP>    Local bind address [default: 0.0.0.0]
//!   --quit-key  <CHAR>  Key that ends a session [default: q]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Default         | Description           |
//! |-----------------------|-----------------|-----------------------|
//! | `KEYRELAY_SETTINGS`   | platform config | Settings file path    |
//! | `KEYRELAY_PORT`       | `11000`         | Local UDP port        |
//! | `KEYRELAY_PEER_PORT`  | `11000`         | Remote UDP port       |
//! | `KEYRELAY_BIND`       | `0.0.0.0`       | Local bind address    |
//! | `KEYRELAY_QUIT_KEY`   | `q`             | Session quit key      |
//!
//! On a terminal, each key press is read as soon as it is typed, without
//! echo; Ctrl+C also ends the session.  Piped standard input is read a line
//! at a time.  On Windows the client injects received keys with `SendInput`;
//! elsewhere it prints them.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use keyrelay_core::KeyTranslator;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keyrelay::application::manage_settings::{ManageSettingsUseCase, SettingsRepository};
use keyrelay::config::{RelayConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_QUIT_KEY};
use keyrelay::infrastructure::key_capture::keyboard_source;
use keyrelay::infrastructure::key_simulation::platform_simulator;
use keyrelay::infrastructure::network::SystemAddressResolver;
use keyrelay::infrastructure::storage::settings::JsonSettingsStore;
use keyrelay::session::{ClientSession, HostSession};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// UDP keystroke relay with key substitution.
#[derive(Debug, Parser)]
#[command(name = "keyrelay", about = "Relay keystrokes between machines over UDP", version)]
struct Cli {
    /// Settings file holding key mappings and the last-used host address.
    #[arg(long, global = true, env = "KEYRELAY_SETTINGS")]
    settings: Option<PathBuf>,

    /// Local UDP port.  The host receives announces here; a client receives
    /// key events here.
    #[arg(long, global = true, default_value_t = 11000, env = "KEYRELAY_PORT")]
    port: u16,

    /// UDP port of the other side.
    #[arg(long, global = true, default_value_t = 11000, env = "KEYRELAY_PEER_PORT")]
    peer_port: u16,

    /// IP address to bind the local socket to.
    #[arg(long, global = true, default_value = "0.0.0.0", env = "KEYRELAY_BIND")]
    bind: String,

    /// Key that ends a host or client session.
    #[arg(long, global = true, default_value_t = DEFAULT_QUIT_KEY, env = "KEYRELAY_QUIT_KEY")]
    quit_key: char,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Relay typed keys to every client that joins.
    Host,
    /// Join a host and render the keys it sends.
    Join {
        /// Host IPv4 address.  Defaults to the last address joined.
        address: Option<String>,
    },
    /// Add key substitutions, e.g. "a=b,c=d".
    Remap {
        mappings: String,
    },
    /// Print the current substitution table.
    Mappings,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn relay_config(&self) -> anyhow::Result<RelayConfig> {
        let bind_ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        Ok(RelayConfig {
            bind_ip,
            listen_port: self.port,
            peer_port: self.peer_port,
            quit_key: self.quit_key,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        })
    }

    fn settings_store(&self) -> anyhow::Result<JsonSettingsStore> {
        match &self.settings {
            Some(path) => Ok(JsonSettingsStore::new(path)),
            None => JsonSettingsStore::at_default_location()
                .context("no --settings path given and no platform config directory"),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.relay_config()?;
    let store = cli.settings_store()?;
    info!("using settings file {}", store.path().display());

    let repository: Arc<dyn SettingsRepository> = Arc::new(store);
    let mut settings = ManageSettingsUseCase::load(repository).context("failed to load settings")?;

    match cli.command {
        Command::Host => run_host(config, settings.translator().clone()).await,
        Command::Join { address } => run_client(config, settings, address).await,
        Command::Remap { mappings } => {
            let outcome = settings
                .remap_text(&mappings)
                .context("failed to update key mappings")?;
            println!(
                "Key mappings saved: {} applied, {} discarded.",
                outcome.applied, outcome.rejected
            );
            Ok(())
        }
        Command::Mappings => {
            print_mappings(settings.translator());
            Ok(())
        }
    }
}

async fn run_host(config: RelayConfig, translator: KeyTranslator) -> anyhow::Result<()> {
    if translator.is_empty() {
        warn!("no key mappings defined; every key will be ignored (see `keyrelay remap`)");
    }
    let quit_key = config.quit_key;
    let mut host = HostSession::new(config, translator);
    let addr = host.start().await.context("failed to start hosting")?;
    println!("Hosting on {addr}. Type keys to send them, '{quit_key}' to stop.");

    let source = keyboard_source();
    let keys = source.start()?;
    let finished = tokio::select! {
        result = host.run(keys) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    source.stop();

    let summary = match finished {
        Some(result) => result?,
        None => {
            info!("interrupted");
            host.stop();
            host.summary()
        }
    };
    println!(
        "Stopped hosting: {} keys relayed, {} ignored, {} clients.",
        summary.keys_relayed, summary.keys_ignored, summary.peers
    );
    Ok(())
}

async fn run_client(
    config: RelayConfig,
    settings: ManageSettingsUseCase,
    address: Option<String>,
) -> anyhow::Result<()> {
    let quit_key = config.quit_key;
    let mut client = ClientSession::new(
        config,
        settings,
        Arc::new(SystemAddressResolver),
        platform_simulator(),
    );
    let host = client
        .join(address.as_deref())
        .await
        .context("failed to join host")?;
    println!("Connected to {host}. Waiting for key events; '{quit_key}' disconnects.");

    let source = keyboard_source();
    let keys = source.start()?;
    let finished = tokio::select! {
        result = client.run(keys) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    source.stop();

    let summary = match finished {
        Some(result) => result?,
        None => {
            info!("interrupted");
            client.stop();
            client.summary()
        }
    };
    println!("\nDisconnected: {} keys received.", summary.keys_simulated);
    Ok(())
}

fn print_mappings(translator: &KeyTranslator) {
    if translator.is_empty() {
        println!("No key mappings defined.");
        return;
    }
    for (from, to) in translator.entries() {
        println!("{from}={to}");
    }
}
