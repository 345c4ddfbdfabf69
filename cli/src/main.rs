//! latchkey CLI - drive the bridge against a simulated device.
//!
//! ```text
//! main() -> connect(SimProvider) -> Client::{scan,sync,action,scan_card}
//!                                        |
//!                                        v
//!                  Printer callbacks, PendingOperation::wait() or Ctrl-C
//! ```

mod print;
mod sim;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use latchkey_bridge::{Client, Connection, PendingOperation, connect};
use latchkey_config::LatchkeyConfig;
use latchkey_types::{ActionOptions, ErrorInfo};

use print::Printer;
use sim::SimProvider;

#[derive(Parser)]
#[command(name = "latchkey")]
#[command(version)]
#[command(about = "Run access-control operations against a simulated device")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Delay between simulated device steps, in milliseconds
    #[arg(long, global = true, default_value_t = 250)]
    step_ms: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Discover nearby hardware
    Scan,

    /// Synchronize one hardware over bluetooth
    Sync {
        #[arg(long)]
        session: String,

        #[arg(long)]
        hardware: String,
    },

    /// Execute a gadget action over every enabled path
    Action {
        #[arg(long)]
        session: String,

        #[arg(long)]
        gadget: String,

        #[arg(long)]
        action: String,

        /// Skip the internet path
        #[arg(long)]
        no_internet: bool,

        /// Skip the bluetooth path
        #[arg(long)]
        no_bluetooth: bool,

        /// Do not prompt for bluetooth permission
        #[arg(long)]
        no_bluetooth_permission: bool,

        /// Do not prompt for location permission
        #[arg(long)]
        no_location_permission: bool,
    },

    /// Wait for an NFC card, then update and close it
    ScanCard,

    /// List sessions with their gadgets and hardware
    Sessions {
        /// Add a session from this token first
        #[arg(long)]
        add: Option<String>,
    },
}

fn init_tracing(config_filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("info")))
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

/// Wait for the terminal outcome; Ctrl-C cancels and keeps waiting for it.
async fn wait_or_cancel<T>(pending: PendingOperation<T>) -> Result<T, ErrorInfo> {
    let canceler = pending.canceler();
    let outcome = pending.wait();
    tokio::pin!(outcome);

    tokio::select! {
        result = &mut outcome => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(op_id = %canceler.op_id(), "interrupt received; canceling");
            canceler.cancel();
            outcome.await
        }
    }
}

fn action_options(
    defaults: ActionOptions,
    no_internet: bool,
    no_bluetooth: bool,
    no_bluetooth_permission: bool,
    no_location_permission: bool,
) -> ActionOptions {
    ActionOptions {
        use_internet: defaults.use_internet && !no_internet,
        use_bluetooth: defaults.use_bluetooth && !no_bluetooth,
        request_bluetooth_permission: defaults.request_bluetooth_permission
            && !no_bluetooth_permission,
        request_location_permission: defaults.request_location_permission
            && !no_location_permission,
    }
}

async fn list_sessions(client: &Client, add: Option<String>) -> Result<()> {
    let native = client.native();
    let card_emulation = native
        .is_card_emulation_supported()
        .await
        .context("failed to query card emulation support")?;
    println!(
        "provider {} (bluetooth: {}, card emulation: {card_emulation})",
        native.version(),
        native.is_bluetooth_supported(),
    );

    if let Some(token) = add {
        let id = native
            .add_session(&token)
            .await
            .context("failed to add session")?;
        println!("added {id}");
    }

    native
        .refresh_all_sessions()
        .await
        .context("failed to refresh sessions")?;

    for id in native.session_ids().await.context("failed to list sessions")? {
        println!("session {id}");
        let gadgets = native
            .gadgets(&id)
            .await
            .with_context(|| format!("failed to list gadgets for {id}"))?;
        for gadget in gadgets {
            let actions: Vec<&str> = gadget.actions.iter().map(|a| a.id.as_str()).collect();
            println!("  gadget {} ({}) [{}]", gadget.id, gadget.name, actions.join(", "));
        }
        let hardwares = native
            .hardwares(&id)
            .await
            .with_context(|| format!("failed to list hardware for {id}"))?;
        for hardware in hardwares {
            println!("  hardware {} ({})", hardware.id, hardware.name);
        }
    }
    Ok(())
}

async fn scan_card(client: &Client, printer: Arc<Printer>) -> Result<()> {
    let card = wait_or_cancel(client.scan_card(printer))
        .await
        .context("card scan failed")?;
    let updated = card.update().await.context("card update failed");
    card.close();
    updated?;
    println!("card {} updated", card.uid());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = match LatchkeyConfig::load() {
        Ok(config) => (config.unwrap_or_default(), None),
        Err(err) => (LatchkeyConfig::default(), Some(err)),
    };
    init_tracing(config.log.filter.as_deref());
    if let Some(err) = config_error {
        tracing::warn!(path = %err.path().display(), "ignoring config: {err}");
    }

    let Connection {
        host,
        client,
        dispatcher,
    } = connect(SimProvider::new(Duration::from_millis(cli.step_ms)));
    let dispatcher = dispatcher.spawn();
    let reaper = config
        .bridge
        .stale_operation_after()
        .map(|max_age| host.spawn_reaper(max_age));

    let printer = Arc::new(Printer);
    let result = match cli.command {
        Command::Scan => wait_or_cancel(client.scan(printer)).await.context("scan failed"),
        Command::Sync { session, hardware } => {
            wait_or_cancel(client.sync(&session, &hardware, printer))
                .await
                .context("sync failed")
        }
        Command::Action {
            session,
            gadget,
            action,
            no_internet,
            no_bluetooth,
            no_bluetooth_permission,
            no_location_permission,
        } => {
            let options = action_options(
                config.action.into(),
                no_internet,
                no_bluetooth,
                no_bluetooth_permission,
                no_location_permission,
            );
            wait_or_cancel(client.action(&session, &gadget, &action, options, printer))
                .await
                .context("action failed")
        }
        Command::ScanCard => scan_card(&client, printer).await,
        Command::Sessions { add } => list_sessions(&client, add).await,
    };

    if let Some(reaper) = reaper {
        reaper.abort();
    }
    dispatcher.abort();
    result
}
