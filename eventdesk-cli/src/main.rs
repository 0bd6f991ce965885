mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use eventdesk_core::config::EventDeskConfig;
use eventdesk_core::constants::EVENTS_TABLE;
use eventdesk_core::store::TableStore;
use eventdesk_core::store::airtable::AirtableStore;
use eventdesk_core::store::memory::MemoryStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eventdesk")]
#[command(about = "Manage your events, their features and registration forms")]
struct Cli {
    /// Work against a throwaway in-memory store instead of the remote base
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a host's events (current, upcoming and past)
    Events {
        /// Host whose events to list (defaults to default_host_id from config)
        #[arg(long)]
        host: Option<i64>,
    },
    /// Create an event, prompting for anything not given
    New(commands::new::NewArgs),
    /// Show the feature catalog and which features an event has switched on
    Features {
        #[arg(short, long)]
        event: String,
    },
    /// Build and inspect registration forms
    Form {
        #[command(subcommand)]
        command: FormCommands,
    },
    /// Print the config file location
    Config,
}

#[derive(Subcommand)]
enum FormCommands {
    /// Print the stored form of an event
    Show {
        #[arg(short, long)]
        event: String,
    },
    /// Edit an event's form interactively
    Edit {
        #[arg(short, long)]
        event: String,
    },
    /// Replace an event's form with the questions in a TOML file
    Apply {
        #[arg(short, long)]
        event: String,

        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    if let Commands::Config = cli.command {
        return commands::config::run();
    }

    let config = EventDeskConfig::load()?;

    if cli.offline {
        let store = MemoryStore::new().with_autonumber(EVENTS_TABLE, "ID");
        run(cli.command, &store, &config).await
    } else {
        let store = AirtableStore::new(&config)?;
        run(cli.command, &store, &config).await
    }
}

async fn run<S: TableStore + Sync>(
    command: Commands,
    store: &S,
    config: &EventDeskConfig,
) -> Result<()> {
    match command {
        Commands::Events { host } => {
            commands::events::run(store, host.unwrap_or(config.default_host_id)).await
        }
        Commands::New(args) => commands::new::run(store, args, config.default_host_id).await,
        Commands::Features { event } => commands::features::run(store, &event).await,
        Commands::Form { command } => match command {
            FormCommands::Show { event } => commands::form::show(store, &event).await,
            FormCommands::Edit { event } => commands::form::edit(store, &event).await,
            FormCommands::Apply { event, file } => {
                commands::form::apply(store, &event, &file).await
            }
        },
        Commands::Config => commands::config::run(),
    }
}

/// Diagnostics go to stderr, filtered by EVENTDESK_LOG (or RUST_LOG), warn by default.
fn init_logging() {
    let filter = EnvFilter::try_from_env("EVENTDESK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
