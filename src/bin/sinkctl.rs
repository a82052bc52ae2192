//! Sink toggle tool
//!
//! Edits the persisted sink settings file read by `resonance` at startup.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use resonance::config::{SinkName, SinkSettings, is_configured};
use resonance::infrastructure::SettingsPersistence;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Enable or disable Resonance sinks", long_about = None)]
struct Cli {
    /// Sink settings file
    #[arg(short, long, env = "SINK_SETTINGS_PATH", default_value = "sinks.json")]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which sinks are enabled and whether they are fully configured
    Status,
    /// Enable one sink, optionally setting its destination
    Enable {
        /// csv, jsonl, sqlite, discord or telegram
        sink: String,

        /// Telegram bot token
        #[arg(long)]
        token: Option<String>,

        /// Telegram chat id
        #[arg(long)]
        chat_id: Option<String>,

        /// Discord webhook URL
        #[arg(long)]
        webhook: Option<String>,

        /// Output file for csv / jsonl
        #[arg(long)]
        path: Option<String>,

        /// Database URL for sqlite
        #[arg(long)]
        db_url: Option<String>,
    },
    /// Disable one sink
    Disable {
        /// csv, jsonl, sqlite, discord or telegram
        sink: String,
    },
    /// Enable the optional sinks (sqlite, telegram)
    EnableAll,
    /// Disable the optional sinks (sqlite, telegram)
    DisableAll,
}

struct Destination {
    token: Option<String>,
    chat_id: Option<String>,
    webhook: Option<String>,
    path: Option<String>,
    db_url: Option<String>,
}

fn apply_destination(settings: &mut SinkSettings, sink: SinkName, dest: Destination) {
    match sink {
        SinkName::Csv => {
            if let Some(path) = dest.path {
                settings.csv.path = path;
            }
        }
        SinkName::Jsonl => {
            if let Some(path) = dest.path {
                settings.jsonl.path = path;
            }
        }
        SinkName::Sqlite => {
            if let Some(db_url) = dest.db_url {
                settings.sqlite.db_url = db_url;
            }
        }
        SinkName::Discord => {
            if let Some(webhook) = dest.webhook {
                settings.discord.webhook_url = webhook;
            }
        }
        SinkName::Telegram => {
            if let Some(token) = dest.token {
                settings.telegram.token = token;
            }
            if let Some(chat_id) = dest.chat_id {
                settings.telegram.chat_id = chat_id;
            }
        }
    }
}

fn print_status(settings: &SinkSettings) {
    println!("Sink status:");
    for sink in SinkName::all() {
        let state = if settings.is_enabled(sink) {
            "enabled"
        } else {
            "disabled"
        };
        match settings.missing_setting(sink) {
            Some(missing) if settings.is_enabled(sink) => {
                println!("  {:<9} {:<9} (missing {})", sink.as_str(), state, missing)
            }
            _ => println!("  {:<9} {}", sink.as_str(), state),
        }
    }
    if settings.telegram.enabled && !is_configured(&settings.telegram.token) {
        println!();
        println!("Set a bot token with: sinkctl enable telegram --token <TOKEN> --chat-id <ID>");
    }
}

fn warn_if_incomplete(settings: &SinkSettings, sink: SinkName) {
    if let Some(missing) = settings.missing_setting(sink) {
        println!(
            "! {} is enabled but {} is not configured; resonance will refuse to start",
            sink.as_str(),
            missing
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = SettingsPersistence::new(&cli.file);
    let mut settings = store.load()?.unwrap_or_default();

    match cli.command {
        Commands::Status => {
            print_status(&settings);
            return Ok(());
        }
        Commands::Enable {
            sink,
            token,
            chat_id,
            webhook,
            path,
            db_url,
        } => {
            let sink: SinkName = sink.parse()?;
            settings.set_enabled(sink, true);
            apply_destination(
                &mut settings,
                sink,
                Destination {
                    token,
                    chat_id,
                    webhook,
                    path,
                    db_url,
                },
            );
            println!("✓ {} enabled", sink.as_str());
            warn_if_incomplete(&settings, sink);
        }
        Commands::Disable { sink } => {
            let sink: SinkName = sink.parse()?;
            settings.set_enabled(sink, false);
            println!("✓ {} disabled", sink.as_str());
        }
        Commands::EnableAll => {
            for sink in SinkName::optional() {
                settings.set_enabled(sink, true);
                println!("✓ {} enabled", sink.as_str());
                warn_if_incomplete(&settings, sink);
            }
        }
        Commands::DisableAll => {
            for sink in SinkName::optional() {
                settings.set_enabled(sink, false);
                println!("✓ {} disabled", sink.as_str());
            }
        }
    }

    store
        .save(&settings)
        .with_context(|| format!("Failed to write {}", store.path().display()))?;
    println!("Saved {}", store.path().display());
    Ok(())
}
