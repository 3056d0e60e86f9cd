//! TabState: command-line access to persisted tab state.
//!
//! Inspects single records, rewrites them in the latest generation, and lists
//! or restores a whole state directory.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tabstate::managers::tab_state_store::{write_atomic, TabStateStore, TabStateStoreTrait};
use tabstate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tabstate::services::tab_state_codec::{TabStateCodec, TabStateCodecTrait};
use tabstate::types::tab_state::Channel;

#[derive(Parser)]
#[command(name = "tabstate", version, about = "Inspect and restore persisted tab state")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Settings file (overrides the platform config path).
    #[arg(long, global = true, env = "TABSTATE_CONFIG")]
    config: Option<PathBuf>,

    /// Release channel used for records without a version field.
    #[arg(long, global = true)]
    channel: Option<Channel>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode one tab-state file and print it as JSON.
    Inspect { file: PathBuf },
    /// Rewrite one tab-state file in the latest generation.
    Upgrade {
        file: PathBuf,
        /// Write here instead of replacing the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List tab-state files in a directory.
    List { dir: Option<PathBuf> },
    /// Restore every tab in a directory and print a summary.
    Restore {
        dir: Option<PathBuf>,
        /// Passphrase for incognito tab files.
        #[arg(long, env = "TABSTATE_INCOGNITO_PASSPHRASE", hide_env_values = true)]
        incognito_passphrase: Option<String>,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<SettingsEngine> {
    let path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string());
    let mut engine = SettingsEngine::new(path);
    engine
        .load()
        .with_context(|| format!("loading settings from {}", engine.get_config_path()))?;
    Ok(engine)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let settings = load_settings(&cli)?;
    let channel = cli.channel.or(settings.get_settings().channel);
    let codec = TabStateCodec::new(channel);

    match &cli.command {
        Commands::Inspect { file } => {
            let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
            let state = codec
                .decode(&bytes)
                .with_context(|| format!("decoding {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Commands::Upgrade { file, output } => {
            let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
            let state = codec
                .decode(&bytes)
                .with_context(|| format!("decoding {}", file.display()))?;
            let from = state.contents_state().version();
            let upgraded = codec.upgrade(&state)?;
            let target = output.as_ref().unwrap_or(file);
            write_atomic(target, &codec.encode(&upgraded)?)
                .with_context(|| format!("writing {}", target.display()))?;
            tracing::info!(
                from = %from,
                to = %upgraded.contents_state().version(),
                path = %target.display(),
                "upgraded tab state"
            );
        }
        Commands::List { dir } => {
            let dir = dir.clone().unwrap_or_else(|| settings.state_dir());
            let store = TabStateStore::new(dir, codec);
            for file in store.list()? {
                let kind = if file.incognito { "incognito" } else { "regular" };
                println!("{:>8}  {:<9}  {}", file.tab_id, kind, file.path.display());
            }
        }
        Commands::Restore {
            dir,
            incognito_passphrase,
        } => {
            let dir = dir.clone().unwrap_or_else(|| settings.state_dir());
            let mut store = TabStateStore::new(dir, codec)
                .with_restore_incognito(settings.get_settings().restore_incognito);
            if let Some(passphrase) = incognito_passphrase {
                store = store.with_incognito_passphrase(passphrase)?;
            }
            let report = store.restore_all_parallel().await?;
            for tab in &report.restored {
                println!(
                    "{:>8}  {}  {}",
                    tab.tab_id,
                    tab.state.contents_state().version(),
                    tab.state.display_title()
                );
            }
            for failure in &report.failed {
                println!("{:>8}  failed  {}", failure.tab_id, failure.error);
            }
            println!(
                "restored {}, failed {}, skipped {}",
                report.restored.len(),
                report.failed.len(),
                report.skipped.len()
            );
        }
    }

    Ok(())
}
