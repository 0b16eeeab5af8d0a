//! cordsync CLI: the main entry point.
//!
//! Commands:
//! - `replay`: feed a recorded event log through a client
//! - `collect-messages`: replay a log while a message collector runs
//! - `config`: show, validate or locate the configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "cordsync",
    about = "cordsync: gateway cache reconciliation and collectors",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Use this config file instead of ~/.cordsync/config.toml
    #[arg(short = 'c', long = "config", global = true, env = "CORDSYNC_CONFIG")]
    config_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every notification produced by a JSON-lines event log
    Replay {
        /// Log of {"t": NAME, "d": PAYLOAD} records
        file: PathBuf,

        /// Also print debug and warn notifications
        #[arg(long)]
        diagnostics: bool,
    },

    /// Replay a log while collecting messages from one channel
    CollectMessages {
        /// Log of {"t": NAME, "d": PAYLOAD} records
        file: PathBuf,

        /// Channel to collect from
        #[arg(long)]
        channel: u64,

        /// Stop after this many messages
        #[arg(long)]
        max: Option<usize>,

        /// Stop after this many milliseconds
        #[arg(long)]
        time: Option<u64>,

        /// Stop after this many milliseconds without a new message
        #[arg(long)]
        idle: Option<u64>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Check the configuration for errors
    Validate,
    /// Print the config file path
    Path,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config_file.unwrap_or_else(commands::default_config_path);

    // Logging settings come from the file when it parses; a broken file is
    // reported by the command itself.
    let logging = commands::load_config(&config_path).map(|c| c.logging).unwrap_or_default();
    let filter = if cli.verbose { "debug".to_string() } else { logging.level };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.json_logs || logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Replay { file, diagnostics } => commands::replay::run(&config_path, &file, diagnostics).await?,
        Commands::CollectMessages {
            file,
            channel,
            max,
            time,
            idle,
        } => {
            let args = commands::collect::CollectArgs {
                channel,
                max,
                time,
                idle,
            };
            commands::collect::run(&config_path, &file, args).await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&config_path)?,
            ConfigAction::Validate => commands::config_cmd::validate(&config_path)?,
            ConfigAction::Path => commands::config_cmd::path(&config_path),
        },
    }

    Ok(())
}
