use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use walletchat_infrastructure::ConfigService;

mod commands;

#[derive(Parser)]
#[command(name = "walletchat")]
#[command(about = "walletchat CLI - wallet-authenticated messaging sessions", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/walletchat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an address or name through the configured resolver
    Resolve {
        /// `0x` address or name (e.g. alice.eth)
        target: String,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run a two-wallet conversation over the in-memory network
    Demo {
        /// Message to send; repeat for several
        #[arg(short, long = "message")]
        messages: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file path
    Path,
    /// Print the effective configuration
    Show,
    /// Write the default configuration if none exists
    Init,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_service = match cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };

    match cli.command {
        Commands::Resolve { target } => commands::resolve::run(&config_service, &target).await?,
        Commands::Config { action } => match action {
            ConfigAction::Path => commands::config::path(&config_service)?,
            ConfigAction::Show => commands::config::show(&config_service)?,
            ConfigAction::Init => commands::config::init(&config_service)?,
        },
        Commands::Demo { messages } => commands::demo::run(&config_service, messages).await?,
    }

    Ok(())
}
