//! ChatVault command-line interface.

pub mod commands;
pub mod render;

use std::path::{Path, PathBuf};

use chatvault_core::config::{Config, LoggingConfig};
use chatvault_core::Identity;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ChatVault - secret vault with chat breach interception
#[derive(Parser)]
#[command(name = "chatvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true, env = "CHATVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub identity: IdentityArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Who the command acts as. Without any of these the caller is
/// unauthenticated.
#[derive(Args, Debug, Default)]
pub struct IdentityArgs {
    /// Claims JSON file (`{id, email, scopes, orgId}`)
    #[arg(long, global = true, conflicts_with_all = ["user_id", "email", "org", "scope"])]
    pub identity: Option<PathBuf>,

    /// Acting user id
    #[arg(long, global = true)]
    pub user_id: Option<String>,

    /// Acting user email
    #[arg(long, global = true, requires = "user_id")]
    pub email: Option<String>,

    /// Organization to act within
    #[arg(long, global = true, requires = "user_id")]
    pub org: Option<String>,

    /// Scope granted to the user (repeatable), e.g. `admin` or `org:acme`
    #[arg(long = "scope", global = true, requires = "user_id")]
    pub scope: Vec<String>,
}

impl IdentityArgs {
    /// Build the identity, if any was given.
    pub fn resolve(&self) -> anyhow::Result<Option<Identity>> {
        if let Some(path) = &self.identity {
            let claims = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
            return Ok(Some(Identity::from_claims(&claims)?));
        }

        Ok(self.user_id.as_ref().map(|id| {
            Identity::new(
                id.clone(),
                self.email.clone().unwrap_or_default(),
                &self.scope,
                self.org.clone().unwrap_or_default(),
            )
        }))
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Manage stored secrets
    Secrets(commands::secrets::SecretsArgs),

    /// Show audit records
    Audits(commands::audits::AuditsArgs),

    /// Send a message through the breach-intercepting chat pipeline
    Chat(commands::chat::ChatArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Load the configuration file and apply the environment overlay. A file
/// that does not exist yet yields the defaults, so `config init` can
/// create it.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let mut config = if path.exists() {
                Config::load(path)?
            } else {
                Config::default()
            };
            config.apply_env();
            Ok(config)
        }
        None => Ok(Config::load_default()?),
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins; otherwise the configured level applies to ChatVault
/// crates, raised by each `-v`.
pub fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("chatvault={level}").into());

    let json = logging.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text = (!logging.json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let identity = cli.identity.resolve()?;

    match cli.command {
        Commands::Secrets(args) => commands::secrets::run(args, &config, identity.as_ref()).await,
        Commands::Audits(args) => commands::audits::run(args, &config, identity.as_ref()).await,
        Commands::Chat(args) => commands::chat::run(args, &config).await,
        Commands::Config(args) => commands::config::run(args, &config, cli.config.as_deref()),
        Commands::Version => {
            println!("chatvault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
