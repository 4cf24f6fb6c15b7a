//! Audit listing command.

use chatvault_core::config::Config;
use chatvault_core::Identity;
use clap::Args;

use super::open_vault;
use crate::render;

/// Audits command arguments.
#[derive(Args)]
pub struct AuditsArgs {
    /// Maximum number of records (default 100)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the audits command.
pub async fn run(args: AuditsArgs, config: &Config, identity: Option<&Identity>) -> anyhow::Result<()> {
    let vault = open_vault(config).await?;
    let records = vault.list_audits(identity, args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        render::render_audits(&records);
    }
    Ok(())
}
