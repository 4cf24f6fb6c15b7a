//! Secret management commands.
//!
//! Provides `chatvault secrets create|list|show|count|delete` over the
//! file-backed vault. Every subcommand except `count` is authorized against
//! the identity given on the command line.

use chatvault_core::config::Config;
use chatvault_core::{Identity, SecretString};
use chatvault_secrets::SecretView;
use clap::Args;

use super::open_vault;
use crate::render;

/// Secrets command arguments.
#[derive(Args)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub command: SecretsCommand,
}

#[derive(clap::Subcommand)]
pub enum SecretsCommand {
    /// Store a secret (prompts for the token)
    Create {
        /// Display name, unique per user
        name: String,

        /// Token value (if omitted, prompts for hidden input)
        #[arg(long)]
        token: Option<String>,
    },

    /// List secrets visible to the caller
    List,

    /// Show one secret
    Show {
        /// Secret id
        id: String,

        /// Decrypt and include the token
        #[arg(long)]
        reveal: bool,
    },

    /// Print the total number of stored secrets
    Count,

    /// Delete a secret the caller owns
    Delete {
        /// Secret id
        id: String,
    },
}

/// Run the secrets command.
pub async fn run(
    args: SecretsArgs,
    config: &Config,
    identity: Option<&Identity>,
) -> anyhow::Result<()> {
    let vault = open_vault(config).await?;

    match args.command {
        SecretsCommand::Create { name, token } => {
            let token = match token {
                Some(t) => t,
                None => {
                    let prompt = format!("Enter token for '{name}': ");
                    rpassword::prompt_password(prompt)
                        .map_err(|e| anyhow::anyhow!("Failed to read token: {}", e))?
                }
            };

            let secret = vault
                .create_for(identity, &name, &SecretString::new(token))
                .await?;

            println!("Secret '{}' stored with id {}.", secret.name, secret.id);
        }

        SecretsCommand::List => {
            let views: Vec<SecretView> = vault
                .list(identity)
                .await?
                .into_iter()
                .map(SecretView::from)
                .collect();
            render::render_secrets(&views);
        }

        SecretsCommand::Show { id, reveal } => {
            let secret = vault
                .get_for(identity, &id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Secret not found: {}", id))?;

            let mut view = SecretView::from(&secret);
            if reveal {
                let token = vault.reveal(identity, &secret).await?;
                view = view.with_token(&token);
            }
            println!("{}", serde_json::to_string_pretty(&view)?);
        }

        SecretsCommand::Count => {
            println!("{}", vault.count().await?);
        }

        SecretsCommand::Delete { id } => {
            vault.delete_for(identity, &id).await?;
            println!("Secret '{}' deleted.", id);
        }
    }

    Ok(())
}
