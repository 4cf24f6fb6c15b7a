//! Chat command.
//!
//! Sends one message through the breach-intercepting pipeline and streams
//! the reply to stdout. Ctrl-C cancels the turn.

use std::sync::Arc;

use chatvault_agent::ChatPipeline;
use chatvault_core::config::Config;
use chatvault_providers::OllamaProvider;
use clap::Args;
use futures::StreamExt;
use tracing::debug;

use super::open_vault;
use crate::render;

/// Chat command arguments.
#[derive(Args)]
pub struct ChatArgs {
    /// Message text
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// Print each chunk as a JSON line
    #[arg(long)]
    pub json: bool,
}

impl ChatArgs {
    /// The message as typed, words joined by single spaces.
    pub fn text(&self) -> String {
        self.message.join(" ")
    }
}

/// Run the chat command.
pub async fn run(args: ChatArgs, config: &Config) -> anyhow::Result<()> {
    let vault = open_vault(config).await?;

    let mut generator = config.generator.clone();
    if let Some(model) = &args.model {
        generator.model = model.clone();
    }
    let provider = OllamaProvider::from_config(&generator)?;

    let pipeline = ChatPipeline::new(vault, Arc::new(provider))
        .with_chat_config(&config.chat)
        .with_generator_config(&generator);

    let mut stream = pipeline.stream(args.text());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            chunk = stream.next() => {
                let Some(chunk) = chunk else { break };
                if args.json {
                    render::render_chunk_json(&chunk)?;
                } else {
                    render::render_chunk(&chunk)?;
                }
            }
            _ = &mut ctrl_c => {
                debug!("interrupted, cancelling turn");
                stream.cancel();
                break;
            }
        }
    }

    Ok(())
}
