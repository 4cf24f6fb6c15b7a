//! Terminal rendering utilities.
//!
//! Provides table output for secrets and audits, and chunk rendering for
//! chat replies.

use std::io::Write;

use chatvault_agent::StreamChunk;
use chatvault_core::AuditRecord;
use chatvault_secrets::SecretView;
use console::style;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Render secrets as a table.
pub fn render_secrets(views: &[SecretView]) {
    if views.is_empty() {
        println!("No secrets visible.");
        return;
    }

    println!("{:<38} {:<24} {:>8}  {}", "ID", "NAME", "BREACHES", "CREATED");
    println!("{}", "-".repeat(96));
    for view in views {
        let breaches = if view.breach_count > 0 {
            style(view.breach_count).red().to_string()
        } else {
            view.breach_count.to_string()
        };
        println!(
            "{:<38} {:<24} {:>8}  {}",
            view.id,
            view.name,
            breaches,
            view.created_at.format(TIME_FORMAT)
        );
    }
    println!("\n{} secret(s) total.", views.len());
}

/// Render audit records as a table, newest first.
pub fn render_audits(records: &[AuditRecord]) {
    if records.is_empty() {
        println!("No audit records visible.");
        return;
    }

    println!("{:<24} {:<7} {:<38} {:<16} {}", "TIME", "ACTION", "SECRET", "USER", "DETAILS");
    println!("{}", "-".repeat(110));
    for record in records {
        println!(
            "{:<24} {:<7} {:<38} {:<16} {}",
            record.created_at.format(TIME_FORMAT),
            record.action,
            record.secret_id,
            record.user_id,
            record.details.as_deref().unwrap_or("")
        );
    }
}

/// Write one chat chunk to stdout as it arrives.
pub fn render_chunk(chunk: &StreamChunk) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    if chunk.is_breach() {
        writeln!(out, "{}", style(&chunk.content).red().bold())?;
    } else if chunk.done {
        writeln!(out)?;
    } else {
        write!(out, "{}", chunk.content)?;
    }
    out.flush()
}

/// Write one chat chunk as a JSON line.
pub fn render_chunk_json(chunk: &StreamChunk) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", serde_json::to_string(chunk)?)?;
    out.flush()?;
    Ok(())
}
