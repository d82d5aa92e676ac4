//! Attach to an existing channel.

use anyhow::{Context, Result};
use stream_types::EventId;

use crate::client::RelayClient;
use crate::output::Printer;

/// Run the tail command.
pub async fn run(
    client: &RelayClient,
    channel: &str,
    last_event_id: Option<String>,
    retries: u32,
    printer: Printer,
) -> Result<()> {
    let cursor = last_event_id.map(EventId::from);
    let last = client
        .follow(channel, cursor, retries, |event| printer.print(event))
        .await
        .with_context(|| format!("Failed to follow channel {channel}"))?;

    if let Some(id) = last {
        eprintln!("last event id: {id}");
    }
    Ok(())
}
