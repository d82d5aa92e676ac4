//! Send a message and stream the agent's reply.

use anyhow::{Context, Result};
use stream_types::ChatRequest;

use crate::client::RelayClient;
use crate::output::Printer;

/// Run the chat command.
pub async fn run(
    client: &RelayClient,
    message: &str,
    session_id: &str,
    retries: u32,
    printer: Printer,
) -> Result<()> {
    let request = ChatRequest {
        message: message.to_string(),
        session_id: session_id.to_string(),
        timeline: 0.0,
    };

    let created = client.chat(&request).await.context("Failed to start chat")?;
    eprintln!("channel: {}", created.channel);

    client
        .follow(&created.channel, None, retries, |event| printer.print(event))
        .await
        .context("Failed to read reply")?;
    Ok(())
}
