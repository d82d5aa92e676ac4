//! Show relay health.

use anyhow::{Context, Result};

use crate::client::RelayClient;

/// Run the health command.
pub async fn run(client: &RelayClient) -> Result<()> {
    let health = client.health().await.context("Relay is unreachable")?;

    println!("=== relay health ===");
    println!("  Status:   {}", field(&health, "status"));
    println!("  Version:  {}", field(&health, "version"));
    println!("  Channels: {}", field(&health, "channels"));
    println!("  Readers:  {}", field(&health, "readers"));
    println!("  Uptime:   {}s", field(&health, "uptime_seconds"));
    Ok(())
}

fn field(value: &serde_json::Value, key: &str) -> String {
    match &value[key] {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
