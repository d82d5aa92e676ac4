//! # agentcast
//!
//! Command-line client for the stream relay.
//!
//! ## Commands
//!
//! - `chat`: Send a message and stream the reply
//! - `tail`: Attach to an existing channel, optionally resuming
//! - `health`: Show relay health
//!
//! ## Example
//!
//! ```bash
//! # Ask the relay's agent something and stream the answer
//! agentcast chat "Hello there"
//!
//! # Re-attach to a channel after the last event you saw
//! agentcast tail --channel 3f2a... --last-event-id 12
//!
//! # Print frames exactly as the relay sends them
//! agentcast --raw chat "Hello there"
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;
mod output;

use client::RelayClient;
use commands::{chat, health, tail};
use output::Printer;

/// Command-line client for the stream relay.
#[derive(Parser, Debug)]
#[command(name = "agentcast")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Relay base URL
    #[arg(long, global = true, env = "AGENTCAST_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Print every frame in wire format instead of just the reply text
    #[arg(long, global = true)]
    raw: bool,

    /// Reconnect attempts when the stream drops before it finishes
    #[arg(long, global = true, default_value = "3")]
    retries: u32,

    /// Base delay between reconnect attempts, in milliseconds
    #[arg(long, global = true, default_value = "500")]
    retry_delay_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a message and stream the reply
    Chat {
        /// Message for the agent
        message: String,

        /// Session id used for rate limiting (default: per process)
        #[arg(long, short)]
        session: Option<String>,
    },

    /// Attach to an existing channel
    Tail {
        /// Channel id returned by the relay
        #[arg(long, short)]
        channel: String,

        /// Resume after this event id
        #[arg(long)]
        last_event_id: Option<String>,
    },

    /// Show relay health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RelayClient::new(&cli.server)
        .with_retry_delay(std::time::Duration::from_millis(cli.retry_delay_ms));
    let printer = Printer::new(cli.raw);

    match cli.command {
        Commands::Chat { message, session } => {
            let session = session.unwrap_or_else(|| format!("cli-{}", std::process::id()));
            chat::run(&client, &message, &session, cli.retries, printer).await?;
        }
        Commands::Tail {
            channel,
            last_event_id,
        } => {
            tail::run(&client, &channel, last_event_id, cli.retries, printer).await?;
        }
        Commands::Health => {
            health::run(&client).await?;
        }
    }

    Ok(())
}
