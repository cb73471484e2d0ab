//! botline entry point: load config, wire up the passive logger, run.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use botline::config::Config;
use botline::dispatch::{Dispatch, SessionHandle};
use botline::supervisor::Supervisor;

#[derive(Parser)]
#[command(name = "botline", about = "Reconnecting IRC bot engine")]
struct Args {
    /// Path to the JSON config file
    #[arg(long, default_value = "botline.json")]
    config: PathBuf,
}

/// Passive business layer: logs chat traffic with the reply-target rule
/// already applied. Real bot features implement [`Dispatch`] the same way
/// and attach here.
struct ChatLogger {
    enabled: bool,
}

impl Dispatch for ChatLogger {
    fn on_registered(&mut self, _handle: &SessionHandle) -> Result<()> {
        tracing::info!("registered and joined configured channels");
        Ok(())
    }

    fn on_chat_message(
        &mut self,
        _handle: &SessionHandle,
        text: &str,
        reply_target: &str,
        sender: &str,
    ) -> Result<()> {
        if self.enabled {
            tracing::info!(from = sender, to = reply_target, text, "chat");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botline=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;

    tracing::info!(
        server = %config.server_addr(),
        nick = %config.nicks[0],
        channels = config.channels.len(),
        "starting botline"
    );

    let logger = ChatLogger {
        enabled: config.logging,
    };
    Supervisor::new(config, logger).run().await
}
