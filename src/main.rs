//! smirc binary: run the bot (`--bot`) or send one message to a running bot.

use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use smirc::bridge::{self, Bridge};
use smirc::cli::Cli;
use smirc::config::{self, ConfigError};
use smirc::delivery::DeliveryMessage;
use smirc::session::{ConnectionManager, IrcConnector, SharedState};
use smirc::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init_logging(cli.log_json);
    info!(version = env!("CARGO_PKG_VERSION"), "smirc");

    if !cli.config.exists() {
        eprintln!("no config file exists: {}", cli.config.display());
        return ExitCode::from(1);
    }

    let code = if cli.bot {
        run_bot(&cli).await
    } else {
        run_sender(&cli).await
    };
    ExitCode::from(code)
}

async fn run_bot(cli: &Cli) -> u8 {
    let ctx = match config::load(&cli.config).await {
        Ok(ctx) => ctx,
        Err(ConfigError::Invalid(errors)) => {
            for e in &errors {
                error!(error = %e, "invalid configuration");
            }
            eprintln!("default/example server detected or configuration invalid...exiting...");
            return 1;
        }
        Err(e) => return config_failure(e),
    };
    info!(
        name = %ctx.name,
        home = %ctx.home,
        rooms = ?ctx.rooms,
        server = %ctx.server,
        port = ctx.port,
        "starting bot"
    );

    let (queue_tx, queue_rx) = mpsc::unbounded_channel::<DeliveryMessage>();
    let (listener, handle) = Bridge::new(&ctx, queue_tx);
    let bridge_task = tokio::spawn(listener.listen());

    let manager = ConnectionManager::new(ctx, IrcConnector, SharedState::new(), queue_rx, handle);
    let shutdown = manager.run().await;

    if let Err(e) = bridge_task.await {
        warn!(error = %e, "bridge task failed");
    }
    info!(reason = ?shutdown, "exiting");
    match u8::try_from(shutdown.exit_code()) {
        Ok(code) => code,
        Err(_) => 1,
    }
}

async fn run_sender(cli: &Cli) -> u8 {
    let ctx = match config::resolve(&cli.config) {
        Ok(ctx) => ctx,
        Err(e) => return config_failure(e),
    };

    let text = match cli.message_text() {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            if let Err(e) = tokio::io::stdin().read_to_string(&mut buf).await {
                error!(error = %e, "failed to read stdin");
                return 1;
            }
            buf
        }
    };

    let msg = DeliveryMessage::new(cli.delivery_kind(), text);
    match bridge::send(ctx.bridge_port, &msg, ctx.send).await {
        Ok(()) => {
            info!("client executed");
            0
        }
        Err(e) => {
            warn!(error = %e, "sending error");
            1
        }
    }
}

fn config_failure(e: ConfigError) -> u8 {
    error!(error = %e, "failed to load config");
    eprintln!("{e}");
    1
}
