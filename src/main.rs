use clap::Parser;
use order_board::config::{BoardConfig, Cli, SourceMode};
use order_board::lifecycle::{setup_tracing, LogNotifier, NotificationPolicy, OrderBoard, RunOutcome};
use order_board::render::TerminalRenderer;
use order_board::source::{RestSource, SnapshotFeed};
use std::process::ExitCode;
use tracing::{error, info, instrument, warn};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_tracing();

    let config = match BoardConfig::try_from(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Order board failed");
            ExitCode::FAILURE
        }
    }
}

#[instrument(skip_all, fields(collection = %config.collection, mode = ?config.mode))]
async fn run(config: BoardConfig) -> Result<(), order_board::source::TransportError> {
    let mut source = RestSource::new(&config.url, &config.collection, config.fetch_timeout)?;
    if let Some(token) = &config.auth {
        source = source.with_auth(token);
    }

    let renderer = TerminalRenderer::stdout().with_highlight(config.highlight);
    let mut board = OrderBoard::new(renderer)
        .with_notifier(LogNotifier::new().with_bell(config.bell))
        .with_policy(NotificationPolicy {
            suppress_first_pass: true,
            grace_period: config.grace_period,
        });
    info!("Order board started");

    if config.mode == SourceMode::Stream {
        match source.subscribe().await {
            Ok(subscription) => {
                if board.run_feed(subscription, shutdown_signal()).await == RunOutcome::Shutdown {
                    info!("Order board stopped");
                    return Ok(());
                }
                warn!("Order stream ended, switching to polling");
            }
            Err(e) => warn!(error = %e, "Could not open order stream, polling instead"),
        }
    }

    board
        .run_polling(&source, config.poll_interval, config.fetch_timeout, shutdown_signal())
        .await;
    info!("Order board stopped");
    Ok(())
}
