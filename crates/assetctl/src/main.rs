mod cli;
mod commands;
mod config;
mod error;
mod manifest;
mod output;
mod progress;
mod state;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use assetctl_core::AssetService;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::progress::ProgressObserver;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Offline commands never build a client
        Command::Config(ref args) => commands::config_cmd::handle(args, &cli.global),
        Command::Chunks(ref args) => commands::chunks::handle(args, &cli.global).await,
        Command::Plan(ref args) => commands::plan::handle(args, &cli.global).await,
        Command::Show(ref args) => commands::show::handle(args, &cli.global),

        Command::Completions(ref args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "assetctl", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let client_config = config::resolve_client_config(&cli.global)?;
            let service = AssetService::new(&client_config)?
                .with_observer(Arc::new(ProgressObserver::new(cli.global.quiet)));

            let cancel = service.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted; cancelling in-flight requests");
                    cancel.cancel();
                }
            });

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &service, &cli.global).await
        }
    }
}
