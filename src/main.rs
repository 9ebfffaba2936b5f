//! `trafficsignal` - Randomized traffic-signal simulation

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use trafficsignal::cli::args::Cli;
use trafficsignal::cli::commands;
use trafficsignal::error::ExitCode;
use trafficsignal::observability::init_logging;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version arrive here too, and are not failures.
            let code = if e.use_stderr() {
                ExitCode::USAGE_ERROR
            } else {
                ExitCode::SUCCESS
            };
            std::process::exit(code);
        }
    };

    init_logging(cli.log_format, cli.verbose, cli.quiet, cli.color);

    let interrupt = CancellationToken::new();

    // First signal stops the run gracefully; a second one exits immediately.
    let handler_token = interrupt.clone();
    tokio::spawn(async move {
        let mut sigterm = signal(SignalKind::terminate()).ok();

        wait_for_signal(sigterm.as_mut()).await;
        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");
        handler_token.cancel();

        let code = wait_for_signal(sigterm.as_mut()).await;
        std::process::exit(code);
    });

    match commands::dispatch(cli, interrupt).await {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Waits for SIGINT or SIGTERM and returns the matching exit code.
async fn wait_for_signal(sigterm: Option<&mut tokio::signal::unix::Signal>) -> i32 {
    match sigterm {
        Some(term) => tokio::select! {
            _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
            _ = term.recv() => ExitCode::TERMINATED,
        },
        None => {
            let _ = tokio::signal::ctrl_c().await;
            ExitCode::INTERRUPTED
        }
    }
}
