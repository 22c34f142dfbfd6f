mod cli;

use clap::Parser;
use figsplit_batch::{
    HttpSplitClient, RunController, RunOutcome, cancel_on_signal, init_file_logging,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();

    // Nothing is created for a missing input, not even the log file
    if !args.input_path.exists() {
        println!(
            "Input path {} does not exist, nothing to do",
            args.input_path.display()
        );
        return ExitCode::SUCCESS;
    }

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_file_logging(&config.log_path(), args.verbose) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let client = match HttpSplitClient::new(&config.service) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to create HTTP client");
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel_token = CancellationToken::new();
    let _signal_watch = cancel_on_signal(cancel_token.clone());

    let controller =
        RunController::new(config, Arc::new(client)).with_cancellation(cancel_token);

    match controller.run().await {
        Ok(RunOutcome::InputMissing) => {
            println!("Input path disappeared, nothing to do");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Aborted(report)) => {
            println!(
                "Stopped after a server error: {} items recorded in {} of {} chunks; re-run once the service recovers",
                report.recorded, report.chunks_dispatched, report.chunks_total
            );
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Completed(report)) => {
            let suffix = if report.cancelled { " (interrupted)" } else { "" };
            println!(
                "Recorded {} items in {} of {} chunks{}",
                report.recorded, report.chunks_dispatched, report.chunks_total, suffix
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
