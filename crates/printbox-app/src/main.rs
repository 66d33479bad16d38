// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printbox — short messages to a thermal receipt printer
//
// Entry point. Initialises logging, loads configuration, starts the print
// service, then submits one message per stdin line.  Finished jobs are
// archived to stdout as JSON lines; logs go to stderr.

mod services;

use std::io::BufReader;
use std::process::ExitCode;

use printbox_print::PrintService;
use tracing::{error, info, warn};

use services::{archive, console, data_dir};

/// Environment variable naming the submitter recorded on each job.
const ENV_ORIGIN: &str = "PRINTBOX_ORIGIN";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Printbox starting");

    let config = match data_dir::load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };

    let input = match console::spawn_line_reader(BufReader::new(std::io::stdin())) {
        Ok(input) => input,
        Err(e) => {
            error!(error = %e, "could not start input reader");
            return ExitCode::FAILURE;
        }
    };

    let service = match PrintService::start(&config) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "print service failed to start");
            return ExitCode::FAILURE;
        }
    };

    let archiver = tokio::spawn(archive::archive_events(service.subscribe(), tokio::io::stdout()));

    let origin = std::env::var(ENV_ORIGIN).unwrap_or_else(|_| "console".to_string());

    tokio::select! {
        result = console::submit_lines(&service, input, &origin) => {
            match result {
                Ok(stats) => info!(accepted = stats.accepted, rejected = stats.rejected, "input closed; draining queue"),
                Err(e) => warn!(error = %e, "failed reading input; draining queue"),
            }
            tokio::select! {
                _ = service.wait_idle() => {}
                _ = tokio::signal::ctrl_c() => info!("interrupted while draining"),
            }
        }
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    let exit = match service.shutdown().await {
        Ok(report) => {
            info!(
                delivered = report.delivered,
                failed = report.failed,
                abandoned = report.abandoned,
                "print service stopped"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "print service did not stop cleanly");
            ExitCode::FAILURE
        }
    };

    // The queue (and with it the event sender) is dropped with the service,
    // which closes the archive channel.
    match archiver.await {
        Ok(archived) => info!(archived, "archive closed"),
        Err(e) => warn!(error = %e, "archive task failed"),
    }

    exit
}
