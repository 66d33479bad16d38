// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Console submitter — one message per stdin line.
//
// Stands in for the web form: it performs the same checks the form does
// (non-empty, at most 240 characters) before handing the message to the
// print service.
//
// Lines are read on a plain OS thread and handed over a channel.  A read
// blocked on a terminal then never holds up runtime shutdown; the thread
// dies with the process.

use std::io::BufRead;

use printbox_core::human_errors::{humanize_error, humanize_report};
use printbox_print::PrintService;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Lines buffered between the reader thread and the submitter.
const LINE_BUFFER: usize = 64;

/// Longest message accepted, in characters (about five receipt lines).
pub const MAX_MESSAGE_CHARS: usize = 240;

/// Why a line was not submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    TooLong,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Please enter a message!",
            Self::TooLong => "Message too long (max 240 characters / 5 lines)",
        }
    }
}

/// Trim and check a message the way the submission form does.
pub fn validate_message(raw: &str) -> Result<&str, Rejection> {
    let message = raw.trim();
    if message.is_empty() {
        Err(Rejection::Empty)
    } else if message.chars().count() > MAX_MESSAGE_CHARS {
        Err(Rejection::TooLong)
    } else {
        Ok(message)
    }
}

/// Counters for one console session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Read `input` line by line on a dedicated thread.
///
/// The channel closes at EOF, after a read error, or once the receiver is
/// dropped and the next line arrives.
pub fn spawn_line_reader<R>(input: R) -> std::io::Result<mpsc::Receiver<std::io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::Builder::new()
        .name("printbox-input".into())
        .spawn(move || {
            for line in input.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
            debug!("input reader finished");
        })?;
    Ok(rx)
}

/// Submit each line received until the reader closes the channel.
pub async fn submit_lines(
    service: &PrintService,
    mut lines: mpsc::Receiver<std::io::Result<String>>,
    origin: &str,
) -> std::io::Result<SessionStats> {
    let mut stats = SessionStats::default();

    while let Some(line) = lines.recv().await {
        let line = line?;
        let message = match validate_message(&line) {
            Ok(message) => message,
            Err(rejection) => {
                if rejection != Rejection::Empty {
                    warn!(reason = rejection.message(), "message rejected");
                }
                stats.rejected += 1;
                continue;
            }
        };

        match service.submit(message, origin) {
            Ok(submission) => {
                stats.accepted += 1;
                let report = service.status(submission.job_id);
                let human = report
                    .as_ref()
                    .map(humanize_report)
                    .unwrap_or_else(humanize_error);
                info!(
                    job_id = %submission.job_id,
                    position = submission.position,
                    "{}",
                    human.message
                );
            }
            Err(e) => {
                stats.rejected += 1;
                let human = humanize_error(&e);
                warn!(error = %e, "{} {}", human.message, human.suggestion);
            }
        }
    }

    Ok(stats)
}
