// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Archival of finished jobs as JSON lines.

use printbox_core::types::TerminalEvent;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Write one JSON line per terminal event until the channel closes.
///
/// Returns the number of records written.
pub async fn archive_events<W>(mut events: broadcast::Receiver<TerminalEvent>, mut out: W) -> usize
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "archive fell behind; records lost");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let mut line = match serde_json::to_vec(&event.job) {
            Ok(line) => line,
            Err(e) => {
                warn!(job_id = %event.job.id, error = %e, "failed to serialize job");
                continue;
            }
        };
        line.push(b'\n');

        if let Err(e) = out.write_all(&line).await {
            warn!(error = %e, "archive write failed; stopping");
            break;
        }
        if let Err(e) = out.flush().await {
            warn!(error = %e, "archive flush failed; stopping");
            break;
        }
        debug!(job_id = %event.job.id, "job archived");
        written += 1;
    }
    written
}
