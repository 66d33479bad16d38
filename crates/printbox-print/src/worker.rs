// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Delivery worker — the single consumer of the job queue.
//
// One job per iteration: dequeue, encode, one send attempt, record the
// outcome, then pause for the inter-job delay.  The pause follows every
// attempt, failed or not: the printer has a slow mechanical feed and a
// small buffer.  A transport error ends the current job only.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use printbox_core::types::{Job, WorkerReport};

use crate::escpos::{self, ReceiptEncoder};
use crate::link::PrinterLink;
use crate::queue::JobQueue;

pub struct DeliveryWorker<L> {
    queue: Arc<JobQueue>,
    link: L,
    encoder: ReceiptEncoder,
    inter_job_delay: Duration,
}

impl<L: PrinterLink + 'static> DeliveryWorker<L> {
    pub fn new(
        queue: Arc<JobQueue>,
        link: L,
        encoder: ReceiptEncoder,
        inter_job_delay: Duration,
    ) -> Self {
        Self {
            queue,
            link,
            encoder,
            inter_job_delay,
        }
    }

    /// Run the worker on the current Tokio runtime.
    pub fn spawn(self) -> JoinHandle<WorkerReport> {
        tokio::spawn(self.run())
    }

    /// Drain the queue until shutdown, then fail whatever is still pending.
    pub async fn run(self) -> WorkerReport {
        let mut report = WorkerReport::default();
        info!(
            delay_ms = self.inter_job_delay.as_millis() as u64,
            "delivery worker started"
        );

        while let Some(job) = self.queue.dequeue_next().await {
            if self.deliver(&job).await {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.inter_job_delay) => {}
                _ = self.queue.shutdown_requested() => {
                    debug!("pacing cut short by shutdown");
                }
            }
        }

        report.abandoned = self.queue.abandon_pending().len() as u64;
        info!(
            delivered = report.delivered,
            failed = report.failed,
            abandoned = report.abandoned,
            "delivery worker stopped"
        );
        report
    }

    /// One attempt at printing a job.  Returns whether it was delivered.
    async fn deliver(&self, job: &Job) -> bool {
        let frames = self.encoder.encode(job);
        info!(
            job_id = %job.id,
            frames = frames.len(),
            bytes = frames.iter().map(|f| f.bytes.len()).sum::<usize>(),
            sha256 = %escpos::digest(&frames),
            "delivering job"
        );

        let outcome = self.link.send(&frames).await;
        let delivered = outcome.is_ok();
        match &outcome {
            Ok(()) => info!(job_id = %job.id, "job delivered"),
            Err(e) => warn!(job_id = %job.id, kind = ?e.kind, detail = %e.detail, "job failed"),
        }

        if let Err(e) = self.queue.complete(job.id, outcome) {
            error!(job_id = %job.id, error = %e, "could not record job outcome");
        }
        delivered
    }
}
