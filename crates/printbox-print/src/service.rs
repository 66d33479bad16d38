// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print service — the boundary the submission front end talks to.
//
// Validation, abuse checks and rate limiting happen before `submit` is
// called.  Submitting never waits on the printer: the caller gets a queue
// position (or a capacity rejection) immediately and polls `status` or
// listens on `subscribe` for the outcome.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use printbox_core::PrintboxConfig;
use printbox_core::error::{PrintboxError, Result};
use printbox_core::types::{JobId, JobReport, Submission, TerminalEvent, WorkerReport};

use crate::escpos::ReceiptEncoder;
use crate::link::{PrinterLink, TcpPrinterLink};
use crate::queue::JobQueue;
use crate::worker::DeliveryWorker;

/// A running queue plus its delivery worker.
pub struct PrintService {
    queue: Arc<JobQueue>,
    worker: JoinHandle<WorkerReport>,
}

impl PrintService {
    /// Validate the config and start delivering to the configured printer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &PrintboxConfig) -> Result<Self> {
        Self::with_link(config, TcpPrinterLink::from_config(&config.printer))
    }

    /// Start with a caller-supplied link.
    pub fn with_link<L: PrinterLink + 'static>(config: &PrintboxConfig, link: L) -> Result<Self> {
        config.validate()?;
        tokio::runtime::Handle::try_current()
            .map_err(|e| PrintboxError::Worker(format!("no Tokio runtime: {e}")))?;

        let queue = Arc::new(JobQueue::from_config(&config.queue));
        let worker = DeliveryWorker::new(
            Arc::clone(&queue),
            link,
            ReceiptEncoder::from_config(&config.printer),
            config.queue.inter_job_delay(),
        )
        .spawn();

        info!(
            printer = %config.printer.address(),
            capacity = config.queue.capacity,
            delay_ms = config.queue.inter_job_delay_ms,
            "print service started"
        );
        Ok(Self { queue, worker })
    }

    /// Queue a validated message.
    pub fn submit(&self, text: impl Into<String>, origin: impl Into<String>) -> Result<Submission> {
        self.queue.enqueue(text, origin)
    }

    pub fn status(&self, job_id: JobId) -> Result<JobReport> {
        self.queue.status(job_id)
    }

    /// Terminal events, for archival.
    pub fn subscribe(&self) -> broadcast::Receiver<TerminalEvent> {
        self.queue.subscribe()
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Wait until no job is pending or in progress.
    pub async fn wait_idle(&self) {
        let mut events = self.queue.subscribe();
        while !self.queue.is_empty() && !self.worker.is_finished() {
            match events.recv().await {
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "terminal events lagged while waiting for idle");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Stop the worker.  An in-progress job finishes; pending jobs are
    /// failed as not delivered.
    pub async fn shutdown(self) -> Result<WorkerReport> {
        self.queue.shutdown();
        self.worker
            .await
            .map_err(|e| PrintboxError::Worker(format!("delivery worker panicked: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingLink;
    use printbox_core::types::{FailureReason, JobStatus};
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn config(capacity: usize, delay_ms: u64) -> PrintboxConfig {
        let mut config = PrintboxConfig::default();
        config.queue.capacity = capacity;
        config.queue.inter_job_delay_ms = delay_ms;
        config.printer.connect_timeout_ms = 500;
        config.printer.write_timeout_ms = 500;
        config
    }

    #[test]
    fn start_outside_runtime_fails() {
        let result = PrintService::with_link(&config(10, 10), RecordingLink::default());
        assert!(matches!(result, Err(PrintboxError::Worker(_))));
    }

    #[tokio::test]
    async fn invalid_config_is_fatal() {
        let result = PrintService::with_link(&config(0, 10), RecordingLink::default());
        assert!(matches!(result, Err(PrintboxError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn submit_then_poll_until_delivered() {
        let link = RecordingLink::default();
        let service = PrintService::with_link(&config(10, 5), link.clone()).expect("start");

        let submission = service.submit("hello printer", "198.51.100.7").expect("submit");
        assert_eq!(submission.position, 1);

        tokio::time::timeout(Duration::from_secs(2), service.wait_idle())
            .await
            .expect("idle");
        assert!(matches!(
            service.status(submission.job_id).expect("status"),
            JobReport::Delivered { .. }
        ));
        assert_eq!(link.bodies(), vec!["hello printer"]);

        let report = service.shutdown().await.expect("shutdown");
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn capacity_of_one_rejects_second_submission() {
        // The slow link keeps the first job occupying its slot.
        let link = RecordingLink::with_latency(Duration::from_millis(300));
        let service = PrintService::with_link(&config(1, 10), link).expect("start");

        service.submit("first", "test").expect("first");
        let err = service.submit("second", "test").expect_err("full");
        assert!(matches!(err, PrintboxError::CapacityExceeded { capacity: 1 }));
        assert_eq!(service.queue().len(), 1);

        service.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn unreachable_printer_fails_each_job_and_keeps_going() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let mut cfg = config(10, 80);
        cfg.printer.port = port;
        let service = PrintService::start(&cfg).expect("start");
        let mut events = service.subscribe();

        let a = service.submit("A", "test").expect("A");
        let b = service.submit("B", "test").expect("B");

        let mut finished = Vec::new();
        for _ in 0..2 {
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("event in time")
                .expect("event");
            finished.push(event.job);
        }

        assert_eq!(finished[0].id, a.job_id);
        assert_eq!(finished[1].id, b.job_id);
        for job in &finished {
            assert_eq!(job.status, JobStatus::Failed(FailureReason::ConnectFailed));
            assert!(job.error_message.is_some());
        }

        let gap = finished[1].finished_at.expect("b finished") - finished[0].finished_at.expect("a finished");
        assert!(gap >= chrono::TimeDelta::milliseconds(80));

        let report = service.shutdown().await.expect("shutdown");
        assert_eq!(report.failed, 2);
    }

    #[tokio::test]
    async fn shutdown_reports_stranded_jobs() {
        let service =
            PrintService::with_link(&config(10, 60_000), RecordingLink::default()).expect("start");
        let mut events = service.subscribe();

        service.submit("A", "test").expect("A");
        let b = service.submit("B", "test").expect("B");
        events.recv().await.expect("A finished");

        let report = service.shutdown().await.expect("shutdown");
        assert_eq!((report.delivered, report.abandoned), (1, 1));

        let event = events.recv().await.expect("B abandoned");
        assert_eq!(event.job.id, b.job_id);
        assert_eq!(event.job.status, JobStatus::Failed(FailureReason::NotDelivered));
    }
}
