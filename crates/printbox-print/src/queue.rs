// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded in-memory print job queue.
//
// Many submitters enqueue concurrently; exactly one delivery worker
// dequeues.  All job state lives behind one mutex that is never held
// across an await or any I/O.  Jobs are not persisted: a finished job is
// kept only long enough to answer status polls, then evicted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Local;
use tokio::sync::{Notify, broadcast, watch};
use tracing::{debug, info, instrument, warn};

use printbox_core::config::QueueConfig;
use printbox_core::error::{PrintboxError, Result, TransportError};
use printbox_core::types::{
    FailureReason, Job, JobId, JobReport, JobStatus, Submission, TerminalEvent,
};

/// Smallest terminal-event buffer per subscriber.
const MIN_EVENT_BUFFER: usize = 256;

/// Room for a full queue abandoned at once plus every retained record, so a
/// subscriber that keeps up with deliveries never lags on shutdown.
fn event_buffer(capacity: usize, history_limit: usize) -> usize {
    capacity
        .saturating_add(history_limit)
        .saturating_add(1)
        .clamp(MIN_EVENT_BUFFER, usize::MAX / 4)
}

#[derive(Default)]
struct QueueState {
    next_id: u64,
    /// Pending job ids in delivery order.
    pending: VecDeque<JobId>,
    in_progress: Option<JobId>,
    /// Every job that is active or still within the history window.
    jobs: HashMap<JobId, Job>,
    /// Finished job ids, oldest first, for eviction.
    finished: VecDeque<JobId>,
    shutting_down: bool,
}

impl QueueState {
    fn active(&self) -> usize {
        self.pending.len() + usize::from(self.in_progress.is_some())
    }

    fn position_of(&self, id: JobId) -> Option<usize> {
        let ahead = usize::from(self.in_progress.is_some());
        self.pending
            .iter()
            .position(|p| *p == id)
            .map(|index| ahead + index + 1)
    }

    /// Remember a finished job, evicting the oldest beyond `limit`.
    fn retire(&mut self, id: JobId, limit: usize) {
        self.finished.push_back(id);
        while self.finished.len() > limit {
            if let Some(old) = self.finished.pop_front() {
                self.jobs.remove(&old);
            }
        }
    }
}

/// FIFO job queue shared by the submission side and the delivery worker.
pub struct JobQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    history_limit: usize,
    /// Woken on enqueue and on completion.
    ready: Notify,
    shutdown: watch::Sender<bool>,
    events: broadcast::Sender<TerminalEvent>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` active jobs.
    pub fn new(capacity: usize, history_limit: usize) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (events, _) = broadcast::channel(event_buffer(capacity, history_limit));
        Self {
            state: Mutex::new(QueueState {
                next_id: 1,
                ..QueueState::default()
            }),
            capacity,
            history_limit,
            ready: Notify::new(),
            shutdown,
            events,
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.capacity, config.history_limit)
    }

    /// The state is consistent between statements, so a panic elsewhere
    /// never leaves it half-updated.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pending plus in-progress jobs.
    pub fn len(&self) -> usize {
        self.lock().active()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }

    /// Append a new pending job.
    ///
    /// Fails with `CapacityExceeded` when `capacity` jobs are already
    /// pending or in progress; no job is created in that case.
    #[instrument(skip_all)]
    pub fn enqueue(&self, text: impl Into<String>, origin: impl Into<String>) -> Result<Submission> {
        let submission = {
            let mut state = self.lock();
            if state.shutting_down {
                return Err(PrintboxError::ShuttingDown);
            }
            let active = state.active();
            if active >= self.capacity {
                warn!(capacity = self.capacity, "queue full, rejecting job");
                return Err(PrintboxError::CapacityExceeded {
                    capacity: self.capacity,
                });
            }

            let id = JobId(state.next_id);
            state.next_id += 1;
            state.jobs.insert(id, Job::new(id, text, origin));
            state.pending.push_back(id);

            Submission {
                job_id: id,
                position: active + 1,
            }
        };

        self.ready.notify_one();
        info!(job_id = %submission.job_id, position = submission.position, "job queued");
        Ok(submission)
    }

    /// Wait for the next job in FIFO order and mark it `InProgress`.
    ///
    /// Returns `None` once shutdown has been requested.  While a job is in
    /// progress no other job is handed out.
    pub async fn dequeue_next(&self) -> Option<Job> {
        loop {
            {
                let mut state = self.lock();
                if state.shutting_down {
                    return None;
                }
                if state.in_progress.is_none() {
                    while let Some(id) = state.pending.pop_front() {
                        let Some(job) = state.jobs.get_mut(&id) else {
                            continue;
                        };
                        job.status = JobStatus::InProgress;
                        let job = job.clone();
                        state.in_progress = Some(id);
                        debug!(job_id = %id, "job dequeued");
                        return Some(job);
                    }
                }
            }

            tokio::select! {
                _ = self.ready.notified() => {}
                _ = self.shutdown_requested() => {}
            }
        }
    }

    /// Record the outcome of the in-progress job and publish its terminal
    /// event.
    #[instrument(skip(self, outcome), fields(job_id = %id))]
    pub fn complete(&self, id: JobId, outcome: std::result::Result<(), TransportError>) -> Result<Job> {
        let job = {
            let mut state = self.lock();
            if state.in_progress != Some(id) {
                return Err(PrintboxError::NotFound(id));
            }
            let job = state.jobs.get_mut(&id).ok_or(PrintboxError::NotFound(id))?;

            job.finished_at = Some(Local::now());
            match outcome {
                Ok(()) => job.status = JobStatus::Delivered,
                Err(e) => {
                    job.status = JobStatus::Failed(e.kind.into());
                    job.error_message = Some(e.detail);
                }
            }
            let job = job.clone();

            state.in_progress = None;
            state.retire(id, self.history_limit);
            job
        };

        self.ready.notify_one();
        debug!(status = ?job.status, "job finished");
        self.publish(&job);
        Ok(job)
    }

    /// 1-based position among active jobs.
    pub fn position_of(&self, id: JobId) -> Result<usize> {
        let state = self.lock();
        if state.in_progress == Some(id) {
            return Ok(1);
        }
        state.position_of(id).ok_or(PrintboxError::NotFound(id))
    }

    /// Current state of a job, for status polling.
    pub fn status(&self, id: JobId) -> Result<JobReport> {
        let state = self.lock();
        let job = state.jobs.get(&id).ok_or(PrintboxError::NotFound(id))?;

        let report = match job.status {
            JobStatus::Pending => JobReport::Pending {
                position: state.position_of(id).ok_or(PrintboxError::NotFound(id))?,
            },
            JobStatus::InProgress => JobReport::InProgress,
            JobStatus::Delivered => JobReport::Delivered {
                at: job.finished_at.unwrap_or(job.submitted_at),
            },
            JobStatus::Failed(reason) => JobReport::Failed {
                reason,
                detail: job.error_message.clone(),
            },
        };
        Ok(report)
    }

    /// Snapshot of a job record.
    pub fn job(&self, id: JobId) -> Option<Job> {
        self.lock().jobs.get(&id).cloned()
    }

    /// Receive a copy of every job as it reaches `Delivered` or `Failed`.
    pub fn subscribe(&self) -> broadcast::Receiver<TerminalEvent> {
        self.events.subscribe()
    }

    /// Stop handing out jobs.  The in-progress job, if any, still completes.
    pub fn shutdown(&self) {
        self.lock().shutting_down = true;
        self.shutdown.send_replace(true);
        self.ready.notify_one();
        info!("print queue shutting down");
    }

    /// Resolves once `shutdown` has been called.
    pub async fn shutdown_requested(&self) {
        let mut rx = self.shutdown.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Fail every job still pending with `NotDelivered`.
    pub fn abandon_pending(&self) -> Vec<Job> {
        let abandoned: Vec<Job> = {
            let mut state = self.lock();
            let ids: Vec<JobId> = state.pending.drain(..).collect();
            let now = Local::now();

            let mut abandoned = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(job) = state.jobs.get_mut(&id).filter(|job| job.status.is_active()) {
                    job.status = JobStatus::Failed(FailureReason::NotDelivered);
                    job.finished_at = Some(now);
                    job.error_message = Some("queue shut down before delivery".into());
                    abandoned.push(job.clone());
                }
                state.retire(id, self.history_limit);
            }
            abandoned
        };

        if !abandoned.is_empty() {
            warn!(count = abandoned.len(), "pending jobs not delivered");
        }
        for job in &abandoned {
            self.publish(job);
        }
        abandoned
    }

    fn publish(&self, job: &Job) {
        // No subscribers is fine.
        let _ = self.events.send(TerminalEvent { job: job.clone() });
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}
