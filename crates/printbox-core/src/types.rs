// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Printbox message printer.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Sequence number of a print job.
///
/// Assigned by the queue at enqueue time and strictly increasing, so it
/// doubles as the delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a job ended without reaching the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// TCP connect was refused or unreachable.
    ConnectFailed,
    /// The connection opened but the write did not complete.
    WriteFailed,
    /// Connect or write exceeded the configured timeout.
    Timeout,
    /// Still queued when the worker shut down.
    NotDelivered,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ConnectFailed => "connect failed",
            Self::WriteFailed => "write failed",
            Self::Timeout => "timed out",
            Self::NotDelivered => "not delivered",
        };
        f.write_str(s)
    }
}

/// Lifecycle states of a print job.
///
/// Transitions only move forward:
/// `Pending -> InProgress -> {Delivered | Failed}`, or straight from
/// `Pending` to `Failed(NotDelivered)` at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Queued, waiting for the worker.
    Pending,
    /// Currently being transmitted to the printer.
    InProgress,
    /// Every byte was written without a transport error.
    Delivered,
    /// Terminal failure. Never retried automatically.
    Failed(FailureReason),
}

impl JobStatus {
    /// Whether the job still occupies a queue slot.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

/// A queued message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Message body, already validated by the submitter.
    pub text: String,
    /// Free-form submitter identity (e.g. client address). Printed in the
    /// header only.
    pub origin: String,
    pub submitted_at: DateTime<Local>,
    pub status: JobStatus,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Local>>,
    /// Transport detail for failed jobs.
    pub error_message: Option<String>,
}

impl Job {
    pub fn new(id: JobId, text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::submitted_at(id, text, origin, Local::now())
    }

    /// Build a job with an explicit capture time.
    pub fn submitted_at(
        id: JobId,
        text: impl Into<String>,
        origin: impl Into<String>,
        submitted_at: DateTime<Local>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            origin: origin.into(),
            submitted_at,
            status: JobStatus::Pending,
            finished_at: None,
            error_message: None,
        }
    }
}

/// Returned to the submitter when a job is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub job_id: JobId,
    /// 1-based: the number of active jobs up to and including this one.
    pub position: usize,
}

/// Point-in-time view of a job, for status polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobReport {
    Pending { position: usize },
    InProgress,
    Delivered { at: DateTime<Local> },
    Failed {
        reason: FailureReason,
        detail: Option<String>,
    },
}

/// Emitted once per job when it reaches `Delivered` or `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalEvent {
    pub job: Job,
}

/// Counters returned when the delivery worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub delivered: u64,
    pub failed: u64,
    /// Jobs still pending at shutdown.
    pub abandoned: u64,
}
