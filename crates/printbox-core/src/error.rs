// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Printbox.

use thiserror::Error;

use crate::types::{FailureReason, JobId};

/// Transport failure classes reported by the printer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectFailed,
    WriteFailed,
    Timeout,
}

impl From<TransportErrorKind> for FailureReason {
    fn from(kind: TransportErrorKind) -> Self {
        match kind {
            TransportErrorKind::ConnectFailed => FailureReason::ConnectFailed,
            TransportErrorKind::WriteFailed => FailureReason::WriteFailed,
            TransportErrorKind::Timeout => FailureReason::Timeout,
        }
    }
}

/// A single delivery attempt failed. Ends the current job only.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {detail}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn connect(detail: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ConnectFailed, detail)
    }

    pub fn write(detail: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::WriteFailed, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, detail)
    }
}

/// Top-level error type for all Printbox operations.
#[derive(Debug, Error)]
pub enum PrintboxError {
    // -- Queue --
    #[error("print queue is full ({capacity} jobs waiting)")]
    CapacityExceeded { capacity: usize },

    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("print queue is shutting down")]
    ShuttingDown,

    // -- Printer --
    #[error("printer transport error: {0}")]
    Transport(#[from] TransportError),

    // -- Configuration / startup --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("delivery worker error: {0}")]
    Worker(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrintboxError>;
