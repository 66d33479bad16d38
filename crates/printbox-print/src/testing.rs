// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory printer link for worker and service tests.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use printbox_core::error::{TransportError, TransportErrorKind};

use crate::escpos::{Frame, FrameKind};
use crate::link::PrinterLink;

#[derive(Default)]
struct Recorded {
    starts: Mutex<Vec<Instant>>,
    bodies: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
    fail_first: usize,
    fail_kind: Option<TransportErrorKind>,
}

/// Records every send; optionally slow, optionally failing the first calls.
#[derive(Clone, Default)]
pub(crate) struct RecordingLink {
    inner: Arc<Recorded>,
}

impl RecordingLink {
    pub(crate) fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Arc::new(Recorded {
                latency,
                ..Recorded::default()
            }),
        }
    }

    pub(crate) fn failing_first(count: usize, kind: TransportErrorKind) -> Self {
        Self {
            inner: Arc::new(Recorded {
                fail_first: count,
                fail_kind: Some(kind),
                ..Recorded::default()
            }),
        }
    }

    /// When each send began.
    pub(crate) fn starts(&self) -> Vec<Instant> {
        self.inner.starts.lock().expect("starts lock").clone()
    }

    /// Body text of each send, lines joined with `\n`.
    pub(crate) fn bodies(&self) -> Vec<String> {
        self.inner.bodies.lock().expect("bodies lock").clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }
}

impl PrinterLink for RecordingLink {
    fn send(&self, frames: &[Frame]) -> impl Future<Output = Result<(), TransportError>> + Send {
        let inner = Arc::clone(&self.inner);
        let body = frames
            .iter()
            .filter(|f| f.kind == FrameKind::Body)
            .map(|f| String::from_utf8_lossy(&f.bytes).trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n");

        async move {
            let call = {
                let mut starts = inner.starts.lock().expect("starts lock");
                starts.push(Instant::now());
                starts.len() - 1
            };
            let now = inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            inner.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(inner.latency).await;

            inner.in_flight.fetch_sub(1, Ordering::SeqCst);
            inner.bodies.lock().expect("bodies lock").push(body);

            match inner.fail_kind {
                Some(kind) if call < inner.fail_first => {
                    Err(TransportError::new(kind, "simulated failure"))
                }
                _ => Ok(()),
            }
        }
    }
}
