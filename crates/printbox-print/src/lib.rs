// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printbox Print — ESC/POS receipt encoding, the raw TCP printer link, the
// bounded job queue and the single delivery worker that drains it.  This
// crate bridges the core domain types defined in `printbox-core` and the
// physical printer.

pub mod escpos;
pub mod link;
pub mod queue;
pub mod service;
pub mod worker;

#[cfg(test)]
mod testing;

pub use escpos::{Frame, FrameKind, ReceiptEncoder};
pub use link::{PrinterLink, TcpPrinterLink};
pub use queue::JobQueue;
pub use service::PrintService;
pub use worker::DeliveryWorker;
