// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP printer link (JetDirect style, port 9100).
//
// One fresh connection per delivery attempt: open, write every frame,
// flush, shut down, drop.  Thermal printer bridges usually serve a single
// client and go stale if a socket is held open, so nothing is pooled.
// Nothing is read back; "delivered" means the write completed.

use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use printbox_core::config::PrinterConfig;
use printbox_core::error::TransportError;

use crate::escpos::Frame;

/// Default raw TCP port (HP JetDirect).
pub const RAW_PORT: u16 = 9100;

/// Something that can carry a receipt to the printer.
///
/// Implementations make exactly one attempt per call and never retry.
pub trait PrinterLink: Send + Sync {
    fn send(&self, frames: &[Frame]) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Printer reachable over a plain TCP byte stream.
#[derive(Debug, Clone)]
pub struct TcpPrinterLink {
    addr: String,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl TcpPrinterLink {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            write_timeout,
        }
    }

    pub fn from_config(config: &PrinterConfig) -> Self {
        Self::new(config.address(), config.connect_timeout(), config.write_timeout())
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<TcpStream, TransportError> {
        tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                TransportError::timeout(format!(
                    "connection to {} timed out after {}ms",
                    self.addr,
                    self.connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| connect_error(&self.addr, e))
    }
}

impl PrinterLink for TcpPrinterLink {
    fn send(&self, frames: &[Frame]) -> impl Future<Output = Result<(), TransportError>> + Send {
        async move {
            let total: usize = frames.iter().map(|f| f.bytes.len()).sum();
            info!(addr = %self.addr, frames = frames.len(), total, "connecting via raw TCP");

            // The stream is dropped on every return path below, which closes
            // the socket.
            let mut stream = self.connect().await?;

            tokio::time::timeout(self.write_timeout, write_frames(&mut stream, frames))
                .await
                .map_err(|_| {
                    TransportError::timeout(format!(
                        "write to {} timed out after {}ms",
                        self.addr,
                        self.write_timeout.as_millis()
                    ))
                })??;

            info!(addr = %self.addr, total, "receipt sent");
            Ok(())
        }
    }
}

fn connect_error(addr: &str, e: std::io::Error) -> TransportError {
    let detail = format!("connect to {addr}: {e}");
    if e.kind() == ErrorKind::TimedOut {
        TransportError::timeout(detail)
    } else {
        TransportError::connect(detail)
    }
}

fn write_error(context: String, e: std::io::Error) -> TransportError {
    let detail = format!("{context}: {e}");
    if e.kind() == ErrorKind::TimedOut {
        TransportError::timeout(detail)
    } else {
        TransportError::write(detail)
    }
}

async fn write_frames(stream: &mut TcpStream, frames: &[Frame]) -> Result<(), TransportError> {
    let mut sent = 0usize;
    for frame in frames {
        stream
            .write_all(&frame.bytes)
            .await
            .map_err(|e| write_error(format!("send failed at byte {sent}"), e))?;
        sent += frame.bytes.len();
        debug!(sent, kind = ?frame.kind, "frame written");
    }

    stream
        .flush()
        .await
        .map_err(|e| write_error("flush".into(), e))?;
    stream
        .shutdown()
        .await
        .map_err(|e| write_error("shutdown".into(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escpos::{FrameKind, ReceiptEncoder, payload};
    use printbox_core::error::TransportErrorKind;
    use printbox_core::types::{Job, JobId};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn link_to(addr: impl Into<String>) -> TcpPrinterLink {
        TcpPrinterLink::new(addr, Duration::from_secs(2), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn printer_receives_exact_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let reader = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.expect("read");
            received
        });

        let frames = ReceiptEncoder::default().encode(&Job::new(JobId(1), "hello", "test"));
        link_to(addr.to_string()).send(&frames).await.expect("send");

        // read_to_end only returns once the link has closed its side.
        let received = reader.await.expect("join");
        assert_eq!(received, payload(&frames));
    }

    #[tokio::test]
    async fn refused_connection_is_connect_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let frames = ReceiptEncoder::default().encode(&Job::new(JobId(1), "hello", "test"));
        let err = link_to(addr.to_string()).send(&frames).await.expect_err("refused");
        assert_eq!(err.kind, TransportErrorKind::ConnectFailed);
    }

    #[tokio::test]
    async fn stalled_printer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        // Accept but never read, so the socket buffers fill up.
        let holder = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let link = TcpPrinterLink::new(
            addr.to_string(),
            Duration::from_secs(2),
            Duration::from_millis(200),
        );
        let frames = vec![Frame {
            kind: FrameKind::Body,
            bytes: vec![b'x'; 32 * 1024 * 1024],
        }];
        let err = link.send(&frames).await.expect_err("stalled");
        assert_eq!(err.kind, TransportErrorKind::Timeout);
        holder.abort();
    }

    #[test]
    fn os_timeouts_map_to_timeout() {
        let timed_out = || std::io::Error::new(ErrorKind::TimedOut, "timed out");
        assert_eq!(connect_error("printer:9100", timed_out()).kind, TransportErrorKind::Timeout);
        assert_eq!(write_error("flush".into(), timed_out()).kind, TransportErrorKind::Timeout);

        let refused = std::io::Error::new(ErrorKind::ConnectionRefused, "refused");
        assert_eq!(connect_error("printer:9100", refused).kind, TransportErrorKind::ConnectFailed);
        let reset = std::io::Error::new(ErrorKind::ConnectionReset, "reset");
        assert_eq!(write_error("flush".into(), reset).kind, TransportErrorKind::WriteFailed);
    }

    #[test]
    fn from_config_uses_host_and_port() {
        let mut config = PrinterConfig::default();
        config.host = "printer.lan".into();
        config.port = RAW_PORT + 1;
        assert_eq!(TcpPrinterLink::from_config(&config).addr(), "printer.lan:9101");
    }
}
