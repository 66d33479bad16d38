// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PrintboxError, Result};

/// Environment variable overriding `printer.host`.
pub const ENV_PRINTER_HOST: &str = "PRINTBOX_PRINTER_HOST";
/// Environment variable overriding `printer.port`.
pub const ENV_PRINTER_PORT: &str = "PRINTBOX_PRINTER_PORT";

/// Where and how to reach the printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Host name or IP of the raw TCP bridge.
    pub host: String,
    /// Raw TCP port (JetDirect style, default 9100).
    pub port: u16,
    pub connect_timeout_ms: u64,
    /// Upper bound on writing one whole job.
    pub write_timeout_ms: u64,
    /// Printable columns per line (48 on 80 mm paper).
    pub line_width: usize,
    /// Blank lines fed after the body so the text clears the tear bar.
    pub feed_lines: usize,
    /// Send a partial-cut command after the feed.
    pub cut_paper: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9100,
            connect_timeout_ms: 5_000,
            write_timeout_ms: 5_000,
            line_width: 48,
            feed_lines: 6,
            cut_paper: false,
        }
    }
}

impl PrinterConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// `host:port`, as passed to `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Queue bounds and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of pending plus in-progress jobs.
    pub capacity: usize,
    /// Pause after every delivery attempt, successful or not.
    pub inter_job_delay_ms: u64,
    /// Finished jobs kept around for status polling.
    pub history_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            inter_job_delay_ms: 2_000,
            history_limit: 256,
        }
    }
}

impl QueueConfig {
    pub fn inter_job_delay(&self) -> Duration {
        Duration::from_millis(self.inter_job_delay_ms)
    }
}

/// Upper bound on `queue.capacity`.
pub const MAX_QUEUE_CAPACITY: usize = 10_000;

/// Upper bound on `queue.history_limit`.
pub const MAX_HISTORY_LIMIT: usize = 100_000;

/// Persistent application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintboxConfig {
    pub printer: PrinterConfig,
    pub queue: QueueConfig,
}

impl PrintboxConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(data) => {
                let config = serde_json::from_str(&data)?;
                info!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(PrintboxError::Io(e)),
        }
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup(ENV_PRINTER_HOST) {
            self.printer.host = host;
        }
        if let Some(port) = lookup(ENV_PRINTER_PORT) {
            match port.parse() {
                Ok(p) => self.printer.port = p,
                Err(_) => warn!(value = %port, "ignoring unparsable {ENV_PRINTER_PORT}"),
            }
        }
    }

    /// Reject settings the worker cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(PrintboxError::InvalidConfig(msg.into()));

        if self.printer.host.trim().is_empty() {
            return invalid("printer.host is empty");
        }
        if self.printer.port == 0 {
            return invalid("printer.port must be non-zero");
        }
        if self.printer.connect_timeout_ms == 0 || self.printer.write_timeout_ms == 0 {
            return invalid("printer timeouts must be non-zero");
        }
        if self.printer.line_width < 8 {
            return invalid("printer.line_width must be at least 8");
        }
        if self.queue.capacity == 0 {
            return invalid("queue.capacity must be at least 1");
        }
        if self.queue.capacity > MAX_QUEUE_CAPACITY {
            return invalid("queue.capacity is above 10000");
        }
        if self.queue.history_limit > MAX_HISTORY_LIMIT {
            return invalid("queue.history_limit is above 100000");
        }
        Ok(())
    }
}
