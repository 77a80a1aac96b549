use std::collections::VecDeque;
use std::time::{Duration, Instant};

use aerobridge::{BridgeEvent, DisconnectReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: Duration,
    pub severity: Severity,
    pub message: String,
}

/// Bounded, most-recent-last log shown in the dashboard.
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    started: Instant,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            started: Instant::now(),
        }
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            at: self.started.elapsed(),
            severity,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn record(&mut self, event: &BridgeEvent) {
        let (severity, message) = describe(event);
        self.push(severity, message);
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

pub fn describe(event: &BridgeEvent) -> (Severity, String) {
    match event {
        BridgeEvent::ClientConnected {
            transport,
            client_id,
            addr,
        } => (
            Severity::Info,
            format!("{transport} client {client_id} connected from {addr}"),
        ),
        BridgeEvent::ClientDisconnected {
            transport,
            client_id,
            reason,
        } => {
            let severity = match reason {
                DisconnectReason::Graceful | DisconnectReason::Shutdown => Severity::Info,
                _ => Severity::Warn,
            };
            (
                severity,
                format!("{transport} client {client_id} {}", reason.as_str()),
            )
        }
        BridgeEvent::ConnectionDenied {
            transport,
            addr,
            reason,
        } => (
            Severity::Warn,
            format!("{transport} denied {addr}: {reason}"),
        ),
        BridgeEvent::TransportDisabled { transport, reason } => (
            Severity::Error,
            format!("{transport} disabled: {reason}"),
        ),
        BridgeEvent::Error { message } => (Severity::Error, message.clone()),
    }
}
