use std::sync::atomic::{AtomicU64, Ordering};

use crate::net::Transport;

/// Live counters for one network transport.
#[derive(Debug, Default)]
pub struct TransportCounters {
    pub active: AtomicU64,
    pub accepted: AtomicU64,
    pub refused: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    pub backlog_disconnects: AtomicU64,
}

impl TransportCounters {
    pub fn snapshot(&self) -> TransportStats {
        TransportStats {
            active: self.active.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            backlog_disconnects: self.backlog_disconnects.load(Ordering::Relaxed),
        }
    }
}

/// Counters shared by every bridge thread. Each field is updated
/// independently; [`BridgeStats::snapshot`] is not a consistent cut.
#[derive(Debug, Default)]
pub struct BridgeStats {
    pub ticks: AtomicU64,
    pub broadcasts: AtomicU64,
    broadcast_millihertz: AtomicU64,
    pub shm_publishes: AtomicU64,
    pub shm_skipped: AtomicU64,
    pub shm_contended: AtomicU64,
    pub commands_accepted: AtomicU64,
    pub commands_rejected: AtomicU64,
    pub commands_clamped: AtomicU64,
    pub tcp_data: TransportCounters,
    pub tcp_command: TransportCounters,
    pub websocket: TransportCounters,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(&self, transport: Transport) -> Option<&TransportCounters> {
        match transport {
            Transport::TcpData => Some(&self.tcp_data),
            Transport::TcpCommand => Some(&self.tcp_command),
            Transport::WebSocket => Some(&self.websocket),
            Transport::SharedMemory => None,
        }
    }

    pub fn set_broadcast_hz(&self, hz: f64) {
        self.broadcast_millihertz
            .store((hz.max(0.0) * 1000.0) as u64, Ordering::Relaxed);
    }

    /// Broadcast rate measured over the last full second.
    pub fn broadcast_hz(&self) -> f64 {
        self.broadcast_millihertz.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            broadcast_hz: self.broadcast_hz(),
            shm_publishes: self.shm_publishes.load(Ordering::Relaxed),
            shm_skipped: self.shm_skipped.load(Ordering::Relaxed),
            shm_contended: self.shm_contended.load(Ordering::Relaxed),
            commands_accepted: self.commands_accepted.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            commands_clamped: self.commands_clamped.load(Ordering::Relaxed),
            commands_dropped: 0,
            tcp_data: self.tcp_data.snapshot(),
            tcp_command: self.tcp_command.snapshot(),
            websocket: self.websocket.snapshot(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransportStats {
    pub active: u64,
    pub accepted: u64,
    pub refused: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub backlog_disconnects: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    pub ticks: u64,
    pub broadcasts: u64,
    pub broadcast_hz: f64,
    pub shm_publishes: u64,
    pub shm_skipped: u64,
    /// Copies skipped because a reader held the mapping lock.
    pub shm_contended: u64,
    pub commands_accepted: u64,
    pub commands_rejected: u64,
    pub commands_clamped: u64,
    pub commands_dropped: u64,
    pub tcp_data: TransportStats,
    pub tcp_command: TransportStats,
    pub websocket: TransportStats,
}
