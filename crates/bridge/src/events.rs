use std::net::SocketAddr;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::net::Transport;

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub enum BridgeEvent {
    ClientConnected {
        transport: Transport,
        client_id: u64,
        addr: SocketAddr,
    },
    ClientDisconnected {
        transport: Transport,
        client_id: u64,
        reason: DisconnectReason,
    },
    ConnectionDenied {
        transport: Transport,
        addr: SocketAddr,
        reason: String,
    },
    TransportDisabled {
        transport: Transport,
        reason: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Graceful,
    Timeout,
    Backlog,
    ProtocolViolation,
    Shutdown,
    Error,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Graceful => "disconnected",
            DisconnectReason::Timeout => "timed out",
            DisconnectReason::Backlog => "backlog exceeded",
            DisconnectReason::ProtocolViolation => "protocol violation",
            DisconnectReason::Shutdown => "shutdown",
            DisconnectReason::Error => "error",
        }
    }
}

/// Sending half of the event channel. Events are dropped when nobody drains
/// the channel fast enough.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Sender<BridgeEvent>,
}

impl EventSink {
    pub fn emit(&self, event: BridgeEvent) {
        if let Err(TrySendError::Full(event)) = self.sender.try_send(event) {
            log::trace!("event channel full, dropping {:?}", event);
        }
    }
}

pub fn event_channel() -> (EventSink, Receiver<BridgeEvent>) {
    let (sender, receiver) = channel::bounded(EVENT_CAPACITY);
    (EventSink { sender }, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_channel_drops_events() {
        let (sink, receiver) = event_channel();
        for _ in 0..EVENT_CAPACITY + 10 {
            sink.emit(BridgeEvent::Error {
                message: "x".into(),
            });
        }
        assert_eq!(receiver.try_iter().count(), EVENT_CAPACITY);
    }
}
