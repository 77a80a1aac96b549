use std::collections::HashMap;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::events::DisconnectReason;

use super::{NetContext, POLL_INTERVAL, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Handshaking = 0,
    Open = 1,
    Closing = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Handshaking,
            1 => ConnectionState::Open,
            _ => ConnectionState::Closing,
        }
    }
}

/// Shared record of one client connection. The reader thread owns the read
/// half; writes from the writer thread and from control replies are
/// serialized through `writer`.
pub(crate) struct ConnectionHandle {
    pub id: u64,
    pub transport: Transport,
    pub peer: SocketAddr,
    state: AtomicU8,
    writer: Mutex<TcpStream>,
    control: TcpStream,
    outbound: Option<Sender<Arc<[u8]>>>,
    last_activity: Mutex<Instant>,
    closed: AtomicBool,
    close_frame_sent: AtomicBool,
    reason: Mutex<Option<DisconnectReason>>,
}

impl ConnectionHandle {
    /// `backlog` sizes the outbound queue; `None` for receive-only
    /// connections.
    pub fn new(
        id: u64,
        transport: Transport,
        peer: SocketAddr,
        stream: &TcpStream,
        state: ConnectionState,
        backlog: Option<usize>,
    ) -> io::Result<(Arc<Self>, Option<Receiver<Arc<[u8]>>>)> {
        let (outbound, receiver) = match backlog {
            Some(capacity) => {
                let (tx, rx) = channel::bounded(capacity.max(1));
                (Some(tx), Some(rx))
            }
            None => (None, None),
        };

        let handle = Arc::new(Self {
            id,
            transport,
            peer,
            state: AtomicU8::new(state as u8),
            writer: Mutex::new(stream.try_clone()?),
            control: stream.try_clone()?,
            outbound,
            last_activity: Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
            close_frame_sent: AtomicBool::new(false),
            reason: Mutex::new(None),
        });
        Ok((handle, receiver))
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Queues a broadcast payload without blocking. A full backlog closes
    /// the connection.
    pub fn offer(&self, payload: &Arc<[u8]>) -> bool {
        let Some(outbound) = &self.outbound else {
            return false;
        };
        if self.is_closed() {
            return false;
        }
        match outbound.try_send(Arc::clone(payload)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "{} client {} ({}) is not keeping up, disconnecting",
                    self.transport, self.id, self.peer
                );
                self.close(DisconnectReason::Backlog);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Writes directly to the socket, bounded by the socket write timeout.
    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(bytes)?;
        writer.flush()
    }

    /// Marks the connection closed and shuts the socket down, which wakes
    /// both threads. The first reason recorded wins.
    pub fn close(&self, reason: DisconnectReason) {
        {
            let mut slot = self.reason.lock();
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.set_state(ConnectionState::Closing);
            let _ = self.control.shutdown(Shutdown::Both);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<DisconnectReason> {
        *self.reason.lock()
    }

    /// Returns `true` exactly once, for the caller that gets to send the
    /// close frame.
    pub fn claim_close_frame(&self) -> bool {
        !self.close_frame_sent.swap(true, Ordering::AcqRel)
    }
}

/// Drains the outbound queue onto the socket until the connection closes.
pub(crate) fn run_writer(handle: Arc<ConnectionHandle>, outbound: Receiver<Arc<[u8]>>, ctx: NetContext) {
    let counters = ctx.stats.transport(handle.transport);
    while !handle.is_closed() {
        match outbound.recv_timeout(POLL_INTERVAL) {
            Ok(payload) => {
                if let Err(e) = handle.write_all(&payload) {
                    let reason = match e.kind() {
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                            DisconnectReason::Backlog
                        }
                        _ => DisconnectReason::Error,
                    };
                    debug!("{} client {} write failed: {}", handle.transport, handle.id, e);
                    handle.close(reason);
                    break;
                }
                if let Some(counters) = counters {
                    counters.bytes_sent.fetch_add(payload.len() as u64, Ordering::Relaxed);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

pub(crate) struct ConnectionTable {
    transport: Transport,
    next_id: AtomicU64,
    connections: Mutex<HashMap<u64, Arc<ConnectionHandle>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ConnectionTable {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
            connections: Mutex::new(HashMap::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, handle: Arc<ConnectionHandle>) {
        self.connections.lock().insert(handle.id, handle);
    }

    pub fn remove(&self, id: u64) -> Option<Arc<ConnectionHandle>> {
        self.connections.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn handles(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.lock().values().cloned().collect()
    }

    /// Offers one shared payload to every open connection. Returns how many
    /// accepted it.
    pub fn broadcast(&self, payload: &Arc<[u8]>) -> usize {
        self.handles()
            .iter()
            .filter(|h| h.state() == ConnectionState::Open)
            .filter(|h| h.offer(payload))
            .count()
    }

    pub fn close_all(&self, reason: DisconnectReason) {
        for handle in self.handles() {
            handle.close(reason);
        }
    }

    pub fn track(&self, worker: JoinHandle<()>) {
        let mut workers = self.workers.lock();
        workers.retain(|w| !w.is_finished());
        workers.push(worker);
    }

    pub fn take_workers(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *self.workers.lock())
    }
}
