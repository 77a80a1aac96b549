mod connection;
mod lines;
pub mod tcp;
pub mod websocket;

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::command::CommandProcessor;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::events::{BridgeEvent, DisconnectReason, EventSink};
use crate::stats::BridgeStats;

pub(crate) use connection::{ConnectionHandle, ConnectionTable};
pub use connection::ConnectionState;
pub use lines::{LineBuffer, LineError};

/// How long blocking socket calls wait before re-checking the stop flag.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    SharedMemory,
    TcpData,
    TcpCommand,
    WebSocket,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::SharedMemory => "shared-memory",
            Transport::TcpData => "tcp-data",
            Transport::TcpCommand => "tcp-command",
            Transport::WebSocket => "websocket",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a transport thread needs from the owning bridge.
#[derive(Clone)]
pub(crate) struct NetContext {
    pub config: Arc<BridgeConfig>,
    pub stop: Arc<AtomicBool>,
    pub stats: Arc<BridgeStats>,
    pub events: EventSink,
    pub commands: Arc<CommandProcessor>,
}

impl NetContext {
    pub fn stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Removes a finished connection and reports why it ended.
    pub fn finish(&self, table: &ConnectionTable, handle: &ConnectionHandle, fallback: DisconnectReason) {
        handle.close(fallback);
        if table.remove(handle.id).is_none() {
            return;
        }
        let reason = handle.reason().unwrap_or(fallback);
        if let Some(counters) = self.stats.transport(handle.transport) {
            counters.active.fetch_sub(1, Ordering::Relaxed);
            if reason == DisconnectReason::Backlog {
                counters.backlog_disconnects.fetch_add(1, Ordering::Relaxed);
            }
        }
        info!(
            "{} client {} ({}) {}",
            handle.transport,
            handle.id,
            handle.peer,
            reason.as_str()
        );
        self.events.emit(BridgeEvent::ClientDisconnected {
            transport: handle.transport,
            client_id: handle.id,
            reason,
        });
    }
}

/// A bound listener plus the accept thread and live connections behind it.
pub(crate) struct Listener {
    transport: Transport,
    local_addr: SocketAddr,
    table: Arc<ConnectionTable>,
    accept: Option<JoinHandle<()>>,
}

impl Listener {
    /// Binds `addr` and starts accepting. Each accepted stream is handed to
    /// `on_accept` on the accept thread, which must not block.
    pub(crate) fn spawn<F>(
        transport: Transport,
        addr: SocketAddr,
        ctx: NetContext,
        on_accept: F,
    ) -> Result<Self, BridgeError>
    where
        F: Fn(TcpStream, SocketAddr, &Arc<ConnectionTable>, &NetContext) + Send + 'static,
    {
        let resource = |source: io::Error| BridgeError::Resource { transport, source };
        let listener = TcpListener::bind(addr).map_err(resource)?;
        listener.set_nonblocking(true).map_err(resource)?;
        let local_addr = listener.local_addr().map_err(resource)?;

        let table = Arc::new(ConnectionTable::new(transport));
        let accept_table = Arc::clone(&table);
        let accept = thread::Builder::new()
            .name(format!("{transport}-accept"))
            .spawn(move || accept_loop(listener, accept_table, ctx, on_accept))
            .map_err(resource)?;

        info!("{} listening on {}", transport, local_addr);
        Ok(Self {
            transport,
            local_addr,
            table,
            accept: Some(accept),
        })
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn client_count(&self) -> usize {
        self.table.len()
    }

    pub(crate) fn table(&self) -> &Arc<ConnectionTable> {
        &self.table
    }

    /// Waits for the accept loop to exit (the stop flag must already be
    /// set), closes every connection and joins their threads.
    pub(crate) fn shutdown(&mut self, deadline: Instant) {
        if let Some(accept) = self.accept.take() {
            join_until(vec![accept], deadline, self.transport);
        }
        self.table.close_all(DisconnectReason::Shutdown);
        join_until(self.table.take_workers(), deadline, self.transport);
    }
}

fn accept_loop<F>(listener: TcpListener, table: Arc<ConnectionTable>, ctx: NetContext, on_accept: F)
where
    F: Fn(TcpStream, SocketAddr, &Arc<ConnectionTable>, &NetContext),
{
    let transport = table.transport();
    while !ctx.stopping() {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!("{} dropping {}: {}", transport, peer, e);
                    continue;
                }
                let counters = ctx.stats.transport(transport);
                if table.len() >= ctx.config.max_clients {
                    warn!(
                        "{} refusing {}: {} clients connected",
                        transport,
                        peer,
                        table.len()
                    );
                    if let Some(counters) = counters {
                        counters.refused.fetch_add(1, Ordering::Relaxed);
                    }
                    ctx.events.emit(BridgeEvent::ConnectionDenied {
                        transport,
                        addr: peer,
                        reason: "server full".into(),
                    });
                    continue;
                }
                debug!("{} accepted {}", transport, peer);
                on_accept(stream, peer, &table, &ctx);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL / 5),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                error!("{} accept failed: {}", transport, e);
                ctx.events.emit(BridgeEvent::Error {
                    message: format!("{transport} accept failed: {e}"),
                });
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
    debug!("{} accept loop stopped", transport);
}

pub(crate) fn configure_stream(stream: &TcpStream, config: &BridgeConfig) -> io::Result<()> {
    stream.set_nodelay(true)?;
    stream.set_write_timeout(Some(config.write_timeout))?;
    stream.set_read_timeout(Some(POLL_INTERVAL))
}

/// Read and write timeouts surface as either kind depending on the platform.
pub(crate) fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// Registers an accepted connection and reports it.
pub(crate) fn register(table: &ConnectionTable, ctx: &NetContext, handle: &Arc<ConnectionHandle>) {
    table.insert(Arc::clone(handle));
    announce(ctx, handle);
}

/// Counts and reports a connection that is now open.
pub(crate) fn announce(ctx: &NetContext, handle: &ConnectionHandle) {
    if let Some(counters) = ctx.stats.transport(handle.transport) {
        counters.accepted.fetch_add(1, Ordering::Relaxed);
        counters.active.fetch_add(1, Ordering::Relaxed);
    }
    info!("{} client {} connected from {}", handle.transport, handle.id, handle.peer);
    ctx.events.emit(BridgeEvent::ClientConnected {
        transport: handle.transport,
        client_id: handle.id,
        addr: handle.peer,
    });
}

pub(crate) fn spawn_worker<F>(table: &ConnectionTable, name: String, work: F)
where
    F: FnOnce() + Send + 'static,
{
    match thread::Builder::new().name(name).spawn(work) {
        Ok(handle) => table.track(handle),
        Err(e) => error!("{} failed to spawn connection thread: {}", table.transport(), e),
    }
}

/// Joins threads until `deadline`; anything still running is detached.
pub(crate) fn join_until(handles: Vec<JoinHandle<()>>, deadline: Instant, transport: Transport) {
    let mut pending = handles;
    while !pending.is_empty() && Instant::now() < deadline {
        let (finished, running): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|h| h.is_finished());
        for handle in finished {
            if handle.join().is_err() {
                error!("{} thread panicked", transport);
            }
        }
        pending = running;
        if !pending.is_empty() {
            thread::sleep(Duration::from_millis(5));
        }
    }
    if !pending.is_empty() {
        warn!("{} detaching {} thread(s) after shutdown timeout", transport, pending.len());
    }
}
