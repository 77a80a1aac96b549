//! Plain TCP transports. Both ports speak newline-delimited JSON: the data
//! port streams one snapshot document per line, the command port reads one
//! command payload per line.

use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use log::{debug, warn};

use crate::error::BridgeError;
use crate::events::DisconnectReason;

use super::connection::run_writer;
use super::{
    ConnectionHandle, ConnectionState, ConnectionTable, LineBuffer, Listener, NetContext,
    Transport, configure_stream, is_timeout, register, spawn_worker,
};

/// Appends the line terminator once so every client shares the same bytes.
pub fn frame_snapshot(json: &str) -> Arc<[u8]> {
    let mut line = Vec::with_capacity(json.len() + 1);
    line.extend_from_slice(json.as_bytes());
    line.push(b'\n');
    Arc::from(line)
}

pub struct TcpDataServer {
    listener: Listener,
}

impl TcpDataServer {
    pub(crate) fn start(addr: SocketAddr, ctx: NetContext) -> Result<Self, BridgeError> {
        let listener = Listener::spawn(Transport::TcpData, addr, ctx, accept_data)?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn client_count(&self) -> usize {
        self.listener.client_count()
    }

    pub(crate) fn table(&self) -> Arc<ConnectionTable> {
        Arc::clone(self.listener.table())
    }

    pub(crate) fn shutdown(&mut self, deadline: Instant) {
        self.listener.shutdown(deadline);
    }
}

fn accept_data(stream: TcpStream, peer: SocketAddr, table: &Arc<ConnectionTable>, ctx: &NetContext) {
    let transport = Transport::TcpData;
    let opened = configure_stream(&stream, &ctx.config).and_then(|()| {
        ConnectionHandle::new(
            table.next_id(),
            transport,
            peer,
            &stream,
            ConnectionState::Open,
            Some(ctx.config.client_backlog),
        )
    });
    let (handle, outbound) = match opened {
        Ok((handle, Some(outbound))) => (handle, outbound),
        Ok((_, None)) => return,
        Err(e) => {
            warn!("{} dropping {}: {}", transport, peer, e);
            return;
        }
    };
    register(table, ctx, &handle);

    let writer_handle = Arc::clone(&handle);
    let writer_ctx = ctx.clone();
    spawn_worker(table, format!("{transport}-{}-tx", handle.id), move || {
        run_writer(writer_handle, outbound, writer_ctx)
    });

    let table_ref = Arc::clone(table);
    let ctx = ctx.clone();
    spawn_worker(table, format!("{transport}-{}-rx", handle.id), move || {
        let reason = watch_data_client(stream, &handle, &ctx);
        ctx.finish(&table_ref, &handle, reason);
    });
}

/// Data clients only listen. Anything they send is discarded; the read side
/// exists to notice when they go away.
fn watch_data_client(mut stream: TcpStream, handle: &ConnectionHandle, ctx: &NetContext) -> DisconnectReason {
    let mut buf = [0u8; 1024];
    loop {
        if ctx.stopping() {
            return DisconnectReason::Shutdown;
        }
        if handle.is_closed() {
            return handle.reason().unwrap_or(DisconnectReason::Graceful);
        }
        match stream.read(&mut buf) {
            Ok(0) => return DisconnectReason::Graceful,
            Ok(n) => {
                ctx.stats
                    .tcp_data
                    .bytes_received
                    .fetch_add(n as u64, Ordering::Relaxed);
            }
            Err(e) if is_timeout(&e) => {}
            Err(e) => {
                debug!("{} client {} read failed: {}", handle.transport, handle.id, e);
                return DisconnectReason::Error;
            }
        }
    }
}

pub struct TcpCommandServer {
    listener: Listener,
}

impl TcpCommandServer {
    pub(crate) fn start(addr: SocketAddr, ctx: NetContext) -> Result<Self, BridgeError> {
        let listener = Listener::spawn(Transport::TcpCommand, addr, ctx, accept_command)?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn client_count(&self) -> usize {
        self.listener.client_count()
    }

    pub(crate) fn shutdown(&mut self, deadline: Instant) {
        self.listener.shutdown(deadline);
    }
}

fn accept_command(stream: TcpStream, peer: SocketAddr, table: &Arc<ConnectionTable>, ctx: &NetContext) {
    let transport = Transport::TcpCommand;
    let opened = configure_stream(&stream, &ctx.config).and_then(|()| {
        ConnectionHandle::new(table.next_id(), transport, peer, &stream, ConnectionState::Open, None)
    });
    let handle = match opened {
        Ok((handle, _)) => handle,
        Err(e) => {
            warn!("{} dropping {}: {}", transport, peer, e);
            return;
        }
    };
    register(table, ctx, &handle);

    let table_ref = Arc::clone(table);
    let ctx = ctx.clone();
    spawn_worker(table, format!("{transport}-{}-rx", handle.id), move || {
        let reason = read_commands(stream, &handle, &ctx);
        ctx.finish(&table_ref, &handle, reason);
    });
}

fn read_commands(mut stream: TcpStream, handle: &ConnectionHandle, ctx: &NetContext) -> DisconnectReason {
    let mut lines = LineBuffer::new(ctx.config.max_command_bytes);
    let mut buf = [0u8; 4096];
    loop {
        if ctx.stopping() {
            return DisconnectReason::Shutdown;
        }
        if handle.is_closed() {
            return handle.reason().unwrap_or(DisconnectReason::Graceful);
        }
        if handle.idle_for() >= ctx.config.idle_timeout {
            return DisconnectReason::Timeout;
        }

        let n = match stream.read(&mut buf) {
            Ok(0) => return DisconnectReason::Graceful,
            Ok(n) => n,
            Err(e) if is_timeout(&e) => continue,
            Err(e) => {
                debug!("{} client {} read failed: {}", handle.transport, handle.id, e);
                return DisconnectReason::Error;
            }
        };
        handle.touch();
        ctx.stats
            .tcp_command
            .bytes_received
            .fetch_add(n as u64, Ordering::Relaxed);

        match lines.push(&buf[..n]) {
            Ok(lines) => {
                for line in lines {
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    ctx.commands.submit_payload(&line, Transport::TcpCommand);
                }
            }
            Err(e) => {
                warn!(
                    "{} client {} ({}): {}, closing",
                    handle.transport, handle.id, handle.peer, e
                );
                return DisconnectReason::ProtocolViolation;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_line_is_terminated() {
        let framed = frame_snapshot("{\"a\":1}");
        assert_eq!(&framed[..], b"{\"a\":1}\n");
    }
}
