use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crossbeam::channel::Receiver;
use log::{debug, warn};

use crate::error::BridgeError;
use crate::events::{BridgeEvent, DisconnectReason};
use crate::net::connection::run_writer;
use crate::net::{
    ConnectionHandle, ConnectionState, ConnectionTable, Listener, NetContext, Transport,
    announce, configure_stream, is_timeout, spawn_worker,
};

use super::frame::{
    CloseCode, Frame, FrameDecoder, FrameError, Message, MessageAssembler, OpCode, close_payload,
    encode, parse_close,
};
use super::handshake::{self, BAD_REQUEST, HandshakeError};

/// Encodes the snapshot as one unmasked text frame, shared by every client.
pub fn frame_snapshot(json: &str) -> Arc<[u8]> {
    Arc::from(encode(OpCode::Text, json.as_bytes(), true))
}

pub struct WebSocketServer {
    listener: Listener,
}

impl WebSocketServer {
    pub(crate) fn start(addr: SocketAddr, ctx: NetContext) -> Result<Self, BridgeError> {
        let listener = Listener::spawn(Transport::WebSocket, addr, ctx, accept)?;
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

    /// Sends close 1001 to every client, then tears the listener down.
    pub(crate) fn shutdown(&mut self, deadline: Instant) {
        for handle in self.listener.table().handles() {
            if handle.state() == ConnectionState::Open {
                send_close(&handle, CloseCode::GOING_AWAY, "server shutdown");
            }
        }
        self.listener.shutdown(deadline);
    }
}

/// Sends the connection's single close frame. Later calls are no-ops.
fn send_close(handle: &ConnectionHandle, code: CloseCode, reason: &str) {
    if !handle.claim_close_frame() {
        return;
    }
    let frame = encode(OpCode::Close, &close_payload(code, reason), true);
    if let Err(e) = handle.write_all(&frame) {
        debug!("websocket client {} close frame not sent: {}", handle.id, e);
    }
}

fn accept(stream: TcpStream, peer: SocketAddr, table: &Arc<ConnectionTable>, ctx: &NetContext) {
    let opened = configure_stream(&stream, &ctx.config).and_then(|()| {
        ConnectionHandle::new(
            table.next_id(),
            Transport::WebSocket,
            peer,
            &stream,
            ConnectionState::Handshaking,
            Some(ctx.config.client_backlog),
        )
    });
    let (handle, outbound) = match opened {
        Ok((handle, Some(outbound))) => (handle, outbound),
        Ok((_, None)) => return,
        Err(e) => {
            warn!("websocket dropping {}: {}", peer, e);
            return;
        }
    };
    table.insert(Arc::clone(&handle));

    let table_ref = Arc::clone(table);
    let ctx = ctx.clone();
    spawn_worker(table, format!("websocket-{}-rx", handle.id), move || {
        serve(stream, handle, outbound, &table_ref, &ctx)
    });
}

fn serve(
    mut stream: TcpStream,
    handle: Arc<ConnectionHandle>,
    outbound: Receiver<Arc<[u8]>>,
    table: &Arc<ConnectionTable>,
    ctx: &NetContext,
) {
    let pending = match upgrade(&mut stream, &handle, ctx) {
        Ok(pending) => pending,
        Err(e) => {
            warn!("websocket handshake from {} failed: {}", handle.peer, e);
            if !matches!(e, HandshakeError::Closed | HandshakeError::Io(_)) {
                let _ = handle.write_all(BAD_REQUEST);
            }
            table.remove(handle.id);
            handle.close(DisconnectReason::ProtocolViolation);
            ctx.events.emit(BridgeEvent::ConnectionDenied {
                transport: Transport::WebSocket,
                addr: handle.peer,
                reason: e.to_string(),
            });
            return;
        }
    };

    handle.set_state(ConnectionState::Open);
    handle.touch();
    announce(ctx, &handle);

    let writer_handle = Arc::clone(&handle);
    let writer_ctx = ctx.clone();
    spawn_worker(table, format!("websocket-{}-tx", handle.id), move || {
        run_writer(writer_handle, outbound, writer_ctx)
    });

    let reason = read_frames(stream, &handle, ctx, pending);
    ctx.finish(table, &handle, reason);
}

fn upgrade(stream: &mut TcpStream, handle: &ConnectionHandle, ctx: &NetContext) -> Result<Vec<u8>, HandshakeError> {
    let (request, pending) = handshake::read_request(stream, ctx.config.handshake_timeout)?;
    handle.write_all(handshake::response(&request).as_bytes())?;
    debug!("websocket client {} upgraded on {}", handle.id, request.path);
    Ok(pending)
}

fn read_frames(
    mut stream: TcpStream,
    handle: &ConnectionHandle,
    ctx: &NetContext,
    mut pending: Vec<u8>,
) -> DisconnectReason {
    let decoder = FrameDecoder::server(ctx.config.max_message_bytes);
    let mut assembler = MessageAssembler::new(ctx.config.max_message_bytes);
    let ping_after = ctx.config.idle_timeout / 2;
    let mut ping_sent = false;
    let mut buf = [0u8; 4096];

    loop {
        loop {
            match decoder.decode(&pending) {
                Ok(Some((frame, used))) => {
                    pending.drain(..used);
                    handle.touch();
                    ping_sent = false;
                    match on_frame(frame, handle, ctx, &mut assembler) {
                        Ok(None) => {}
                        Ok(Some(reason)) => return reason,
                        Err(e) => return violation(handle, &e),
                    }
                }
                Ok(None) => break,
                Err(e) => return violation(handle, &e),
            }
        }

        if ctx.stopping() {
            send_close(handle, CloseCode::GOING_AWAY, "server shutdown");
            return DisconnectReason::Shutdown;
        }
        if handle.is_closed() {
            return handle.reason().unwrap_or(DisconnectReason::Graceful);
        }
        let idle = handle.idle_for();
        if idle >= ctx.config.idle_timeout {
            send_close(handle, CloseCode::NORMAL, "idle timeout");
            return DisconnectReason::Timeout;
        }
        if idle >= ping_after && !ping_sent {
            ping_sent = true;
            if let Err(e) = handle.write_all(&encode(OpCode::Ping, b"", true)) {
                debug!("websocket client {} ping failed: {}", handle.id, e);
                return DisconnectReason::Error;
            }
        }

        match stream.read(&mut buf) {
            Ok(0) => return DisconnectReason::Graceful,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                ctx.stats
                    .websocket
                    .bytes_received
                    .fetch_add(n as u64, Ordering::Relaxed);
            }
            Err(e) if is_timeout(&e) => {}
            Err(e) => {
                debug!("websocket client {} read failed: {}", handle.id, e);
                return DisconnectReason::Error;
            }
        }
    }
}

fn violation(handle: &ConnectionHandle, error: &FrameError) -> DisconnectReason {
    let code = error.close_code();
    warn!(
        "websocket client {} ({}): {}, closing with {}",
        handle.id, handle.peer, error, code.0
    );
    send_close(handle, code, &error.to_string());
    DisconnectReason::ProtocolViolation
}

/// Returns the reason to end the connection, if the frame ends it.
fn on_frame(
    frame: Frame,
    handle: &ConnectionHandle,
    ctx: &NetContext,
    assembler: &mut MessageAssembler,
) -> Result<Option<DisconnectReason>, FrameError> {
    match frame.opcode {
        OpCode::Ping => {
            if let Err(e) = handle.write_all(&encode(OpCode::Pong, &frame.payload, true)) {
                debug!("websocket client {} pong failed: {}", handle.id, e);
                return Ok(Some(DisconnectReason::Error));
            }
            Ok(None)
        }
        OpCode::Pong => Ok(None),
        OpCode::Close => {
            let code = parse_close(&frame.payload)?.unwrap_or(CloseCode::NORMAL);
            debug!("websocket client {} sent close {}", handle.id, code.0);
            send_close(handle, code, "");
            Ok(Some(DisconnectReason::Graceful))
        }
        OpCode::Text | OpCode::Binary | OpCode::Continuation => {
            if let Some(message) = assembler.push(frame)? {
                let payload = match message {
                    Message::Text(text) => text.into_bytes(),
                    Message::Binary(bytes) => bytes,
                };
                ctx.commands.submit_payload(&payload, Transport::WebSocket);
            }
            Ok(None)
        }
    }
}
