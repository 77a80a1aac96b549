//! RFC 6455 WebSocket transport: handshake, framing and the server loop.

pub mod frame;
pub mod handshake;
mod server;

pub use frame::{CloseCode, Frame, FrameDecoder, FrameError, FrameFlags, Message, MessageAssembler, OpCode};
pub use handshake::{HandshakeError, HandshakeRequest, accept_key};
pub use server::{WebSocketServer, frame_snapshot};
