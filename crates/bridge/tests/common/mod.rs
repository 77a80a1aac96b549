#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use aerobridge::net::websocket::frame::{encode_masked, parse_close};
use aerobridge::net::websocket::{CloseCode, Frame, FrameDecoder, OpCode, accept_key};
use aerobridge::{Bridge, BridgeConfig};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn start(configure: impl FnOnce(&mut BridgeConfig)) -> Bridge {
    let mut config = BridgeConfig::local();
    config.broadcast_interval = Duration::from_millis(10);
    config.shutdown_timeout = Duration::from_secs(3);
    configure(&mut config);
    Bridge::start(config).unwrap()
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Ticks the bridge until `condition` holds on the returned commands.
pub fn tick_until<T>(
    bridge: &Bridge,
    mut pick: impl FnMut(Vec<aerobridge::OutgoingCommand>) -> Option<T>,
) -> Option<T> {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if let Some(found) = pick(bridge.on_simulation_tick(&[])) {
            return Some(found);
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

pub fn line_reader(addr: SocketAddr) -> BufReader<TcpStream> {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    BufReader::new(stream)
}

pub fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    line
}

pub struct WsClient {
    pub stream: TcpStream,
    buf: Vec<u8>,
    decoder: FrameDecoder,
}

impl WsClient {
    pub const KEY: &'static str = "dGhlIHNhbXBsZSBub25jZQ==";

    pub fn connect(addr: SocketAddr) -> Self {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        let request = format!(
            "GET /telemetry HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {}\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n",
            Self::KEY
        );
        stream.write_all(request.as_bytes()).unwrap();

        let mut client = Self {
            stream,
            buf: Vec::new(),
            decoder: FrameDecoder::client(16 * 1024 * 1024),
        };
        let head = client.read_head();
        assert!(head.starts_with("HTTP/1.1 101"), "unexpected response: {head}");
        assert!(head.contains(&format!("Sec-WebSocket-Accept: {}", accept_key(Self::KEY))));
        client
    }

    /// Reads up to and including the blank line ending an HTTP head.
    pub fn read_head(&mut self) -> String {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            if let Some(end) = self.buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head: Vec<u8> = self.buf.drain(..end + 4).collect();
                return String::from_utf8(head).unwrap();
            }
            assert!(Instant::now() < deadline, "no response head");
            assert_ne!(self.fill(), Some(0), "closed before the response head");
        }
    }

    /// `Some(0)` once the peer has closed, `None` on a read timeout.
    fn fill(&mut self) -> Option<usize> {
        let mut chunk = [0u8; 8192];
        match self.stream.read(&mut chunk) {
            Ok(n) => {
                self.buf.extend_from_slice(&chunk[..n]);
                Some(n)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                None
            }
            Err(_) => Some(0),
        }
    }

    /// Next frame from the server, or `None` once the connection is closed
    /// or nothing arrives within the timeout.
    pub fn next_frame(&mut self) -> Option<Frame> {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            if let Some((frame, used)) = self.decoder.decode(&self.buf).unwrap() {
                self.buf.drain(..used);
                return Some(frame);
            }
            if Instant::now() >= deadline || self.fill() == Some(0) {
                return None;
            }
        }
    }

    /// Skips snapshot frames until one with `opcode` arrives.
    pub fn next_of(&mut self, opcode: OpCode) -> Option<Frame> {
        while let Some(frame) = self.next_frame() {
            if frame.opcode == opcode {
                return Some(frame);
            }
        }
        None
    }

    pub fn next_close(&mut self) -> Option<CloseCode> {
        let frame = self.next_of(OpCode::Close)?;
        parse_close(&frame.payload).unwrap()
    }

    pub fn send(&mut self, opcode: OpCode, payload: &[u8], fin: bool) {
        let frame = encode_masked(opcode, payload, fin, [0x37, 0xfa, 0x21, 0x3d]);
        self.stream.write_all(&frame).unwrap();
    }

    pub fn send_text(&mut self, text: &str) {
        self.send(OpCode::Text, text.as_bytes(), true);
    }
}
