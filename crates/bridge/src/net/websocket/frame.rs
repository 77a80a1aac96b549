use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// High nibble of the first header byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u8 {
        const FIN = 0x80;
        const RSV1 = 0x40;
        const RSV2 = 0x20;
        const RSV3 = 0x10;
    }
}

impl FrameFlags {
    pub const RESERVED: FrameFlags = FrameFlags::RSV1.union(FrameFlags::RSV2).union(FrameFlags::RSV3);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(OpCode::Continuation),
            0x1 => Some(OpCode::Text),
            0x2 => Some(OpCode::Binary),
            0x8 => Some(OpCode::Close),
            0x9 => Some(OpCode::Ping),
            0xA => Some(OpCode::Pong),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode(pub u16);

impl CloseCode {
    pub const NORMAL: CloseCode = CloseCode(1000);
    pub const GOING_AWAY: CloseCode = CloseCode(1001);
    pub const PROTOCOL_ERROR: CloseCode = CloseCode(1002);
    pub const INVALID_PAYLOAD: CloseCode = CloseCode(1007);
    pub const MESSAGE_TOO_BIG: CloseCode = CloseCode(1009);

    /// Whether an endpoint may put this code in a close frame (RFC 6455
    /// section 7.4). 1005, 1006 and 1015 are reserved for local reporting.
    pub fn is_sendable(&self) -> bool {
        matches!(self.0, 1000..=1003 | 1007..=1014 | 3000..=4999)
    }
}

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("reserved header bits set")]
    ReservedBits,
    #[error("unknown opcode {0:#x}")]
    UnknownOpcode(u8),
    #[error("client frame is not masked")]
    Unmasked,
    #[error("fragmented control frame")]
    FragmentedControl,
    #[error("control frame carries {0} bytes")]
    ControlTooLarge(u64),
    #[error("continuation frame without a message in progress")]
    UnexpectedContinuation,
    #[error("new data frame while a fragmented message is in progress")]
    InterleavedMessage,
    #[error("message of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: usize },
    #[error("text message is not valid UTF-8")]
    InvalidUtf8,
    #[error("malformed close payload")]
    InvalidClose,
    #[error("close code {0} is not allowed on the wire")]
    InvalidCloseCode(u16),
}

impl FrameError {
    /// Close status sent to the peer before dropping the connection.
    pub fn close_code(&self) -> CloseCode {
        match self {
            FrameError::InvalidUtf8 => CloseCode::INVALID_PAYLOAD,
            FrameError::TooLarge { .. } => CloseCode::MESSAGE_TOO_BIG,
            _ => CloseCode::PROTOCOL_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub flags: FrameFlags,
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn is_final(&self) -> bool {
        self.flags.contains(FrameFlags::FIN)
    }
}

/// Incremental frame parser over a receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    pub max_payload: usize,
    /// Server side: every client frame must be masked.
    pub require_mask: bool,
}

impl FrameDecoder {
    pub fn server(max_payload: usize) -> Self {
        Self {
            max_payload,
            require_mask: true,
        }
    }

    pub fn client(max_payload: usize) -> Self {
        Self {
            max_payload,
            require_mask: false,
        }
    }

    /// Decodes one frame from the front of `buf`. Returns the frame and the
    /// bytes it consumed, or `None` if more input is needed. Header problems
    /// are reported as soon as the header is complete, before the payload
    /// arrives.
    pub fn decode(&self, buf: &[u8]) -> Result<Option<(Frame, usize)>, FrameError> {
        let [b0, b1, ..] = *buf else {
            return Ok(None);
        };

        let flags = FrameFlags::from_bits_truncate(b0);
        if flags.intersects(FrameFlags::RESERVED) {
            return Err(FrameError::ReservedBits);
        }
        let opcode = OpCode::from_u8(b0 & 0x0F).ok_or(FrameError::UnknownOpcode(b0 & 0x0F))?;
        let masked = b1 & 0x80 != 0;
        if self.require_mask && !masked {
            return Err(FrameError::Unmasked);
        }

        let (len, header) = match b1 & 0x7F {
            126 => {
                let Some(raw) = buf.get(2..4) else {
                    return Ok(None);
                };
                (u16::from_be_bytes([raw[0], raw[1]]) as u64, 4)
            }
            127 => {
                let Some(raw) = buf.get(2..10) else {
                    return Ok(None);
                };
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(raw);
                (u64::from_be_bytes(bytes), 10)
            }
            n => (n as u64, 2),
        };

        if opcode.is_control() {
            if !flags.contains(FrameFlags::FIN) {
                return Err(FrameError::FragmentedControl);
            }
            if len > MAX_CONTROL_PAYLOAD as u64 {
                return Err(FrameError::ControlTooLarge(len));
            }
        }
        if len > self.max_payload as u64 {
            return Err(FrameError::TooLarge {
                size: len,
                limit: self.max_payload,
            });
        }

        let len = len as usize;
        let mask_len = if masked { 4 } else { 0 };
        let total = header + mask_len + len;
        if buf.len() < total {
            return Ok(None);
        }

        let mut payload = buf[header + mask_len..total].to_vec();
        if masked {
            let mut key = [0u8; 4];
            key.copy_from_slice(&buf[header..header + 4]);
            apply_mask(&mut payload, key);
        }

        Ok(Some((
            Frame {
                flags: flags & FrameFlags::FIN,
                opcode,
                payload,
            },
            total,
        )))
    }
}

pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

fn write_header(out: &mut Vec<u8>, opcode: OpCode, fin: bool, masked: bool, len: usize) {
    let mut b0 = opcode.as_u8();
    if fin {
        b0 |= FrameFlags::FIN.bits();
    }
    out.push(b0);

    let mask_bit = if masked { 0x80 } else { 0 };
    if len < 126 {
        out.push(mask_bit | len as u8);
    } else if len <= u16::MAX as usize {
        out.push(mask_bit | 126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(mask_bit | 127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }
}

/// Encodes an unmasked server frame.
pub fn encode(opcode: OpCode, payload: &[u8], fin: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 10);
    write_header(&mut out, opcode, fin, false, payload.len());
    out.extend_from_slice(payload);
    out
}

/// Encodes a masked frame, as a client sends it.
pub fn encode_masked(opcode: OpCode, payload: &[u8], fin: bool, key: [u8; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 14);
    write_header(&mut out, opcode, fin, true, payload.len());
    out.extend_from_slice(&key);
    let start = out.len();
    out.extend_from_slice(payload);
    apply_mask(&mut out[start..], key);
    out
}

pub fn close_payload(code: CloseCode, reason: &str) -> Vec<u8> {
    let mut payload = code.0.to_be_bytes().to_vec();
    let mut end = reason.len().min(MAX_CONTROL_PAYLOAD - 2);
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    payload.extend_from_slice(&reason.as_bytes()[..end]);
    payload
}

/// Status code from a close payload; an empty payload carries none.
pub fn parse_close(payload: &[u8]) -> Result<Option<CloseCode>, FrameError> {
    match payload {
        [] => Ok(None),
        [_] => Err(FrameError::InvalidClose),
        [hi, lo, reason @ ..] => {
            if std::str::from_utf8(reason).is_err() {
                return Err(FrameError::InvalidUtf8);
            }
            let code = CloseCode(u16::from_be_bytes([*hi, *lo]));
            if !code.is_sendable() {
                return Err(FrameError::InvalidCloseCode(code.0));
            }
            Ok(Some(code))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

/// Reassembles fragmented data frames into whole messages, bounded by
/// `limit` bytes.
#[derive(Debug)]
pub struct MessageAssembler {
    kind: Option<OpCode>,
    buffer: Vec<u8>,
    limit: usize,
}

impl MessageAssembler {
    pub fn new(limit: usize) -> Self {
        Self {
            kind: None,
            buffer: Vec::new(),
            limit,
        }
    }

    pub fn in_progress(&self) -> bool {
        self.kind.is_some()
    }

    /// Feeds one data frame. Control frames are ignored here and must be
    /// handled by the caller.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>, FrameError> {
        let fin = frame.is_final();
        match frame.opcode {
            OpCode::Text | OpCode::Binary => {
                if self.kind.is_some() {
                    return Err(FrameError::InterleavedMessage);
                }
                self.check_size(frame.payload.len())?;
                if fin {
                    return finish(frame.opcode, frame.payload).map(Some);
                }
                self.kind = Some(frame.opcode);
                self.buffer = frame.payload;
                Ok(None)
            }
            OpCode::Continuation => {
                let Some(kind) = self.kind else {
                    return Err(FrameError::UnexpectedContinuation);
                };
                self.check_size(self.buffer.len() + frame.payload.len())?;
                self.buffer.extend_from_slice(&frame.payload);
                if !fin {
                    return Ok(None);
                }
                self.kind = None;
                finish(kind, std::mem::take(&mut self.buffer)).map(Some)
            }
            OpCode::Close | OpCode::Ping | OpCode::Pong => Ok(None),
        }
    }

    fn check_size(&self, size: usize) -> Result<(), FrameError> {
        if size > self.limit {
            return Err(FrameError::TooLarge {
                size: size as u64,
                limit: self.limit,
            });
        }
        Ok(())
    }
}

fn finish(kind: OpCode, payload: Vec<u8>) -> Result<Message, FrameError> {
    match kind {
        OpCode::Text => String::from_utf8(payload)
            .map(Message::Text)
            .map_err(|_| FrameError::InvalidUtf8),
        _ => Ok(Message::Binary(payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

    fn decode_one(bytes: &[u8]) -> Result<Option<(Frame, usize)>, FrameError> {
        FrameDecoder::server(1 << 20).decode(bytes)
    }

    #[test]
    fn rfc_masked_hello() {
        // Single-frame masked text message from RFC 6455 section 5.7.
        let bytes = [0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58];
        let (frame, used) = decode_one(&bytes).unwrap().unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(frame.opcode, OpCode::Text);
        assert!(frame.is_final());
        assert_eq!(frame.payload, b"Hello");
    }

    #[test]
    fn unmasked_client_frame_is_rejected() {
        let bytes = [0x81, 0x05, b'H', b'e', b'l', b'l', b'o'];
        assert_eq!(decode_one(&bytes), Err(FrameError::Unmasked));
        let (frame, _) = FrameDecoder::client(64).decode(&bytes).unwrap().unwrap();
        assert_eq!(frame.payload, b"Hello");
    }

    #[test]
    fn partial_input_needs_more() {
        let bytes = encode_masked(OpCode::Text, b"partial", true, KEY);
        for cut in 0..bytes.len() {
            assert_eq!(decode_one(&bytes[..cut]), Ok(None), "cut at {cut}");
        }
    }

    #[test]
    fn extended_lengths() {
        for len in [125usize, 126, 300, 65535, 65536, 70000] {
            let payload = vec![b'x'; len];
            let bytes = encode_masked(OpCode::Binary, &payload, true, KEY);
            let expected_header = match len {
                0..=125 => 2,
                126..=65535 => 4,
                _ => 10,
            };
            assert_eq!(bytes.len(), expected_header + 4 + len);
            let (frame, used) = decode_one(&bytes).unwrap().unwrap();
            assert_eq!(used, bytes.len());
            assert_eq!(frame.payload.len(), len);
        }
    }

    #[test]
    fn server_frames_are_unmasked() {
        let bytes = encode(OpCode::Text, &[b'a'; 200], true);
        assert_eq!(&bytes[..4], &[0x81u8, 126, 0, 200]);
        assert_eq!(bytes.len(), 204);
    }

    #[test]
    fn header_violations() {
        let mut rsv = encode_masked(OpCode::Text, b"x", true, KEY);
        rsv[0] |= 0x40;
        assert_eq!(decode_one(&rsv), Err(FrameError::ReservedBits));

        let mut opcode = encode_masked(OpCode::Text, b"x", true, KEY);
        opcode[0] = 0x83;
        assert_eq!(decode_one(&opcode), Err(FrameError::UnknownOpcode(0x3)));

        let fragmented_ping = encode_masked(OpCode::Ping, b"x", false, KEY);
        assert_eq!(decode_one(&fragmented_ping), Err(FrameError::FragmentedControl));

        let big_ping = encode_masked(OpCode::Ping, &[0; 126], true, KEY);
        assert_eq!(decode_one(&big_ping), Err(FrameError::ControlTooLarge(126)));
    }

    #[test]
    fn oversized_frame_fails_before_payload_arrives() {
        let header = [0x82, 0xFF, 0, 0, 0, 0, 0x10, 0, 0, 0];
        let err = FrameDecoder::server(1024).decode(&header).unwrap_err();
        assert_eq!(err.close_code(), CloseCode::MESSAGE_TOO_BIG);
    }

    #[test]
    fn fragments_reassemble() {
        let decoder = FrameDecoder::server(1024);
        let mut assembler = MessageAssembler::new(1024);
        let parts = [
            encode_masked(OpCode::Text, b"{\"variable\":", false, KEY),
            encode_masked(OpCode::Continuation, b"\"Controls.Flaps\",", false, KEY),
            encode_masked(OpCode::Continuation, b"\"value\":0.5}", true, KEY),
        ];
        let mut message = None;
        for part in &parts {
            let (frame, _) = decoder.decode(part).unwrap().unwrap();
            message = assembler.push(frame).unwrap();
        }
        assert_eq!(
            message,
            Some(Message::Text(
                "{\"variable\":\"Controls.Flaps\",\"value\":0.5}".into()
            ))
        );
        assert!(!assembler.in_progress());
    }

    #[test]
    fn continuation_rules() {
        let mut assembler = MessageAssembler::new(1024);
        let orphan = Frame {
            flags: FrameFlags::FIN,
            opcode: OpCode::Continuation,
            payload: vec![],
        };
        assert_eq!(assembler.push(orphan), Err(FrameError::UnexpectedContinuation));

        let start = Frame {
            flags: FrameFlags::empty(),
            opcode: OpCode::Text,
            payload: b"ab".to_vec(),
        };
        assert_eq!(assembler.push(start.clone()), Ok(None));
        assert_eq!(assembler.push(start), Err(FrameError::InterleavedMessage));
    }

    #[test]
    fn reassembly_is_bounded() {
        let mut assembler = MessageAssembler::new(4);
        let start = Frame {
            flags: FrameFlags::empty(),
            opcode: OpCode::Binary,
            payload: vec![1, 2, 3],
        };
        let more = Frame {
            flags: FrameFlags::FIN,
            opcode: OpCode::Continuation,
            payload: vec![4, 5],
        };
        assert_eq!(assembler.push(start), Ok(None));
        let err = assembler.push(more).unwrap_err();
        assert_eq!(err.close_code(), CloseCode::MESSAGE_TOO_BIG);
    }

    #[test]
    fn invalid_utf8_maps_to_1007() {
        let mut assembler = MessageAssembler::new(16);
        let frame = Frame {
            flags: FrameFlags::FIN,
            opcode: OpCode::Text,
            payload: vec![0xff, 0xfe],
        };
        let err = assembler.push(frame).unwrap_err();
        assert_eq!(err, FrameError::InvalidUtf8);
        assert_eq!(err.close_code(), CloseCode::INVALID_PAYLOAD);
    }

    #[test]
    fn close_payload_round_trip() {
        let payload = close_payload(CloseCode::GOING_AWAY, "bye");
        assert_eq!(payload, [0x03, 0xE9, b'b', b'y', b'e']);
        assert_eq!(parse_close(&payload), Ok(Some(CloseCode::GOING_AWAY)));
        assert_eq!(parse_close(&[]), Ok(None));
        assert_eq!(parse_close(&[3]), Err(FrameError::InvalidClose));
    }

    #[test]
    fn reserved_close_codes_are_refused() {
        for code in [999u16, 1004, 1005, 1006, 1015, 2000, 5000] {
            let error = parse_close(&code.to_be_bytes()).unwrap_err();
            assert_eq!(error, FrameError::InvalidCloseCode(code));
            assert_eq!(error.close_code(), CloseCode::PROTOCOL_ERROR);
        }
        for code in [1000u16, 1011, 3000, 4999] {
            assert_eq!(parse_close(&code.to_be_bytes()), Ok(Some(CloseCode(code))));
        }
    }
}
