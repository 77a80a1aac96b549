use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("line exceeds {limit} bytes")]
    TooLong { limit: usize },
}

/// Splits a byte stream into newline-terminated lines. A trailing `\r` is
/// stripped. Any line, complete or still buffered, longer than the limit is a
/// framing violation.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    limit: usize,
}

impl LineBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<Vec<u8>>, LineError> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.len() > self.limit {
                return Err(LineError::TooLong { limit: self.limit });
            }
            lines.push(line);
        }

        if self.pending.len() > self.limit {
            return Err(LineError::TooLong { limit: self.limit });
        }
        Ok(lines)
    }

    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_across_reads() {
        let mut buffer = LineBuffer::new(64);
        assert!(buffer.push(b"{\"a\":").unwrap().is_empty());
        let lines = buffer.push(b"1}\r\n{\"b\":2}\npart").unwrap();
        assert_eq!(lines, vec![b"{\"a\":1}".to_vec(), b"{\"b\":2}".to_vec()]);
        assert_eq!(buffer.buffered(), 4);
    }

    #[test]
    fn unterminated_overflow_is_an_error() {
        let mut buffer = LineBuffer::new(8);
        assert!(buffer.push(b"12345678").is_ok());
        assert_eq!(buffer.push(b"9"), Err(LineError::TooLong { limit: 8 }));
    }

    #[test]
    fn long_complete_line_is_an_error() {
        let mut buffer = LineBuffer::new(4);
        assert!(buffer.push(b"123456\n").is_err());
    }
}
