use crate::error::{Result, TransportError};
use std::collections::VecDeque;

/// Circular buffer for line-based parsing of a chunked byte stream.
/// Network reads may split a line (or a multi-byte character) anywhere.
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
}

impl CircularLineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract next line (up to \n) from buffer, trimmed.
    /// Returns None if no complete line is available
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;

        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();

        match std::str::from_utf8(&line_bytes) {
            Ok(line_str) => Some(Ok(line_str.trim().to_string())),
            Err(e) => Some(Err(TransportError::Protocol(format!("Invalid UTF-8: {}", e)))),
        }
    }

    /// Terminate a trailing partial line so `next_line` can hand it out.
    /// Called once the byte source is exhausted.
    pub fn close(&mut self) {
        if !self.buffer.is_empty() && self.buffer.back() != Some(&b'\n') {
            self.buffer.push_back(b'\n');
        }
    }

    /// Current buffer size
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
