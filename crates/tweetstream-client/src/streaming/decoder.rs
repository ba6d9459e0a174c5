//! Incremental message decoder
//!
//! Splits the raw byte stream into complete JSON payloads. Chunks may cut
//! messages anywhere; incomplete data stays buffered until the rest arrives.

use tracing::trace;
use tweetstream_core::{DecodeError, DecodeResult, RawMessage};

use crate::config::Framing;

/// Decoder state for one connection
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Bytes not yet consumed as a complete frame
    buffer: Vec<u8>,
    framing: Framing,
    /// Byte count announced by the last length line (length framing only)
    pending_len: Option<usize>,
}

impl StreamDecoder {
    /// Create a decoder for the given framing
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            ..Self::default()
        }
    }

    /// Framing in use
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Number of buffered bytes awaiting a frame boundary
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed bytes and extract every message they complete
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DecodeResult<RawMessage>> {
        self.buffer.extend_from_slice(bytes);

        let mut messages = Vec::new();
        let consumed = match self.framing {
            Framing::Newline => self.split_lines(&mut messages),
            Framing::Length => self.split_lengths(&mut messages),
        };
        self.buffer.drain(..consumed);

        messages
    }

    /// Newline framing; returns the number of consumed bytes
    fn split_lines(&self, messages: &mut Vec<DecodeResult<RawMessage>>) -> usize {
        let mut start = 0;

        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let line = &self.buffer[start..start + offset];
            start += offset + 1;

            if let Some(message) = decode_payload(line) {
                messages.push(message);
            }
        }

        start
    }

    /// Length-prefix framing; returns the number of consumed bytes
    fn split_lengths(&mut self, messages: &mut Vec<DecodeResult<RawMessage>>) -> usize {
        let mut start = 0;

        loop {
            match self.pending_len {
                Some(len) => {
                    if self.buffer.len() - start < len {
                        break;
                    }
                    let payload = &self.buffer[start..start + len];
                    start += len;
                    self.pending_len = None;

                    if let Some(message) = decode_payload(payload) {
                        messages.push(message);
                    }
                }
                None => {
                    let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n')
                    else {
                        break;
                    };
                    let line = trim(&self.buffer[start..start + offset]);
                    start += offset + 1;

                    if line.is_empty() {
                        trace!("keep-alive");
                        continue;
                    }

                    match std::str::from_utf8(line)
                        .ok()
                        .and_then(|s| s.parse::<usize>().ok())
                    {
                        Some(len) => self.pending_len = Some(len),
                        None => messages.push(Err(DecodeError::InvalidLength(
                            String::from_utf8_lossy(line).into_owned(),
                        ))),
                    }
                }
            }
        }

        start
    }
}

/// Decode one frame; blank frames are keep-alives and yield nothing
fn decode_payload(payload: &[u8]) -> Option<DecodeResult<RawMessage>> {
    let payload = trim(payload);
    if payload.is_empty() {
        trace!("keep-alive");
        return None;
    }
    Some(RawMessage::from_slice(payload))
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}
