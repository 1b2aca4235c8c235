//! Line framing for the chat wire protocol.
//!
//! Inbound bytes are split on `\n`, decoded as UTF-8 (lossily) and cleaned:
//! a backspace erases the character before it, other control characters are
//! dropped, and surrounding whitespace is trimmed. Outbound lines are terminated
//! with `\r\n`; prompts are written verbatim so the cursor stays on their line.

use thiserror::Error;
use tokio_util::{
    bytes::{BufMut, BytesMut},
    codec::{Decoder, Encoder},
};

/// Longest inbound line accepted before the connection is treated as broken
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024;

const BACKSPACE: char = '\u{8}';
const LINE_TERMINATOR: &[u8] = b"\r\n";

#[derive(Debug, Error)]
pub enum LineCodecError {
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything the server writes to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// One line, terminated with `\r\n`
    Line(String),
    /// Written as-is, without a terminator
    Prompt(String),
    /// Several lines written back to back (history replay)
    Lines(Vec<String>),
}

impl Outbound {
    pub fn line(text: impl Into<String>) -> Self {
        Self::Line(text.into())
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self::Prompt(text.into())
    }
}

/// Codec turning a TCP byte stream into cleaned chat lines and back
#[derive(Debug, Clone)]
pub struct ChatLineCodec {
    max_length: usize,
    // Bytes already scanned for a newline; avoids rescanning on partial reads
    next_index: usize,
}

impl ChatLineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for ChatLineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for ChatLineCodec {
    type Item = String;
    type Error = LineCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, LineCodecError> {
        let newline = buf[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.next_index + offset);

        match newline {
            Some(end) if end > self.max_length => Err(LineCodecError::LineTooLong {
                limit: self.max_length,
            }),
            Some(end) => {
                self.next_index = 0;
                let frame = buf.split_to(end + 1);
                let raw = String::from_utf8_lossy(&frame[..end]);
                Ok(Some(clean_line(&raw)))
            }
            None if buf.len() > self.max_length => Err(LineCodecError::LineTooLong {
                limit: self.max_length,
            }),
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, LineCodecError> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        // Unterminated tail (e.g. netcat's Ctrl+D mid-line)
        self.next_index = 0;
        let frame = buf.split_to(buf.len());
        Ok(Some(clean_line(&String::from_utf8_lossy(&frame))))
    }
}

impl Encoder<Outbound> for ChatLineCodec {
    type Error = LineCodecError;

    fn encode(&mut self, item: Outbound, dst: &mut BytesMut) -> Result<(), LineCodecError> {
        match item {
            Outbound::Line(line) => put_line(&line, dst),
            Outbound::Prompt(prompt) => dst.put_slice(prompt.as_bytes()),
            Outbound::Lines(lines) => {
                for line in &lines {
                    put_line(line, dst);
                }
            }
        }
        Ok(())
    }
}

fn put_line(line: &str, dst: &mut BytesMut) {
    dst.reserve(line.len() + LINE_TERMINATOR.len());
    dst.put_slice(line.as_bytes());
    dst.put_slice(LINE_TERMINATOR);
}

/// Apply backspaces, drop other control characters and trim whitespace.
pub fn clean_line(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            BACKSPACE => {
                cleaned.pop();
            }
            '\t' => cleaned.push(c),
            c if c.is_control() => {}
            c => cleaned.push(c),
        }
    }
    cleaned.trim().to_string()
}
