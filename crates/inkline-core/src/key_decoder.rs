#![forbid(unsafe_code)]

//! Byte-sequence decoder.
//!
//! Classifies raw terminal bytes into [`KeyEvent`] values.
//!
//! # Design
//!
//! Decoding is split in two layers:
//! - [`decode`] is a pure, total function over one complete read unit. It
//!   never blocks and never fails; input it does not know yields `None`.
//! - [`KeyReader`] frames a byte stream into read units (see [`next_unit`]),
//!   feeds them to [`decode`], and falls back to UTF-8 rune decoding when a
//!   unit starts with a non-ASCII byte.
//!
//! # Recognized sequences
//!
//! | Bytes | Key |
//! |-------|-----|
//! | `0x0D`, `0x0A` | Enter |
//! | `0x7F`, `0x08` | Backspace |
//! | `0x09` | Tab |
//! | `0x1B` | Escape |
//! | `0x20` | Space |
//! | `0x01`-`0x1A` (others) | Ctrl+a .. Ctrl+z |
//! | `0x21`-`0x7E` | printable character |
//! | `ESC [ A/B/C/D` | Up/Down/Right/Left |
//! | `ESC O P/Q/R/S` | F1-F4 |
//! | `ESC [ n ~` | Home, Insert, Delete, End, PageUp, PageDown (n = 1-6), F5-F12 |
//! | `ESC [ H`, `ESC [ F` | Home, End |
//!
//! # Framing heuristic
//!
//! After `ESC [` the framer accumulates bytes until the first ASCII letter or
//! `~`, looking at most [`MAX_CSI_LOOKAHEAD`] bytes past the introducer. This
//! is not a full terminal grammar; exotic sequences outside the table above
//! are framed by the same rule and then reported as skipped.

use std::io::{self, Read};

use crate::event::{KeyCode, KeyEvent, Modifiers};

/// Escape byte.
const ESC: u8 = 0x1B;

/// Maximum bytes inspected after `ESC [` while looking for a final byte.
pub const MAX_CSI_LOOKAHEAD: usize = 10;

/// Size of each fill read from the underlying source.
const FILL_CHUNK: usize = 256;

/// Decode one complete read unit into a key event.
///
/// Returns `None` when the bytes do not match any known key. Multi-byte input
/// that does not start with ESC is never recognized here; UTF-8 runes are
/// handled by [`KeyReader`].
#[must_use]
pub fn decode(bytes: &[u8]) -> Option<KeyEvent> {
    match bytes {
        [] => None,
        [byte] => decode_single(*byte),
        [ESC, rest @ ..] => decode_escape(rest),
        _ => None,
    }
}

fn decode_single(byte: u8) -> Option<KeyEvent> {
    let code = match byte {
        // Enter (Ctrl+M, Ctrl+J) - checked before the Ctrl range
        0x0D | 0x0A => KeyCode::Enter,
        // Backspace (DEL, Ctrl+H)
        0x7F | 0x08 => KeyCode::Backspace,
        // Tab (Ctrl+I)
        0x09 => KeyCode::Tab,
        ESC => KeyCode::Escape,
        b' ' => KeyCode::Space,
        // Remaining Ctrl+A through Ctrl+Z
        0x01..=0x07 | 0x0B | 0x0C | 0x0E..=0x1A => {
            let c = (b'a' + byte - 1) as char;
            return Some(KeyEvent::new(KeyCode::Char(c)).with_modifiers(Modifiers::CTRL));
        }
        0x21..=0x7E => KeyCode::Char(byte as char),
        _ => return None,
    };
    Some(KeyEvent::new(code))
}

/// Decode the bytes following ESC.
fn decode_escape(rest: &[u8]) -> Option<KeyEvent> {
    let code = match rest {
        [b'[', b'A'] => KeyCode::Up,
        [b'[', b'B'] => KeyCode::Down,
        [b'[', b'C'] => KeyCode::Right,
        [b'[', b'D'] => KeyCode::Left,
        [b'[', b'H'] => KeyCode::Home,
        [b'[', b'F'] => KeyCode::End,
        [b'O', b'P'] => KeyCode::F(1),
        [b'O', b'Q'] => KeyCode::F(2),
        [b'O', b'R'] => KeyCode::F(3),
        [b'O', b'S'] => KeyCode::F(4),
        [b'[', params @ .., b'~'] => tilde_key(params)?,
        _ => return None,
    };
    Some(KeyEvent::new(code))
}

/// Map the digit string of `ESC [ <digits> ~`.
///
/// The digit string must match exactly; leading zeros or modifier
/// parameters (`1;5~`) are not recognized.
fn tilde_key(params: &[u8]) -> Option<KeyCode> {
    let code = match params {
        b"1" => KeyCode::Home,
        b"2" => KeyCode::Insert,
        b"3" => KeyCode::Delete,
        b"4" => KeyCode::End,
        b"5" => KeyCode::PageUp,
        b"6" => KeyCode::PageDown,
        b"15" => KeyCode::F(5),
        b"17" => KeyCode::F(6),
        b"18" => KeyCode::F(7),
        b"19" => KeyCode::F(8),
        b"20" => KeyCode::F(9),
        b"21" => KeyCode::F(10),
        b"23" => KeyCode::F(11),
        b"24" => KeyCode::F(12),
        _ => return None,
    };
    Some(code)
}

/// Length of the read unit at the start of `buf`.
///
/// Only inspects bytes already buffered, so it never waits for input:
/// - `ESC [` accumulates until the first ASCII letter or `~`, at most
///   [`MAX_CSI_LOOKAHEAD`] bytes past the introducer. If no final byte is
///   buffered the whole (truncated) prefix is one unit.
/// - `ESC O` takes one more byte when available.
/// - A lone ESC, or ESC followed by anything else, is a one-byte unit.
/// - Every other byte is a one-byte unit; UTF-8 continuation is handled by
///   [`KeyReader`].
///
/// Returns 0 only for an empty buffer.
#[must_use]
pub fn next_unit(buf: &[u8]) -> usize {
    match buf {
        [] => 0,
        [ESC, b'[', rest @ ..] => {
            let window = rest.len().min(MAX_CSI_LOOKAHEAD);
            rest[..window]
                .iter()
                .position(|&b| b.is_ascii_alphabetic() || b == b'~')
                .map_or(2 + window, |i| 2 + i + 1)
        }
        [ESC, b'O', _, ..] => 3,
        [ESC, b'O'] => 2,
        _ => 1,
    }
}

/// Expected UTF-8 sequence length for a lead byte, or `None` if the byte
/// cannot start a multi-byte sequence.
const fn utf8_len(lead: u8) -> Option<usize> {
    match lead {
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

/// Result of reading one unit from a [`KeyReader`].
///
/// A skipped unit is neither an error nor a key: the bytes were consumed
/// and the caller should simply read again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A decoded key event.
    Key(KeyEvent),
    /// Unrecognized input was consumed; no key was produced.
    Skipped,
    /// The source reported end of stream.
    EndOfStream,
}

/// Buffered key reader over any byte source.
///
/// Pairs naturally with [`crate::input_reader::CancelReader`]: once the
/// reader is canceled, the next fill observes end of stream and
/// [`KeyReader::read_key`] returns [`ReadOutcome::EndOfStream`].
///
/// ```ignore
/// let mut keys = KeyReader::new(std::io::stdin());
/// loop {
///     match keys.read_key()? {
///         ReadOutcome::Key(key) => handle(key),
///         ReadOutcome::Skipped => continue,
///         ReadOutcome::EndOfStream => break,
///     }
/// }
/// ```
#[derive(Debug)]
pub struct KeyReader<R> {
    source: R,
    pending: Vec<u8>,
}

impl<R: Read> KeyReader<R> {
    /// Wrap a byte source.
    pub fn new(source: R) -> Self {
        Self {
            source,
            pending: Vec::with_capacity(FILL_CHUNK),
        }
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Recover the underlying source. Buffered, undecoded bytes are dropped.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Read and decode one logical unit.
    ///
    /// Blocks only when no bytes are buffered, or when a UTF-8 rune was split
    /// across reads. Source errors are returned unchanged.
    pub fn read_key(&mut self) -> io::Result<ReadOutcome> {
        if self.pending.is_empty() && !self.fill()? {
            return Ok(ReadOutcome::EndOfStream);
        }

        let len = next_unit(&self.pending);
        if let Some(key) = decode(&self.pending[..len]) {
            self.pending.drain(..len);
            return Ok(ReadOutcome::Key(key));
        }

        let lead = self.pending[0];
        if lead.is_ascii() {
            self.pending.drain(..len);
            return Ok(ReadOutcome::Skipped);
        }
        self.read_rune(lead)
    }

    /// Iterate over decoded keys, skipping unrecognized input and stopping at
    /// end of stream.
    pub fn keys(&mut self) -> Keys<'_, R> {
        Keys { reader: self }
    }

    /// Decode a UTF-8 rune whose lead byte is at the front of the buffer.
    fn read_rune(&mut self, lead: u8) -> io::Result<ReadOutcome> {
        let Some(expected) = utf8_len(lead) else {
            self.pending.drain(..1);
            return Ok(ReadOutcome::Skipped);
        };

        while self.pending.len() < expected {
            // Continuation bytes must follow the lead; stop waiting as soon
            // as a byte proves the sequence invalid.
            if self.pending[1..].iter().any(|&b| b & 0xC0 != 0x80) {
                break;
            }
            if !self.fill()? {
                break;
            }
        }

        let rune = self
            .pending
            .get(..expected)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .and_then(|s| s.chars().next());

        match rune {
            Some(c) if !c.is_control() => {
                self.pending.drain(..expected);
                Ok(ReadOutcome::Key(KeyEvent::new(KeyCode::Char(c))))
            }
            Some(_) => {
                self.pending.drain(..expected);
                Ok(ReadOutcome::Skipped)
            }
            None => {
                self.pending.drain(..1);
                Ok(ReadOutcome::Skipped)
            }
        }
    }

    /// Append one read from the source. Returns `false` at end of stream.
    fn fill(&mut self) -> io::Result<bool> {
        let mut chunk = [0u8; FILL_CHUNK];
        loop {
            match self.source.read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

/// Iterator returned by [`KeyReader::keys`].
#[derive(Debug)]
pub struct Keys<'a, R> {
    reader: &'a mut KeyReader<R>,
}

impl<R: Read> Iterator for Keys<'_, R> {
    type Item = io::Result<KeyEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_key() {
                Ok(ReadOutcome::Key(key)) => return Some(Ok(key)),
                Ok(ReadOutcome::Skipped) => continue,
                Ok(ReadOutcome::EndOfStream) => return None,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
