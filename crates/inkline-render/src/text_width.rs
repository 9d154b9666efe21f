#![forbid(unsafe_code)]

//! Visual width of terminal text.
//!
//! All functions here are ANSI-aware: escape sequences embedded in a line are
//! treated as zero-width and survive truncation unchanged.
//!
//! # Width model
//!
//! Each character occupies 0, 1 or 2 columns:
//!
//! - 0 for control characters, combining marks and other zero-width code
//!   points (joiners, variation selectors, bidi marks);
//! - 2 for wide East-Asian characters and emoji/symbol ranges;
//! - 1 for everything else.
//!
//! # Performance
//!
//! Strings without ESC take a borrowed fast path found with `memchr`; pure
//! printable ASCII is measured by length.

use std::borrow::Cow;

use memchr::memchr;
use unicode_display_width::is_double_width;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use crate::ansi::ESC;

#[inline]
fn ascii_width(text: &str) -> Option<usize> {
    if text.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
        Some(text.len())
    } else {
        None
    }
}

#[inline]
fn is_zero_width_codepoint(c: char) -> bool {
    let u = c as u32;
    matches!(u, 0x0000..=0x001F | 0x007F..=0x009F)
        || matches!(u, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF)
        || matches!(u, 0xFE20..=0xFE2F)
        || matches!(u, 0xFE00..=0xFE0F | 0xE0100..=0xE01EF)
        || matches!(
            u,
            0x00AD | 0x034F | 0x180E | 0x200B | 0x200C | 0x200D | 0x200E | 0x200F | 0x2060 | 0xFEFF
        )
        || matches!(u, 0x202A..=0x202E | 0x2066..=0x2069 | 0x206A..=0x206F)
}

#[inline]
fn is_probable_emoji(c: char) -> bool {
    let u = c as u32;
    matches!(
        u,
        0x1F000..=0x1FAFF | 0x2300..=0x23FF | 0x2600..=0x27BF | 0x2B00..=0x2BFF
    ) && u != 0x2764
}

/// Columns occupied by a single character (0, 1 or 2).
#[inline]
#[must_use]
pub fn char_width(c: char) -> usize {
    if c.is_ascii() {
        return match c {
            ' '..='~' => 1,
            _ => 0,
        };
    }
    if is_zero_width_codepoint(c) {
        return 0;
    }
    if is_double_width(c) || is_probable_emoji(c) {
        return 2;
    }
    // Catches combining marks outside the explicit ranges above.
    c.width().map_or(0, |w| w.min(2))
}

/// A piece of terminal text: either an escape sequence or visible text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Escape(&'a str),
    Text(&'a str),
}

/// Splits text into alternating escape sequences and visible runs.
struct Segments<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Segments<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        if start >= bytes.len() {
            return None;
        }
        if bytes[start] == ESC {
            let end = skip_escape_sequence(bytes, start);
            self.pos = end;
            return Some(Segment::Escape(&self.text[start..end]));
        }
        let end = memchr(ESC, &bytes[start..]).map_or(bytes.len(), |i| start + i);
        self.pos = end;
        Some(Segment::Text(&self.text[start..end]))
    }
}

/// Skip one escape sequence starting at `start` (which holds ESC).
///
/// Recognized forms:
/// - CSI: `ESC [` params... final byte 0x40-0x7E
/// - OSC: `ESC ]` ... BEL or ST (`ESC \`)
/// - Two-byte escapes: `ESC` followed by 0x20-0x7E
///
/// Unterminated sequences run to the end of input. Every returned index is a
/// char boundary: terminators are ASCII.
fn skip_escape_sequence(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    if i >= bytes.len() {
        return i;
    }

    match bytes[i] {
        b'[' => {
            i += 1;
            while i < bytes.len() {
                if (0x40..=0x7E).contains(&bytes[i]) {
                    return i + 1;
                }
                i += 1;
            }
        }
        b']' => {
            i += 1;
            while i < bytes.len() {
                if bytes[i] == 0x07 {
                    return i + 1;
                }
                if bytes[i] == ESC && bytes.get(i + 1) == Some(&b'\\') {
                    return i + 2;
                }
                i += 1;
            }
        }
        0x20..=0x7E => return i + 1,
        // Unknown: only the ESC itself.
        _ => {}
    }

    i
}

/// Remove escape sequences, keeping visible text.
///
/// Returns the input borrowed when it contains no ESC byte.
#[must_use]
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if memchr(ESC, text.as_bytes()).is_none() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for segment in Segments::new(text) {
        if let Segment::Text(run) = segment {
            out.push_str(run);
        }
    }
    Cow::Owned(out)
}

/// Visible columns of a string, ignoring escape sequences.
#[must_use]
pub fn display_width(text: &str) -> usize {
    if let Some(width) = ascii_width(text) {
        return width;
    }
    Segments::new(text)
        .map(|segment| match segment {
            Segment::Text(run) => run.chars().map(char_width).sum(),
            Segment::Escape(_) => 0,
        })
        .sum()
}

/// Truncate text to at most `max_cols` visible columns.
///
/// Escape sequences are copied through unchanged wherever they appear, so a
/// trailing style reset survives truncation. Truncation happens on grapheme
/// boundaries: a wide character that does not fit is dropped whole, and
/// combining marks stay with their base.
#[must_use]
pub fn truncate(text: &str, max_cols: usize) -> Cow<'_, str> {
    if display_width(text) <= max_cols {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut used = 0usize;
    let mut full = false;
    for segment in Segments::new(text) {
        match segment {
            Segment::Escape(seq) => out.push_str(seq),
            Segment::Text(_) if full => {}
            Segment::Text(run) => {
                for grapheme in run.graphemes(true) {
                    let width: usize = grapheme.chars().map(char_width).sum();
                    if used + width > max_cols {
                        full = true;
                        break;
                    }
                    used += width;
                    out.push_str(grapheme);
                }
            }
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_widths() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width(' '), 1);
        assert_eq!(char_width('\x07'), 0);
        assert_eq!(char_width('\t'), 0);
        assert_eq!(char_width('日'), 2);
        assert_eq!(char_width('\u{0301}'), 0);
        assert_eq!(char_width('\u{200D}'), 0);
        assert_eq!(char_width('🎉'), 2);
        assert_eq!(char_width('é'), 1);
    }

    #[test]
    fn strip_fast_path_borrows() {
        assert!(matches!(strip_ansi("plain text"), Cow::Borrowed(_)));
        assert!(matches!(strip_ansi(""), Cow::Borrowed(_)));
    }

    #[test]
    fn strip_removes_csi() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(strip_ansi("a\x1b[2Kb\x1b[1;5Hc"), "abc");
    }

    #[test]
    fn strip_removes_osc() {
        assert_eq!(strip_ansi("\x1b]0;title\x07after"), "after");
        assert_eq!(strip_ansi("\x1b]8;;http://x\x1b\\link"), "link");
    }

    #[test]
    fn strip_handles_two_byte_and_trailing_esc() {
        assert_eq!(strip_ansi("a\x1b7b"), "ab");
        assert_eq!(strip_ansi("tail\x1b"), "tail");
        assert_eq!(strip_ansi("open\x1b[12"), "open");
    }

    #[test]
    fn display_width_ignores_escapes() {
        assert_eq!(display_width("hello"), 5);
        assert_eq!(display_width("\x1b[1mbold\x1b[0m"), 4);
        assert_eq!(display_width("日本"), 4);
        assert_eq!(display_width("e\u{0301}"), 1);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn truncate_fitting_text_borrows() {
        assert!(matches!(truncate("Hello", 5), Cow::Borrowed("Hello")));
        assert!(matches!(truncate("", 0), Cow::Borrowed("")));
    }

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate("Hello World", 5), "Hello");
        assert_eq!(truncate("Hello", 0), "");
    }

    #[test]
    fn truncate_never_splits_wide_char() {
        assert_eq!(truncate("日本語", 5), "日本");
        assert_eq!(truncate("a日", 2), "a");
    }

    #[test]
    fn truncate_keeps_escapes() {
        assert_eq!(truncate("\x1b[31mHello\x1b[0m", 3), "\x1b[31mHel\x1b[0m");
        assert_eq!(truncate("ab\x1b[1mcd\x1b[0mef", 3), "ab\x1b[1mc\x1b[0m");
    }

    #[test]
    fn truncate_keeps_combining_marks_with_base() {
        assert_eq!(truncate("e\u{0301}xy", 1), "e\u{0301}");
    }

    #[test]
    fn truncate_drops_text_after_first_overflow() {
        // "b" would fit after the wide char is rejected, but order must hold.
        assert_eq!(truncate("a日b", 2), "a");
    }
}
