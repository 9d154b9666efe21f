#![forbid(unsafe_code)]

//! ANSI control sequences used by inline rendering.
//!
//! Pure byte-generation functions: no state tracking, no allocation for
//! fixed sequences.
//!
//! # Sequence Reference
//!
//! | Category | Sequence | Description |
//! |----------|----------|-------------|
//! | CSI | `ESC [ n A` | CUU (Cursor Up) |
//! | CSI | `ESC [ K` | EL (Erase to end of line) |
//! | CSI | `ESC [ J` | ED (Erase to end of screen) |
//! | C0 | `\r` | Carriage return |
//! | C0 | `\r\n` | Line separator (raw mode safe) |

use std::io::{self, Write};

/// Escape byte.
pub const ESC: u8 = 0x1b;

/// Carriage return: `\r`
pub const CR: &[u8] = b"\r";

/// Line separator between rendered lines: `\r\n`
///
/// Raw mode disables output post-processing, so a bare `\n` would keep the
/// column. The explicit CR returns to column 0.
pub const LINE_SEPARATOR: &[u8] = b"\r\n";

/// Erase from cursor to end of line: `CSI K`
pub const ERASE_LINE_TO_END: &[u8] = b"\x1b[K";

/// Erase from cursor to end of screen: `CSI J`
pub const ERASE_DISPLAY_TO_END: &[u8] = b"\x1b[J";

/// Move cursor up: `CSI n A`
///
/// The count is always written explicitly. `n == 0` writes nothing.
pub fn cursor_up<W: Write>(w: &mut W, n: usize) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}A")
}

/// Move cursor to start of line: `\r` (CR)
#[inline]
pub fn carriage_return<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(CR)
}

/// Separate two rendered lines: `\r\n`
#[inline]
pub fn line_separator<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(LINE_SEPARATOR)
}

/// EL (Erase Line) to end: `CSI K`
#[inline]
pub fn erase_line_to_end<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(ERASE_LINE_TO_END)
}

/// ED (Erase Display) to end: `CSI J`
#[inline]
pub fn erase_display_to_end<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(ERASE_DISPLAY_TO_END)
}
