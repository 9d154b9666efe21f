#![forbid(unsafe_code)]

//! Inline renderer: repaints a bounded region below the cursor in place.
//!
//! Unlike alternate-screen rendering, inline mode leaves terminal scrollback
//! intact. Each frame moves the cursor back to the top of the previously
//! painted region and rewrites only the lines that changed.
//!
//! # Frame protocol
//!
//! 1. Move up `rendered_lines - 1` rows, then `\r`.
//! 2. For each line of the new view, write the line (truncated to the width
//!    limit) followed by `ESC [ K`, or nothing if it is unchanged. Lines are
//!    separated by `\r\n`.
//! 3. If the new frame is shorter, `ESC [ J` clears the leftover rows.
//! 4. A final `\r`.
//!
//! The whole frame is assembled in memory and emitted with one `write_all`,
//! so partial frames are never observable. The frame cache is committed only
//! after the write succeeds; a failed frame can be retried as-is.
//!
//! # Concurrency
//!
//! All methods take `&self`. State lives behind a mutex, so concurrent calls
//! are serialized.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug_span, trace};

use crate::ansi;
use crate::text_width;

/// Initial capacity of the frame buffer.
const BUFFER_CAPACITY: usize = 4 * 1024;

/// Initial dimensions for an [`InlineRenderer`].
///
/// Zero means "no limit" for either dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererConfig {
    /// Maximum visible columns per line.
    pub width: usize,
    /// Maximum number of lines; extra lines are dropped from the top.
    pub height: usize,
}

impl RendererConfig {
    /// Create a config without limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the width limit.
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Set the height limit.
    #[must_use]
    pub fn with_height(mut self, height: usize) -> Self {
        self.height = height;
        self
    }
}

struct State {
    writer: Box<dyn Write + Send>,
    width: usize,
    height: usize,
    /// Last successfully rendered view. `None` forces a full frame.
    last_view: Option<String>,
    /// Lines of the last frame after height trimming, before truncation.
    last_lines: Vec<String>,
    /// Rows occupied by the last frame; the cursor sits on the last of them.
    rendered_lines: usize,
    buffer: Vec<u8>,
}

impl State {
    fn invalidate(&mut self) {
        self.last_view = None;
        self.last_lines.clear();
    }
}

/// Renders views inline, diffing line by line against the previous frame.
pub struct InlineRenderer {
    state: Mutex<State>,
}

impl InlineRenderer {
    /// Create a renderer writing to `writer` with no size limits.
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::with_config(writer, RendererConfig::default())
    }

    /// Create a renderer with initial width and height limits.
    pub fn with_size<W>(writer: W, width: usize, height: usize) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::with_config(writer, RendererConfig { width, height })
    }

    /// Create a renderer from a config.
    pub fn with_config<W>(writer: W, config: RendererConfig) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            state: Mutex::new(State {
                writer: Box::new(writer),
                width: config.width,
                height: config.height,
                last_view: None,
                last_lines: Vec::new(),
                rendered_lines: 0,
                buffer: Vec::with_capacity(BUFFER_CAPACITY),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Paint `view`, replacing the previous frame.
    ///
    /// Rendering the same view twice writes nothing the second time. On
    /// error the previous frame stays cached, so the call can be retried.
    pub fn render(&self, view: &str) -> io::Result<()> {
        let mut state = self.state();
        let state = &mut *state;

        if state.rendered_lines > 0 && state.last_view.as_deref() == Some(view) {
            return Ok(());
        }

        let _span = debug_span!(
            "inkline.render.frame",
            prev_lines = state.rendered_lines,
            width = state.width,
            height = state.height
        )
        .entered();

        let mut lines: Vec<&str> = view
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        if state.height > 0 && lines.len() > state.height {
            lines.drain(..lines.len() - state.height);
        }

        let mut buf = std::mem::take(&mut state.buffer);
        buf.clear();

        if state.rendered_lines > 1 {
            ansi::cursor_up(&mut buf, state.rendered_lines - 1)?;
        }
        ansi::carriage_return(&mut buf)?;

        let mut skipped = 0usize;
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                ansi::line_separator(&mut buf)?;
            }
            if state.last_lines.get(i).is_some_and(|prev| prev == line) {
                skipped += 1;
                continue;
            }
            if state.width > 0 {
                buf.extend_from_slice(text_width::truncate(line, state.width).as_bytes());
            } else {
                buf.extend_from_slice(line.as_bytes());
            }
            ansi::erase_line_to_end(&mut buf)?;
        }

        if state.rendered_lines > lines.len() {
            ansi::erase_display_to_end(&mut buf)?;
        }
        ansi::carriage_return(&mut buf)?;

        let result = state
            .writer
            .write_all(&buf)
            .and_then(|()| state.writer.flush());
        let bytes = buf.len();
        state.buffer = buf;
        result?;

        trace!(
            lines = lines.len(),
            skipped,
            bytes,
            "inline frame written"
        );
        state.last_lines = lines.iter().map(|line| (*line).to_owned()).collect();
        state.rendered_lines = lines.len();
        state.last_view = Some(view.to_owned());
        Ok(())
    }

    /// Print `text` above the inline region.
    ///
    /// The current region is cleared, the text is written line by line, and
    /// the next [`render`](Self::render) paints a fresh region beneath it.
    pub fn println(&self, text: &str) -> io::Result<()> {
        let mut state = self.state();
        let state = &mut *state;
        let _span = debug_span!("inkline.render.println").entered();

        let mut buf = std::mem::take(&mut state.buffer);
        buf.clear();

        if state.rendered_lines > 1 {
            ansi::cursor_up(&mut buf, state.rendered_lines - 1)?;
        }
        ansi::carriage_return(&mut buf)?;
        ansi::erase_display_to_end(&mut buf)?;
        for line in text.split('\n') {
            buf.extend_from_slice(line.strip_suffix('\r').unwrap_or(line).as_bytes());
            ansi::line_separator(&mut buf)?;
        }

        let result = state
            .writer
            .write_all(&buf)
            .and_then(|()| state.writer.flush());
        state.buffer = buf;
        result?;

        // The cursor now sits on a blank row below the printed text.
        state.rendered_lines = 0;
        state.invalidate();
        Ok(())
    }

    /// Update the size limits. Zero disables a limit.
    ///
    /// The next frame rewrites every line. The rendered line count is kept:
    /// the cursor has not moved.
    pub fn resize(&self, width: usize, height: usize) {
        let mut state = self.state();
        state.width = width;
        state.height = height;
        state.invalidate();
    }

    /// Force the next frame to rewrite every line.
    ///
    /// Use after another process has written to the terminal.
    pub fn repaint(&self) {
        self.state().invalidate();
    }

    /// Redirect future frames to `writer`.
    ///
    /// Nothing is assumed about the cursor on the new target: the next frame
    /// starts at the cursor without moving up.
    pub fn set_output<W>(&self, writer: W)
    where
        W: Write + Send + 'static,
    {
        let mut state = self.state();
        state.writer = Box::new(writer);
        state.rendered_lines = 0;
        state.invalidate();
    }

    /// Rows occupied by the last successful frame.
    #[must_use]
    pub fn rendered_lines(&self) -> usize {
        self.state().rendered_lines
    }

    /// Current `(width, height)` limits.
    #[must_use]
    pub fn size(&self) -> (usize, usize) {
        let state = self.state();
        (state.width, state.height)
    }
}

impl fmt::Debug for InlineRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("InlineRenderer")
            .field("width", &state.width)
            .field("height", &state.height)
            .field("rendered_lines", &state.rendered_lines)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Shared in-memory output so tests can inspect what was written.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn take(&self) -> String {
            let bytes = std::mem::take(&mut *self.0.lock().unwrap());
            String::from_utf8(bytes).unwrap()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn renderer() -> (InlineRenderer, Capture) {
        let out = Capture::default();
        (InlineRenderer::new(out.clone()), out)
    }

    #[test]
    fn first_frame_layout() {
        let (r, out) = renderer();
        r.render("a\nb").unwrap();
        assert_eq!(out.take(), "\ra\x1b[K\r\nb\x1b[K\r");
        assert_eq!(r.rendered_lines(), 2);
    }

    #[test]
    fn second_frame_moves_up() {
        let (r, out) = renderer();
        r.render("a\nb\nc").unwrap();
        out.take();
        r.render("a\nb\nd").unwrap();
        assert_eq!(out.take(), "\x1b[2A\r\r\n\r\nd\x1b[K\r");
    }

    #[test]
    fn single_line_frame_does_not_move_up() {
        let (r, out) = renderer();
        r.render("one").unwrap();
        out.take();
        r.render("two").unwrap();
        assert_eq!(out.take(), "\rtwo\x1b[K\r");
    }

    #[test]
    fn empty_view_is_one_line() {
        let (r, out) = renderer();
        r.render("").unwrap();
        assert_eq!(out.take(), "\r\x1b[K\r");
        assert_eq!(r.rendered_lines(), 1);
    }

    #[test]
    fn crlf_line_endings() {
        let (r, out) = renderer();
        r.render("x\r\ny").unwrap();
        assert_eq!(out.take(), "\rx\x1b[K\r\ny\x1b[K\r");
    }

    #[test]
    fn height_keeps_trailing_lines() {
        let out = Capture::default();
        let r = InlineRenderer::with_size(out.clone(), 0, 2);
        r.render("1\n2\n3\n4").unwrap();
        let written = out.take();
        assert!(!written.contains('1'));
        assert!(!written.contains('2'));
        assert!(written.contains("3\x1b[K\r\n4"));
        assert_eq!(r.rendered_lines(), 2);
    }

    #[test]
    fn repaint_rewrites_unchanged_lines() {
        let (r, out) = renderer();
        r.render("same").unwrap();
        out.take();
        r.repaint();
        r.render("same").unwrap();
        assert_eq!(out.take(), "\rsame\x1b[K\r");
    }

    #[test]
    fn resize_keeps_rendered_lines() {
        let (r, out) = renderer();
        r.render("a\nb\nc").unwrap();
        out.take();
        r.resize(2, 0);
        assert_eq!(r.rendered_lines(), 3);
        assert_eq!(r.size(), (2, 0));
        r.render("a\nb\nc").unwrap();
        assert_eq!(out.take(), "\x1b[2A\ra\x1b[K\r\nb\x1b[K\r\nc\x1b[K\r");
    }

    #[test]
    fn set_output_resets_cursor_tracking() {
        let (r, first) = renderer();
        r.render("a\nb").unwrap();
        let second = Capture::default();
        r.set_output(second.clone());
        assert_eq!(r.rendered_lines(), 0);
        r.render("a\nb").unwrap();
        assert_eq!(second.take(), "\ra\x1b[K\r\nb\x1b[K\r");
        assert_eq!(first.take(), "\ra\x1b[K\r\nb\x1b[K\r");
    }

    #[test]
    fn println_clears_region_and_resets() {
        let (r, out) = renderer();
        r.render("status\nline").unwrap();
        out.take();
        r.println("log entry").unwrap();
        assert_eq!(out.take(), "\x1b[1A\r\x1b[Jlog entry\r\n");
        assert_eq!(r.rendered_lines(), 0);
        r.render("status\nline").unwrap();
        assert_eq!(out.take(), "\rstatus\x1b[K\r\nline\x1b[K\r");
    }

    #[test]
    fn width_truncates_but_diff_uses_full_line() {
        let out = Capture::default();
        let r = InlineRenderer::with_size(out.clone(), 3, 0);
        r.render("abcdef").unwrap();
        assert_eq!(out.take(), "\rabc\x1b[K\r");
        // Differs only past the width limit; still rewritten.
        r.render("abcxyz").unwrap();
        assert_eq!(out.take(), "\rabc\x1b[K\r");
    }

    #[test]
    fn renderer_config_builders() {
        let config = RendererConfig::new().with_width(80).with_height(24);
        assert_eq!(config, RendererConfig { width: 80, height: 24 });
    }
}
