#![forbid(unsafe_code)]

//! inkline public facade crate.
//!
//! Re-exports the terminal I/O substrate (key decoding, cancellable input,
//! command scheduling, inline rendering) and offers a small prelude.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use inkline_core::event::{KeyCode, KeyEvent, Modifiers};
pub use inkline_core::input_reader::{
    CancelReader, Interrupt, ReaderConfig, ReaderMode, ShutdownStatus,
};
pub use inkline_core::key_decoder::{KeyReader, ReadOutcome, decode, next_unit};

// --- Render re-exports -----------------------------------------------------

pub use inkline_render::inline::{InlineRenderer, RendererConfig};

// --- Runtime re-exports ----------------------------------------------------

pub use inkline_runtime::{Cmd, Msg};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for inkline apps.
#[derive(Debug)]
pub enum Error {
    /// I/O failure during terminal operations.
    Io(std::io::Error),
    /// Terminal or runtime error with message.
    Terminal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Terminal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Terminal(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Standard result type for inkline APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Shutdown -------------------------------------------------------------

/// Cancel `reader` and wait for its threads to exit.
///
/// Returns [`Error::Terminal`] when the thread reading the source is still
/// blocked after the grace period; the source must not be reused by another
/// reader in that case. Calling again retries the bounded wait.
pub fn release_input(reader: &CancelReader) -> Result<ShutdownStatus> {
    reader.cancel();
    let status = reader.wait_for_shutdown();
    if status.is_complete() {
        Ok(status)
    } else {
        Err(Error::Terminal(
            "input source still held by reader thread".into(),
        ))
    }
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        CancelReader, Cmd, Error, InlineRenderer, KeyCode, KeyEvent, KeyReader, Modifiers, Msg,
        ReadOutcome, Result, release_input,
    };

    pub use crate::{core, render, runtime};
}

pub use inkline_core as core;
pub use inkline_render as render;
pub use inkline_runtime as runtime;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_error_converts() {
        let err: Error = std::io::Error::other("disk gone").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "disk gone");
        assert!(err.source().is_some());
    }

    #[test]
    fn terminal_error_displays_message() {
        let err = Error::Terminal("not a tty".into());
        assert_eq!(err.to_string(), "not a tty");
        assert!(err.source().is_none());
    }

    #[cfg(unix)]
    mod release {
        use super::super::*;
        use std::io::Write;
        use std::os::unix::net::UnixStream;
        use std::thread;
        use std::time::Duration;

        #[test]
        fn release_input_completes_with_interrupt() {
            let (source, _feed) = UnixStream::pair().unwrap();
            let hook = source.try_clone().unwrap();
            let reader = CancelReader::with_config(
                source,
                ReaderConfig::default()
                    .with_interrupt(hook)
                    .with_shutdown_grace(Duration::from_secs(2)),
            )
            .unwrap();
            let status = release_input(&reader).unwrap();
            assert!(status.is_complete());
            assert!(reader.is_canceled());
        }

        #[test]
        fn release_input_reports_held_source() {
            let (source, mut feed) = UnixStream::pair().unwrap();
            let reader = CancelReader::with_config(
                source,
                ReaderConfig::default().with_shutdown_grace(Duration::from_millis(50)),
            )
            .unwrap();
            if reader.mode() == ReaderMode::Direct {
                return;
            }
            feed.write_all(b"x").unwrap();
            assert_eq!(reader.read_chunk().unwrap().as_deref(), Some(&b"x"[..]));
            // Let the relay block in its next read.
            thread::sleep(Duration::from_millis(50));

            let err = release_input(&reader).unwrap_err();
            assert!(matches!(err, Error::Terminal(_)));
            assert_eq!(err.to_string(), "input source still held by reader thread");

            // Unblocking the source lets a retry finish.
            feed.write_all(b"y").unwrap();
            let mut released = false;
            for _ in 0..40 {
                if release_input(&reader).is_ok() {
                    released = true;
                    break;
                }
            }
            assert!(released);
        }
    }
}
