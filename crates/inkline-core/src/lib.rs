#![forbid(unsafe_code)]

//! Core: key events, byte-sequence decoding, and cancellable terminal input.

pub mod event;
pub mod input_reader;
pub mod key_decoder;
pub mod logging;

pub use event::{KeyCode, KeyEvent, Modifiers};
pub use input_reader::{CancelReader, Interrupt, ReaderConfig, ReaderMode, ShutdownStatus};
pub use key_decoder::{KeyReader, ReadOutcome, decode, next_unit};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, trace, warn};
