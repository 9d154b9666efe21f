#![forbid(unsafe_code)]

//! Logging support for the input path.
//!
//! With the `tracing` feature the reader's lifecycle events go through the
//! `tracing` macros. Without it, the same call sites compile against no-op
//! macros so the core crate stays dependency-light.
//!
//! Call sites use the crate-root paths (`crate::debug!`, `crate::trace!`, ...),
//! which resolve to whichever set is active. Event macros take format-string
//! arguments only; the no-op versions type-check them without evaluating.

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// No-op debug macro when tracing is disabled.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {
            if false {
                let _ = ::std::format_args!($($arg)*);
            }
        };
    }

    /// No-op debug_span macro when tracing is disabled.
    #[macro_export]
    macro_rules! debug_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    /// No-op trace macro when tracing is disabled.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {
            if false {
                let _ = ::std::format_args!($($arg)*);
            }
        };
    }

    /// No-op warn macro when tracing is disabled.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {
            if false {
                let _ = ::std::format_args!($($arg)*);
            }
        };
    }
}

/// Stand-in for a tracing span when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[derive(Debug)]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Enter the span. Does nothing.
    pub fn entered(self) -> NoopGuard {
        NoopGuard
    }
}

/// Guard returned by [`NoopSpan::entered`].
#[cfg(not(feature = "tracing"))]
#[derive(Debug)]
pub struct NoopGuard;

#[cfg(all(test, not(feature = "tracing")))]
mod tests {
    fn never_called() -> &'static str {
        panic!("no-op logging must not evaluate its arguments")
    }

    #[test]
    fn noop_macros_accept_captured_bindings() {
        let err = std::io::Error::other("boom");
        crate::warn!("failed: {err}");
        crate::debug!("state {}", never_called());
        crate::trace!("plain message");
        let _guard = crate::debug_span!("inkline.test").entered();
    }
}
