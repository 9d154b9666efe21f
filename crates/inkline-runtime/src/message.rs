#![forbid(unsafe_code)]

//! Messages produced by commands.
//!
//! `Msg<M>` carries the runtime's own messages alongside the application's
//! message type `M`. Composite results from [`Cmd::batch`](crate::Cmd::batch)
//! and [`Cmd::sequence`](crate::Cmd::sequence) nest as [`Msg::Batch`] and
//! [`Msg::Sequence`]; [`Msg::leaves`] walks them in order.

use std::time::Instant;

use inkline_core::KeyEvent;

/// A message delivered to the application after a command runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg<M> {
    /// A decoded keypress.
    Key(KeyEvent),
    /// Results of a batch, in input order.
    Batch(Vec<Msg<M>>),
    /// Results of a sequence, in execution order.
    Sequence(Vec<Msg<M>>),
    /// A timer fired at the given instant.
    Tick(Instant),
    /// Print a line above the inline region.
    Println(String),
    /// Stop the program.
    Quit,
    /// Application-defined message.
    App(M),
}

impl<M> Msg<M> {
    /// Return a stable name for tracing.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Key(_) => "Key",
            Self::Batch(_) => "Batch",
            Self::Sequence(_) => "Sequence",
            Self::Tick(_) => "Tick",
            Self::Println(_) => "Println",
            Self::Quit => "Quit",
            Self::App(_) => "App",
        }
    }

    /// Iterate leaf messages depth-first, preserving order.
    pub fn leaves(&self) -> Leaves<'_, M> {
        Leaves { stack: vec![self] }
    }

    /// Whether a quit request appears anywhere in this message.
    #[must_use]
    pub fn contains_quit(&self) -> bool {
        self.leaves().any(|msg| matches!(msg, Self::Quit))
    }

    /// The application payload, if this is [`Msg::App`].
    #[must_use]
    pub fn app(&self) -> Option<&M> {
        match self {
            Self::App(m) => Some(m),
            _ => None,
        }
    }
}

impl<M> From<KeyEvent> for Msg<M> {
    fn from(event: KeyEvent) -> Self {
        Self::Key(event)
    }
}

/// Iterator returned by [`Msg::leaves`].
#[derive(Debug)]
pub struct Leaves<'a, M> {
    stack: Vec<&'a Msg<M>>,
}

impl<'a, M> Iterator for Leaves<'a, M> {
    type Item = &'a Msg<M>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(msg) = self.stack.pop() {
            match msg {
                Msg::Batch(msgs) | Msg::Sequence(msgs) => self.stack.extend(msgs.iter().rev()),
                leaf => return Some(leaf),
            }
        }
        None
    }
}
