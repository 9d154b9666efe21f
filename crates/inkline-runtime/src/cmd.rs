#![forbid(unsafe_code)]

//! Commands and the batch/sequence scheduler.
//!
//! A [`Cmd`] is a deferred effect: running it produces exactly one [`Msg`].
//! An absent command is `None`; the composition helpers accept and return
//! `Option<Cmd<M>>` so callers can pass optional effects straight through.
//!
//! # Composition
//!
//! | Helper | Execution | Result order |
//! |--------|-----------|--------------|
//! | [`Cmd::batch`] | one thread per command, all at once | input order |
//! | [`Cmd::sequence`] | one at a time on the calling thread | execution order |
//!
//! Both helpers drop absent commands first. With nothing left they return
//! `None`; with one command left they return it unchanged, so its message
//! is not wrapped.
//!
//! A panicking command is not caught: batch resumes the branch's panic on the
//! thread running the batch, exactly as if the command had run alone.

use std::fmt;
use std::panic;
use std::thread;
use std::time::{Duration, Instant};

use inkline_core::KeyEvent;
use tracing::{debug_span, trace};

use crate::message::Msg;

type Effect<M> = Box<dyn FnOnce() -> Msg<M> + Send + 'static>;

/// A deferred effect producing one message.
pub struct Cmd<M> {
    name: &'static str,
    effect: Effect<M>,
}

impl<M> fmt::Debug for Cmd<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cmd").field("name", &self.name).finish_non_exhaustive()
    }
}

enum Normalized<M> {
    Empty,
    Single(Cmd<M>),
    Many(Vec<Cmd<M>>),
}

fn normalize<M, I>(cmds: I) -> Normalized<M>
where
    I: IntoIterator<Item = Option<Cmd<M>>>,
{
    let mut cmds: Vec<Cmd<M>> = cmds.into_iter().flatten().collect();
    match cmds.len() {
        0 => Normalized::Empty,
        1 => match cmds.pop() {
            Some(cmd) => Normalized::Single(cmd),
            None => Normalized::Empty,
        },
        _ => Normalized::Many(cmds),
    }
}

impl<M: Send + 'static> Cmd<M> {
    /// Wrap an arbitrary effect.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Msg<M> + Send + 'static,
    {
        Self::named("Task", f)
    }

    fn named<F>(name: &'static str, f: F) -> Self
    where
        F: FnOnce() -> Msg<M> + Send + 'static,
    {
        Self {
            name,
            effect: Box::new(f),
        }
    }

    /// Deliver an application message.
    pub fn msg(m: M) -> Self {
        Self::named("Msg", move || Msg::App(m))
    }

    /// Request program exit.
    pub fn quit() -> Self {
        Self::named("Quit", || Msg::Quit)
    }

    /// Print text above the inline region.
    pub fn println(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::named("Println", move || Msg::Println(text))
    }

    /// Deliver a key event.
    pub fn key(event: KeyEvent) -> Self {
        Self::named("Key", move || Msg::Key(event))
    }

    /// Sleep for `duration`, then build a message from the firing instant.
    ///
    /// `Cmd::tick(d, Msg::Tick)` delivers a plain tick.
    pub fn tick<F>(duration: Duration, f: F) -> Self
    where
        F: FnOnce(Instant) -> Msg<M> + Send + 'static,
    {
        Self::named("Tick", move || {
            thread::sleep(duration);
            f(Instant::now())
        })
    }

    /// Run commands concurrently; the result lists their messages in input
    /// order.
    ///
    /// Returns `None` if every command is absent, and the command itself if
    /// exactly one is present.
    pub fn batch<I>(cmds: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<Self>>,
    {
        match normalize(cmds) {
            Normalized::Empty => None,
            Normalized::Single(cmd) => Some(cmd),
            Normalized::Many(cmds) => Some(Self::named("Batch", move || run_batch(cmds))),
        }
    }

    /// Run commands one after another in input order.
    ///
    /// Returns `None` if every command is absent, and the command itself if
    /// exactly one is present.
    pub fn sequence<I>(cmds: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<Self>>,
    {
        match normalize(cmds) {
            Normalized::Empty => None,
            Normalized::Single(cmd) => Some(cmd),
            Normalized::Many(cmds) => Some(Self::named("Sequence", move || run_sequence(cmds))),
        }
    }
}

impl<M> Cmd<M> {
    /// Return a stable name for tracing.
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// Execute the command on the calling thread.
    pub fn run(self) -> Msg<M> {
        (self.effect)()
    }
}

fn run_batch<M: Send + 'static>(cmds: Vec<Cmd<M>>) -> Msg<M> {
    let _span = debug_span!("inkline.cmd.batch", count = cmds.len()).entered();

    let handles: Vec<_> = cmds
        .into_iter()
        .map(|cmd| thread::spawn(move || cmd.run()))
        .collect();

    let msgs = handles
        .into_iter()
        .map(|handle| match handle.join() {
            Ok(msg) => msg,
            Err(payload) => panic::resume_unwind(payload),
        })
        .collect::<Vec<_>>();

    trace!(count = msgs.len(), "batch complete");
    Msg::Batch(msgs)
}

fn run_sequence<M>(cmds: Vec<Cmd<M>>) -> Msg<M> {
    let _span = debug_span!("inkline.cmd.sequence", count = cmds.len()).entered();

    let mut msgs = Vec::with_capacity(cmds.len());
    for cmd in cmds {
        trace!(cmd = cmd.type_name(), "sequence step");
        msgs.push(cmd.run());
    }
    Msg::Sequence(msgs)
}
