#![forbid(unsafe_code)]

//! Cancellable input reader.
//!
//! A terminal's input stream may not support interrupting a blocked read.
//! [`CancelReader`] never lets its public read path block on that stream.
//! Bytes travel through two background threads:
//!
//! ```text
//!  source ──read──▶ relay thread ──write──▶ pipe ──read──▶ delivery thread ──slot──▶ read_chunk()
//! ```
//!
//! - The **relay** thread reads chunks from the source and writes them into
//!   the write end of an internal OS pipe.
//! - The **delivery** thread reads the other end and hands each chunk to the
//!   caller through a single-slot handoff.
//!
//! # Cancellation
//!
//! [`CancelReader::cancel`] sets the cancellation flag, wakes any waiting
//! reader, and closes the pipe's write end so the delivery thread observes end
//! of stream. It then invokes the optional [`Interrupt`] hook to unblock the
//! relay's pending read on the real source. Without such a hook the relay may
//! stay blocked until the next input byte or process exit; that is harmless
//! because its only output, the pipe, is already closed.
//!
//! # Fallback
//!
//! If the pipe cannot be created the reader degrades to a single background
//! thread reading the source directly ([`ReaderMode::Direct`]). Cancellation
//! then depends on the [`Interrupt`] hook alone.
//!
//! # Ownership
//!
//! The caller must not read from the source while the reader is active. Before
//! handing the source to another consumer (e.g. a child process), call
//! [`CancelReader::cancel`] followed by [`CancelReader::wait_for_shutdown`].

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default size of one relayed chunk.
const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default time `wait_for_shutdown` waits for the source-reading thread.
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

// ── Interrupt hook ───────────────────────────────────────────────────────

/// Best-effort hook that makes a blocked read on the source return.
///
/// Invoked at most once, from [`CancelReader::cancel`]. Failures are logged
/// and otherwise ignored.
pub trait Interrupt: Send + Sync {
    /// Attempt to unblock a pending read on the source.
    fn interrupt(&self) -> io::Result<()>;
}

#[cfg(unix)]
impl Interrupt for std::os::unix::net::UnixStream {
    fn interrupt(&self) -> io::Result<()> {
        self.shutdown(std::net::Shutdown::Read)
    }
}

impl Interrupt for std::net::TcpStream {
    fn interrupt(&self) -> io::Result<()> {
        self.shutdown(std::net::Shutdown::Read)
    }
}

/// Adapter so closures can serve as interrupt hooks.
struct FnInterrupt<F>(F);

impl<F> Interrupt for FnInterrupt<F>
where
    F: Fn() -> io::Result<()> + Send + Sync,
{
    fn interrupt(&self) -> io::Result<()> {
        (self.0)()
    }
}

// ── Configuration ────────────────────────────────────────────────────────

/// Configuration for [`CancelReader`].
#[derive(Clone)]
pub struct ReaderConfig {
    /// Maximum bytes moved per read.
    pub chunk_size: usize,
    /// How long [`CancelReader::wait_for_shutdown`] waits for the thread
    /// reading the real source.
    pub shutdown_grace: Duration,
    /// Skip pipe creation and read the source directly.
    pub force_direct: bool,
    /// Hook used by [`CancelReader::cancel`] to unblock the source.
    pub interrupt: Option<Arc<dyn Interrupt>>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            force_direct: false,
            interrupt: None,
        }
    }
}

impl ReaderConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk size (clamped to at least one byte).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Read the source directly instead of relaying through a pipe.
    #[must_use]
    pub fn with_force_direct(mut self, enabled: bool) -> Self {
        self.force_direct = enabled;
        self
    }

    /// Install an interrupt hook.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: impl Interrupt + 'static) -> Self {
        self.interrupt = Some(Arc::new(interrupt));
        self
    }

    /// Install a closure as the interrupt hook.
    #[must_use]
    pub fn with_interrupt_fn<F>(self, f: F) -> Self
    where
        F: Fn() -> io::Result<()> + Send + Sync + 'static,
    {
        self.with_interrupt(FnInterrupt(f))
    }
}

impl fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("chunk_size", &self.chunk_size)
            .field("shutdown_grace", &self.shutdown_grace)
            .field("force_direct", &self.force_direct)
            .field(
                "interrupt",
                &self.interrupt.as_ref().map(|_| "<dyn Interrupt>"),
            )
            .finish()
    }
}

/// How the reader moves bytes from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderMode {
    /// Relay thread, internal pipe, delivery thread.
    Piped,
    /// One thread reading the source directly (pipe unavailable).
    Direct,
}

/// Outcome of [`CancelReader::wait_for_shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownStatus {
    /// The thread feeding `read_chunk` has exited.
    pub delivery_exited: bool,
    /// The thread reading the real source has exited within the grace
    /// period. In direct mode this is the same thread as delivery.
    pub relay_exited: bool,
}

impl ShutdownStatus {
    /// Both threads are gone.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.delivery_exited && self.relay_exited
    }
}

// ── Shared state ─────────────────────────────────────────────────────────

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-slot handoff between the delivery thread and `read_chunk`.
#[derive(Default)]
struct Handoff {
    slot: Option<io::Result<Vec<u8>>>,
    canceled: bool,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    canceled: AtomicBool,
    handoff: Mutex<Handoff>,
    changed: Condvar,
}

impl Shared {
    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// Place an item in the slot, waiting for the reader to take the previous
    /// one. Returns `false` if the reader was canceled instead.
    fn offer(&self, item: io::Result<Vec<u8>>) -> bool {
        let mut handoff = lock(&self.handoff);
        while handoff.slot.is_some() && !handoff.canceled {
            handoff = self
                .changed
                .wait(handoff)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if handoff.canceled {
            return false;
        }
        handoff.slot = Some(item);
        self.changed.notify_all();
        true
    }

    fn close(&self) {
        let mut handoff = lock(&self.handoff);
        handoff.closed = true;
        self.changed.notify_all();
    }

    /// Returns `true` on the first call only.
    fn cancel(&self) -> bool {
        if self.canceled.swap(true, Ordering::AcqRel) {
            return false;
        }
        let mut handoff = lock(&self.handoff);
        handoff.canceled = true;
        handoff.slot = None;
        self.changed.notify_all();
        true
    }

    fn take(&self) -> io::Result<Option<Vec<u8>>> {
        let mut handoff = lock(&self.handoff);
        loop {
            if handoff.canceled {
                return Ok(None);
            }
            if let Some(item) = handoff.slot.take() {
                self.changed.notify_all();
                return item.map(Some);
            }
            if handoff.closed {
                return Ok(None);
            }
            handoff = self
                .changed
                .wait(handoff)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Write end of the relay pipe. `None` once closed.
type PipeWriter = Arc<Mutex<Option<File>>>;

/// Error raised by the source, carried past the pipe's end of stream.
type ErrorSlot = Arc<Mutex<Option<io::Error>>>;

// ── Reader ───────────────────────────────────────────────────────────────

/// Cancellable reader over a blocking byte source.
///
/// Lifecycle: created (threads running) → canceled ([`cancel`](Self::cancel))
/// → shut down ([`wait_for_shutdown`](Self::wait_for_shutdown)). Dropping the
/// reader cancels it without waiting.
pub struct CancelReader {
    shared: Arc<Shared>,
    mode: ReaderMode,
    pipe_writer: Option<PipeWriter>,
    interrupt: Option<Arc<dyn Interrupt>>,
    shutdown_grace: Duration,
    delivery: Mutex<Option<JoinHandle<()>>>,
    relay: Mutex<Option<JoinHandle<()>>>,
    /// Disconnects when the thread reading the real source exits.
    source_done: Mutex<Option<mpsc::Receiver<()>>>,
    /// Remainder of a chunk partially consumed through `io::Read`.
    leftover: Mutex<Vec<u8>>,
}

impl CancelReader {
    /// Start reading `source` with the default configuration.
    pub fn new<R>(source: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        Self::with_config(source, ReaderConfig::default())
    }

    /// Start reading `source`. Background threads start immediately.
    pub fn with_config<R>(source: R, config: ReaderConfig) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let pipe = if config.force_direct {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "direct mode requested",
            ))
        } else {
            create_pipe()
        };

        match pipe {
            Ok((read_end, write_end)) => Self::spawn_piped(source, read_end, write_end, config),
            Err(err) => {
                crate::warn!("input relay pipe unavailable, reading source directly: {err}");
                Self::spawn_direct(source, config)
            }
        }
    }

    fn spawn_piped<R>(
        source: R,
        read_end: File,
        write_end: File,
        config: ReaderConfig,
    ) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let writer: PipeWriter = Arc::new(Mutex::new(Some(write_end)));
        let errors: ErrorSlot = Arc::new(Mutex::new(None));
        let (done_tx, done_rx) = mpsc::channel();
        let chunk_size = config.chunk_size.max(1);

        let relay = {
            let shared = Arc::clone(&shared);
            let writer = Arc::clone(&writer);
            let errors = Arc::clone(&errors);
            thread::Builder::new()
                .name("inkline-input-relay".into())
                .spawn(move || {
                    let _done = done_tx;
                    relay_loop(source, &writer, &errors, &shared, chunk_size);
                })?
        };

        let delivery = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("inkline-input-delivery".into())
                .spawn(move || {
                    deliver_loop(read_end, &shared, chunk_size, true);
                    if let Some(err) = lock(&errors).take() {
                        shared.offer(Err(err));
                    }
                    shared.close();
                    crate::trace!("input delivery thread exited");
                })
        };
        let delivery = match delivery {
            Ok(handle) => handle,
            Err(err) => {
                // Unblock the relay before bailing out.
                shared.cancel();
                lock(&writer).take();
                return Err(err);
            }
        };

        crate::debug!("input reader started in piped mode");
        Ok(Self {
            shared,
            mode: ReaderMode::Piped,
            pipe_writer: Some(writer),
            interrupt: config.interrupt,
            shutdown_grace: config.shutdown_grace,
            delivery: Mutex::new(Some(delivery)),
            relay: Mutex::new(Some(relay)),
            source_done: Mutex::new(Some(done_rx)),
            leftover: Mutex::new(Vec::new()),
        })
    }

    fn spawn_direct<R>(source: R, config: ReaderConfig) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let (done_tx, done_rx) = mpsc::channel();
        let chunk_size = config.chunk_size.max(1);

        let delivery = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("inkline-input-direct".into())
                .spawn(move || {
                    let _done = done_tx;
                    deliver_loop(source, &shared, chunk_size, false);
                    shared.close();
                    crate::trace!("direct input thread exited");
                })?
        };

        crate::debug!("input reader started in direct mode");
        Ok(Self {
            shared,
            mode: ReaderMode::Direct,
            pipe_writer: None,
            interrupt: config.interrupt,
            shutdown_grace: config.shutdown_grace,
            delivery: Mutex::new(Some(delivery)),
            relay: Mutex::new(None),
            source_done: Mutex::new(Some(done_rx)),
            leftover: Mutex::new(Vec::new()),
        })
    }

    /// How bytes are moved from the source.
    #[must_use]
    pub fn mode(&self) -> ReaderMode {
        self.mode
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.shared.is_canceled()
    }

    /// Read the next chunk.
    ///
    /// Blocks until a chunk is relayed, the source ends, or the reader is
    /// canceled. Returns `Ok(None)` at end of stream and on every call after
    /// cancellation. Source errors are returned unchanged, once.
    pub fn read_chunk(&self) -> io::Result<Option<Vec<u8>>> {
        if self.shared.is_canceled() {
            return Ok(None);
        }
        self.shared.take()
    }

    /// Cancel the reader. Idempotent and non-blocking.
    pub fn cancel(&self) {
        if !self.shared.cancel() {
            return;
        }
        crate::debug!("input reader canceled");

        if let Some(writer) = &self.pipe_writer {
            // Delivery drains the pipe after cancellation, so an in-flight
            // relay write cannot hold this lock for long.
            lock(writer).take();
        }

        if let Some(interrupt) = &self.interrupt
            && let Err(err) = interrupt.interrupt()
        {
            crate::warn!("input source interrupt failed: {err}");
        }
    }

    /// Wait for the background threads to exit.
    ///
    /// Call after [`cancel`](Self::cancel). In piped mode the delivery thread
    /// is joined unconditionally (it exits promptly once the pipe closes); the
    /// relay is waited for at most the configured grace period. In direct
    /// mode the single thread is waited for at most the grace period.
    ///
    /// May be called repeatedly. Each call waits at most one grace period
    /// for a thread still blocked on the source.
    pub fn wait_for_shutdown(&self) -> ShutdownStatus {
        let _span = crate::debug_span!("inkline.reader.shutdown").entered();

        // The receiver stays in place until the source thread is seen to
        // exit, so every call while it is blocked stays bounded.
        let source_exited = {
            let mut done = lock(&self.source_done);
            let exited = match done.as_ref() {
                Some(rx) => !matches!(
                    rx.recv_timeout(self.shutdown_grace),
                    Err(RecvTimeoutError::Timeout)
                ),
                None => true,
            };
            if exited {
                done.take();
            }
            exited
        };

        let delivery_exited = match self.mode {
            ReaderMode::Piped => {
                join_quietly(lock(&self.delivery).take());
                true
            }
            ReaderMode::Direct => {
                if source_exited {
                    join_quietly(lock(&self.delivery).take());
                }
                source_exited
            }
        };

        if source_exited {
            join_quietly(lock(&self.relay).take());
        } else {
            crate::debug!("input source thread still blocked after grace period");
        }

        ShutdownStatus {
            delivery_exited,
            relay_exited: source_exited,
        }
    }
}

impl Read for &CancelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.is_canceled() {
            return Ok(0);
        }
        let mut leftover = lock(&self.leftover);
        if leftover.is_empty() {
            match self.read_chunk()? {
                Some(chunk) => *leftover = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(leftover.len());
        buf[..n].copy_from_slice(&leftover[..n]);
        leftover.drain(..n);
        Ok(n)
    }
}

impl Read for CancelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}

impl Drop for CancelReader {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for CancelReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelReader")
            .field("mode", &self.mode)
            .field("canceled", &self.is_canceled())
            .finish_non_exhaustive()
    }
}

// ── Threads ──────────────────────────────────────────────────────────────

/// Source → pipe. Exits on source end/error, closed pipe, or cancellation.
fn relay_loop<R: Read>(
    mut source: R,
    writer: &Mutex<Option<File>>,
    errors: &Mutex<Option<io::Error>>,
    shared: &Shared,
    chunk_size: usize,
) {
    let mut buf = vec![0u8; chunk_size];
    while !shared.is_canceled() {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                if !shared.is_canceled() {
                    *lock(errors) = Some(err);
                }
                break;
            }
        };
        let mut guard = lock(writer);
        let Some(pipe) = guard.as_mut() else {
            break;
        };
        if pipe.write_all(&buf[..n]).is_err() {
            break;
        }
    }
    // Closing the write end lets delivery observe end of stream.
    lock(writer).take();
    crate::trace!("input relay thread exited");
}

/// Reader → handoff slot.
///
/// With `drain_after_cancel`, data arriving after cancellation is discarded
/// until end of stream (pipe mode, so the relay never blocks on a full pipe).
/// Otherwise the loop stops at the first read completing after cancellation
/// (direct mode, so no further bytes are taken from the real source).
fn deliver_loop<R: Read>(mut source: R, shared: &Shared, chunk_size: usize, drain_after_cancel: bool) {
    let mut buf = vec![0u8; chunk_size];
    loop {
        let item = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => Err(err),
        };
        let failed = item.is_err();
        let accepted = shared.offer(item);
        if failed || (!accepted && !drain_after_cancel) {
            break;
        }
    }
}

fn join_quietly(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle
        && handle.join().is_err()
    {
        crate::warn!("input thread panicked");
    }
}

// ── Pipe ─────────────────────────────────────────────────────────────────

/// Create the relay pipe as `(read_end, write_end)`, close-on-exec.
#[cfg(unix)]
fn create_pipe() -> io::Result<(File, File)> {
    use nix::fcntl::{FcntlArg, FdFlag, fcntl};

    let (read_end, write_end) = nix::unistd::pipe()?;
    for fd in [&read_end, &write_end] {
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((File::from(read_end), File::from(write_end)))
}

#[cfg(not(unix))]
fn create_pipe() -> io::Result<(File, File)> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "relay pipe requires a unix platform",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::event::{KeyCode, KeyEvent};
    use crate::key_decoder::{KeyReader, ReadOutcome};
    use std::collections::VecDeque;
    use std::os::unix::net::UnixStream;
    use std::time::Instant;

    fn socket_reader(config: ReaderConfig) -> (CancelReader, UnixStream) {
        let (source, feed) = UnixStream::pair().unwrap();
        let reader = CancelReader::with_config(source, config).unwrap();
        (reader, feed)
    }

    fn read_exactly(reader: &CancelReader, len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        while out.len() < len {
            let chunk = reader.read_chunk().unwrap().expect("unexpected end of stream");
            out.extend_from_slice(&chunk);
        }
        out
    }

    #[test]
    fn relays_bytes_in_piped_mode() {
        let (reader, mut feed) = socket_reader(ReaderConfig::default());
        assert_eq!(reader.mode(), ReaderMode::Piped);
        feed.write_all(b"hello").unwrap();
        assert_eq!(read_exactly(&reader, 5), b"hello");
        feed.write_all(b"world").unwrap();
        assert_eq!(read_exactly(&reader, 5), b"world");
    }

    #[test]
    fn cancel_unblocks_pending_read() {
        let (reader, _feed) = socket_reader(ReaderConfig::default());
        let reader = Arc::new(reader);
        let (tx, rx) = mpsc::channel();
        let pending = {
            let reader = Arc::clone(&reader);
            thread::spawn(move || {
                let _ = tx.send(reader.read_chunk().unwrap());
            })
        };
        thread::sleep(Duration::from_millis(50));
        reader.cancel();
        let result = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(result, None);
        pending.join().unwrap();
    }

    #[test]
    fn read_after_cancel_returns_immediately() {
        let (reader, mut feed) = socket_reader(ReaderConfig::default());
        feed.write_all(b"pending").unwrap();
        reader.cancel();
        for _ in 0..3 {
            let start = Instant::now();
            assert_eq!(reader.read_chunk().unwrap(), None);
            assert!(start.elapsed() < Duration::from_millis(100));
        }
        let mut buf = [0u8; 8];
        assert_eq!((&reader).read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn cancel_is_idempotent() {
        let (reader, _feed) = socket_reader(ReaderConfig::default());
        assert!(!reader.is_canceled());
        reader.cancel();
        reader.cancel();
        reader.cancel();
        assert!(reader.is_canceled());
        assert_eq!(reader.read_chunk().unwrap(), None);
    }

    #[test]
    fn shutdown_completes_with_interrupt() {
        let (source, _feed) = UnixStream::pair().unwrap();
        let hook = source.try_clone().unwrap();
        let config = ReaderConfig::default()
            .with_shutdown_grace(Duration::from_secs(2))
            .with_interrupt(hook);
        let reader = CancelReader::with_config(source, config).unwrap();
        reader.cancel();
        let status = reader.wait_for_shutdown();
        assert!(status.is_complete(), "{status:?}");
    }

    #[test]
    fn shutdown_is_bounded_when_relay_stays_blocked() {
        let grace = Duration::from_millis(50);
        let (reader, mut feed) = relay_parked_in_read(grace);
        reader.cancel();
        let start = Instant::now();
        let status = reader.wait_for_shutdown();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(status.delivery_exited);
        assert!(!status.relay_exited);
        // Let the relay observe the closed pipe and exit.
        let _ = feed.write_all(b"x");
    }

    /// Reader whose relay has delivered one byte and is blocked reading again.
    fn relay_parked_in_read(grace: Duration) -> (CancelReader, UnixStream) {
        let (reader, mut feed) = socket_reader(ReaderConfig::default().with_shutdown_grace(grace));
        feed.write_all(b"x").unwrap();
        assert_eq!(read_exactly(&reader, 1), b"x");
        // Give the relay time to re-enter its blocking read.
        thread::sleep(Duration::from_millis(50));
        (reader, feed)
    }

    #[test]
    fn repeated_shutdown_waits_stay_bounded() {
        let grace = Duration::from_millis(50);
        let (reader, mut feed) = relay_parked_in_read(grace);
        reader.cancel();

        for _ in 0..2 {
            let start = Instant::now();
            let status = reader.wait_for_shutdown();
            assert!(start.elapsed() < Duration::from_secs(1));
            assert!(status.delivery_exited);
            assert!(!status.relay_exited, "{status:?}");
        }

        // Once the relay wakes it sees the closed pipe and exits.
        feed.write_all(b"y").unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if reader.wait_for_shutdown().is_complete() {
                break;
            }
            assert!(Instant::now() < deadline, "relay never exited");
        }
        assert!(reader.wait_for_shutdown().is_complete());
    }

    #[test]
    fn source_end_of_stream_ends_reads() {
        let (reader, mut feed) = socket_reader(ReaderConfig::default());
        feed.write_all(b"bye").unwrap();
        drop(feed);
        assert_eq!(read_exactly(&reader, 3), b"bye");
        assert_eq!(reader.read_chunk().unwrap(), None);
        assert!(reader.wait_for_shutdown().is_complete());
    }

    /// Source replaying a fixed script of read results, then end of stream.
    struct Script(VecDeque<io::Result<Vec<u8>>>);

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(err)) => Err(err),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn source_errors_cross_the_pipe() {
        let script = Script(VecDeque::from([
            Ok(b"ab".to_vec()),
            Err(io::Error::other("boom")),
        ]));
        let reader = CancelReader::new(script).unwrap();
        assert_eq!(reader.read_chunk().unwrap(), Some(b"ab".to_vec()));
        let err = reader.read_chunk().unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(reader.read_chunk().unwrap(), None);
    }

    #[test]
    fn direct_mode_reads_and_cancels() {
        let (source, mut feed) = UnixStream::pair().unwrap();
        let hook = source.try_clone().unwrap();
        let config = ReaderConfig::default()
            .with_force_direct(true)
            .with_interrupt(hook)
            .with_shutdown_grace(Duration::from_secs(2));
        let reader = CancelReader::with_config(source, config).unwrap();
        assert_eq!(reader.mode(), ReaderMode::Direct);
        feed.write_all(b"xyz").unwrap();
        assert_eq!(read_exactly(&reader, 3), b"xyz");
        reader.cancel();
        assert_eq!(reader.read_chunk().unwrap(), None);
        assert!(reader.wait_for_shutdown().is_complete());
    }

    #[test]
    fn io_read_serves_partial_chunks() {
        let (mut reader, mut feed) = socket_reader(ReaderConfig::default());
        feed.write_all(b"abcdef").unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        while out.len() < 6 {
            let n = reader.read(&mut buf).unwrap();
            assert!(n > 0 && n <= 4);
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"abcdef");
    }

    #[test]
    fn interrupt_fn_runs_once() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let config = ReaderConfig::default().with_interrupt_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let (reader, _feed) = socket_reader(config);
        reader.cancel();
        reader.cancel();
        drop(reader);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn key_reader_over_cancel_reader() {
        let (reader, mut feed) = socket_reader(ReaderConfig::default());
        let reader = Arc::new(reader);
        let mut keys = KeyReader::new(&*reader);
        feed.write_all(b"\x1b[A").unwrap();
        assert_eq!(
            keys.read_key().unwrap(),
            ReadOutcome::Key(KeyEvent::new(KeyCode::Up))
        );
        reader.cancel();
        assert_eq!(keys.read_key().unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn config_debug_hides_hook() {
        let config = ReaderConfig::default().with_interrupt_fn(|| Ok(()));
        let text = format!("{config:?}");
        assert!(text.contains("<dyn Interrupt>"));
        assert_eq!(ReaderConfig::new().with_chunk_size(0).chunk_size, 1);
    }
}
