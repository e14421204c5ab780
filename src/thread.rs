//! Stoppable threads.
//!
//! Each worker gets a `Poll`, a cheap handle on a shared shutdown flag. The
//! worker is expected to check the flag at its own boundaries; nothing is
//! interrupted mid-operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Shutdown signal as seen from inside a worker.
#[derive(Debug, Clone, Default)]
pub struct Poll {
    stop: Arc<AtomicBool>,
}

impl Poll {
    /// A signal that has not been raised.
    pub fn new() -> Poll {
        Poll::default()
    }

    /// Has shutdown been requested?
    pub fn is_shutdown(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Request shutdown. Every clone of this `Poll` observes it.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Sleep for `duration`. The flag is not checked while sleeping.
    pub fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Graceful shutdown support
pub trait Stoppable {
    /// Block until the underlying thread(s) exit.
    fn join(self);
    /// Signal shutdown, then join.
    fn shutdown(self);
}

/// A spawned thread together with its shutdown signal.
pub struct ThreadHandle {
    /// JoinHandle for the executing thread.
    pub handle: thread::JoinHandle<()>,
    poll: Poll,
}

impl ThreadHandle {
    /// The shutdown signal shared with the thread.
    pub fn poll(&self) -> Poll {
        self.poll.clone()
    }
}

impl Stoppable for ThreadHandle {
    fn join(self) {
        if self.handle.join().is_err() {
            error!("worker thread panicked");
        }
    }

    fn shutdown(self) {
        self.poll.shutdown();
        self.join();
    }
}

/// Spawn a thread running `f`, which is handed the thread's `Poll`.
pub fn spawn<F>(f: F) -> ThreadHandle
where
    F: Send + 'static + FnOnce(Poll) -> (),
{
    spawn_with(Poll::new(), f)
}

/// Spawn a thread that shares an existing shutdown signal.
pub fn spawn_with<F>(poll: Poll, f: F) -> ThreadHandle
where
    F: Send + 'static + FnOnce(Poll) -> (),
{
    let thread_poll = poll.clone();
    ThreadHandle {
        poll: poll,
        handle: thread::spawn(move || f(thread_poll)),
    }
}
