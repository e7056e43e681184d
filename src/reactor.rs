//! Reactor seam.
//!
//! The session never waits on the socket itself. It registers interest with
//! a [`Reactor`] and the owner of the reactor feeds readiness back through
//! [`Session::dispatch`](crate::Session::dispatch).
//!
//! Watches say what the session needs, not what it tolerates. A reactor
//! may report `Readable` while no read watch exists (bytes the daemon sent
//! unasked); the session drops one such byte per event and reports it to its
//! [`Diagnostics`](crate::Diagnostics) sink. Stale `Writable` events are
//! ignored.

use std::fmt;
use std::os::unix::io::RawFd;

/// Descriptor condition a watch is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// The descriptor can take data.
    Writable,
    /// The descriptor has data.
    Readable,
    /// The peer hung up or the descriptor errored.
    Hangup,
}

/// Handle to an active watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

/// A readiness-based event loop the session can register watches with.
pub trait Reactor {
    /// Start watching `fd` for `condition`.
    fn watch(&mut self, fd: RawFd, condition: Condition) -> WatchId;

    /// Stop a watch returned by [`Reactor::watch`]. Unknown ids are ignored.
    fn stop_watching(&mut self, watch: WatchId);
}

impl<R: Reactor + ?Sized> Reactor for Box<R> {
    fn watch(&mut self, fd: RawFd, condition: Condition) -> WatchId {
        (**self).watch(fd, condition)
    }

    fn stop_watching(&mut self, watch: WatchId) {
        (**self).stop_watching(watch)
    }
}
