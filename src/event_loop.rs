//! Tokio-driven reactor.
//!
//! [`EventLoop`] implements [`Reactor`] by recording watches, and
//! [`EventLoop::run`] turns tokio readiness on the session's socket into
//! [`Session::dispatch`] calls:
//!
//! ```text
//! AsyncFd::ready ─► writable + write watch ─► dispatch(Writable)
//!                ─► readable ─► peek ─► Data   ─► dispatch(Readable)
//!                                    ─► Empty  ─► clear readiness
//!                                    ─► Closed ─► dispatch(Hangup)
//! ```
//!
//! Read readiness is always polled so a hangup is noticed even when no reply
//! is expected. Data is dispatched whether or not a read watch exists, so
//! unsolicited bytes are drained and reported instead of being taken for the
//! next reply. Handlers stop the loop through an [`ExitHandle`].

use std::cell::Cell;
use std::collections::HashMap;
use std::os::unix::io::{AsRawFd, RawFd};
use std::rc::Rc;

use tokio::io::unix::AsyncFd;
use tokio::io::{Interest, Ready};

use crate::error::{BootClientError, Result};
use crate::reactor::{Condition, Reactor, WatchId};
use crate::session::Session;
use crate::transport::{PeerState, Transport};

/// Cloneable handle for stopping an [`EventLoop`] from inside a handler.
#[derive(Debug, Clone, Default)]
pub struct ExitHandle(Rc<Cell<Option<i32>>>);

impl ExitHandle {
    /// Ask the loop to stop; [`EventLoop::run`] returns `code`.
    pub fn exit(&self, code: i32) {
        self.0.set(Some(code));
    }

    pub fn requested(&self) -> Option<i32> {
        self.0.get()
    }
}

/// Watch registry driven by tokio.
#[derive(Debug, Default)]
pub struct EventLoop {
    next_id: u64,
    watches: HashMap<WatchId, (RawFd, Condition)>,
    exit: ExitHandle,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_handle(&self) -> ExitHandle {
        self.exit.clone()
    }

    /// Whether any watch on `fd` is interested in `condition`.
    pub fn is_watching(&self, fd: RawFd, condition: Condition) -> bool {
        self.watches
            .values()
            .any(|&(watched, c)| watched == fd && c == condition)
    }

    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }

    /// Drive `session` until a handler calls [`ExitHandle::exit`] or the
    /// connection is lost.
    ///
    /// The session is detached when the loop stops, as if the reactor shut
    /// down. Requests still queued stay queued.
    ///
    /// Returns the exit code, or [`BootClientError::ConnectionClosed`] if the
    /// connection went away without anyone asking the loop to stop.
    pub async fn run<T: Transport>(session: &mut Session<EventLoop, T>) -> Result<i32> {
        let exit = session
            .reactor()
            .ok_or(BootClientError::NotAttached)?
            .exit_handle();
        let fd = session.raw_fd().ok_or(BootClientError::NotConnected)?;
        let async_fd =
            AsyncFd::with_interest(Descriptor(fd), Interest::READABLE | Interest::WRITABLE)?;

        let outcome = loop {
            if let Some(code) = exit.requested() {
                break Ok(code);
            }
            if session.raw_fd() != Some(fd) {
                break Err(BootClientError::ConnectionClosed);
            }

            let wants_write = session
                .reactor()
                .is_some_and(|r| r.is_watching(fd, Condition::Writable));
            let interest = if wants_write {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };

            let mut guard = async_fd.ready(interest).await?;
            let ready = guard.ready();

            if wants_write && ready.is_writable() {
                // Writable readiness is left set; a full socket blocks in
                // the transport instead.
                session.dispatch(Condition::Writable);
                continue;
            }

            if ready.is_readable() || ready.is_read_closed() {
                let state = match session.transport_mut() {
                    Some(transport) => transport.peer_state(),
                    None => continue,
                };
                match state {
                    Ok(PeerState::Data) => session.dispatch(Condition::Readable),
                    Ok(PeerState::Empty) => guard.clear_ready_matching(Ready::READABLE),
                    Ok(PeerState::Closed) => session.dispatch(Condition::Hangup),
                    Err(e) => {
                        tracing::warn!("Error polling boot status daemon socket: {}", e);
                        session.dispatch(Condition::Hangup);
                    }
                }
            } else if ready.is_write_closed() {
                session.dispatch(Condition::Hangup);
            }
        };

        drop(async_fd);
        session.detach();
        outcome
    }
}

impl Reactor for EventLoop {
    fn watch(&mut self, fd: RawFd, condition: Condition) -> WatchId {
        self.next_id += 1;
        let id = WatchId(self.next_id);
        self.watches.insert(id, (fd, condition));
        tracing::trace!("{} on fd {} for {:?}", id, fd, condition);
        id
    }

    fn stop_watching(&mut self, watch: WatchId) {
        if self.watches.remove(&watch).is_none() {
            tracing::trace!("Ignoring stop for unknown {}", watch);
        }
    }
}

/// Borrowed descriptor registered with tokio; the session owns the socket.
struct Descriptor(RawFd);

impl AsRawFd for Descriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}
