//! Connection session: the pipelined request/reply engine.
//!
//! A [`Session`] owns the connection to the daemon and two queues:
//! requests not yet written, and requests written but still waiting for
//! their reply. The daemon answers strictly in order and the wire carries no
//! request identifiers, so a reply always belongs to the head of the
//! awaiting-reply queue.
//!
//! The session never blocks the caller. Request methods only enqueue; the
//! socket is touched from [`Session::dispatch`], which the reactor owner
//! calls when the descriptor becomes writable, readable or hangs up.
//!
//! # Example
//!
//! ```ignore
//! use boot_client::{EventLoop, Session};
//!
//! let mut session = Session::<EventLoop>::new();
//! session.connect(|| eprintln!("daemon went away"))?;
//! session.attach(EventLoop::new())?;
//! session.update_status("mounting filesystems", || {}, None)?;
//! ```

use std::io::{Read, Write};
use std::os::unix::io::RawFd;

use crate::config::ClientConfig;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{BootClientError, Result};
use crate::protocol::{encode_request, read_reply, validate_argument, Command};
use crate::queue::RequestQueue;
use crate::reactor::{Condition, Reactor, WatchId};
use crate::request::{DisconnectHandler, FailureHandler, ReplyHandler, Request};
use crate::transport::{BootSocket, PeerState, Transport};

/// Client side of one connection to the boot status daemon.
///
/// While attached, a writable watch exists exactly when there are unsent
/// requests, and a readable watch exists exactly when requests are waiting
/// for replies.
pub struct Session<R: Reactor, T: Transport = BootSocket> {
    config: ClientConfig,
    transport: Option<T>,
    reactor: Option<R>,
    to_send: RequestQueue,
    awaiting_reply: RequestQueue,
    hangup_watch: Option<WatchId>,
    on_disconnect: Option<DisconnectHandler>,
    diagnostics: Box<dyn Diagnostics>,
}

impl<R: Reactor, T: Transport> Session<R, T> {
    /// Create an unconnected, unattached session with default configuration.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create an unconnected, unattached session.
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            reactor: None,
            to_send: RequestQueue::new(Condition::Writable),
            awaiting_reply: RequestQueue::new(Condition::Readable),
            hangup_watch: None,
            on_disconnect: None,
            diagnostics: Box::new(TracingDiagnostics),
        }
    }

    /// Replace the diagnostics sink.
    pub fn with_diagnostics(mut self, diagnostics: impl Diagnostics + 'static) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Take ownership of an already open transport.
    ///
    /// `on_disconnect` runs once if the connection is lost (hangup, or a
    /// decode failure when escalation is enabled). It does not run for
    /// [`Session::disconnect`] or when the session is dropped.
    pub fn connect_with(
        &mut self,
        transport: T,
        on_disconnect: impl FnOnce() + 'static,
    ) -> Result<()> {
        if self.transport.is_some() {
            return Err(BootClientError::AlreadyConnected);
        }

        let fd = transport.raw_fd();
        if let Some(reactor) = self.reactor.as_mut() {
            self.hangup_watch = Some(reactor.watch(fd, Condition::Hangup));
        }

        self.transport = Some(transport);
        self.on_disconnect = Some(Box::new(on_disconnect));
        tracing::debug!("Session connected (fd {})", fd);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_attached(&self) -> bool {
        self.reactor.is_some()
    }

    /// Descriptor of the current connection.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.transport.as_ref().map(Transport::raw_fd)
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    pub fn reactor(&self) -> Option<&R> {
        self.reactor.as_ref()
    }

    pub fn reactor_mut(&mut self) -> Option<&mut R> {
        self.reactor.as_mut()
    }

    /// Requests not yet written to the socket.
    pub fn pending_sends(&self) -> usize {
        self.to_send.len()
    }

    /// Requests written and waiting for their reply.
    pub fn pending_replies(&self) -> usize {
        self.awaiting_reply.len()
    }

    pub fn write_watch(&self) -> Option<WatchId> {
        self.to_send.watch()
    }

    pub fn read_watch(&self) -> Option<WatchId> {
        self.awaiting_reply.watch()
    }

    pub fn hangup_watch(&self) -> Option<WatchId> {
        self.hangup_watch
    }

    /// Register with a reactor.
    ///
    /// Watches hangups on the connection and re-registers read/write
    /// watches for anything still queued from an earlier attachment.
    pub fn attach(&mut self, mut reactor: R) -> Result<()> {
        if self.reactor.is_some() {
            return Err(BootClientError::AlreadyAttached);
        }
        let fd = self.raw_fd().ok_or(BootClientError::NotConnected)?;

        self.hangup_watch = Some(reactor.watch(fd, Condition::Hangup));
        self.to_send.rearm(&mut reactor, fd);
        self.awaiting_reply.rearm(&mut reactor, fd);
        self.reactor = Some(reactor);
        Ok(())
    }

    /// Forget the reactor, e.g. because it is shutting down.
    ///
    /// Queued requests are kept; they make progress again after the next
    /// [`Session::attach`].
    pub fn detach(&mut self) -> Option<R> {
        let reactor = self.reactor.take();
        self.to_send.forget_watch();
        self.awaiting_reply.forget_watch();
        self.hangup_watch = None;
        if reactor.is_some() && !(self.to_send.is_empty() && self.awaiting_reply.is_empty()) {
            tracing::debug!(
                "Detached from reactor with {} unsent and {} unanswered request(s)",
                self.to_send.len(),
                self.awaiting_reply.len()
            );
        }
        reactor
    }

    /// Check that the daemon is alive.
    pub fn ping(
        &mut self,
        on_ack: impl FnOnce() + 'static,
        on_failure: Option<FailureHandler>,
    ) -> Result<()> {
        self.queue_request(Command::Ping, None, ReplyHandler::ack(on_ack), on_failure)
    }

    /// Send a boot status update. `status` is at most 254 bytes.
    pub fn update_status(
        &mut self,
        status: &str,
        on_ack: impl FnOnce() + 'static,
        on_failure: Option<FailureHandler>,
    ) -> Result<()> {
        self.queue_request(
            Command::Update,
            Some(status),
            ReplyHandler::ack(on_ack),
            on_failure,
        )
    }

    /// Tell the daemon the system finished initializing.
    pub fn tell_system_initialized(
        &mut self,
        on_ack: impl FnOnce() + 'static,
        on_failure: Option<FailureHandler>,
    ) -> Result<()> {
        self.queue_request(
            Command::SystemInitialized,
            None,
            ReplyHandler::ack(on_ack),
            on_failure,
        )
    }

    /// Ask the daemon to prompt for a password.
    ///
    /// `on_answer` gets the typed bytes up to the first NUL, undecoded; the
    /// console's encoding is not necessarily UTF-8.
    pub fn ask_for_password(
        &mut self,
        on_answer: impl FnOnce(&[u8]) + 'static,
        on_failure: Option<FailureHandler>,
    ) -> Result<()> {
        self.queue_request(
            Command::Password,
            None,
            ReplyHandler::answer(on_answer),
            on_failure,
        )
    }

    /// Tell the daemon to quit.
    pub fn tell_daemon_to_quit(
        &mut self,
        on_ack: impl FnOnce() + 'static,
        on_failure: Option<FailureHandler>,
    ) -> Result<()> {
        self.queue_request(Command::Quit, None, ReplyHandler::ack(on_ack), on_failure)
    }

    fn queue_request(
        &mut self,
        command: Command,
        argument: Option<&str>,
        on_reply: ReplyHandler,
        on_failure: Option<FailureHandler>,
    ) -> Result<()> {
        let fd = self.raw_fd().ok_or(BootClientError::NotConnected)?;
        let reactor = self.reactor.as_mut().ok_or(BootClientError::NotAttached)?;
        if let Some(argument) = argument {
            validate_argument(argument)?;
        }

        let request = Request::new(command, argument.map(str::to_owned), on_reply, on_failure);
        self.to_send.push_back(request, reactor, fd);
        tracing::debug!(
            "Queued {} request ({} unsent, {} unanswered)",
            command,
            self.to_send.len(),
            self.awaiting_reply.len()
        );
        Ok(())
    }

    /// Handle a readiness event reported by the reactor.
    pub fn dispatch(&mut self, condition: Condition) {
        match condition {
            Condition::Writable => self.on_writable(),
            Condition::Readable => self.on_readable(),
            Condition::Hangup => self.on_hangup(),
        }
    }

    fn on_writable(&mut self) {
        let (Some(transport), Some(reactor)) = (self.transport.as_mut(), self.reactor.as_mut())
        else {
            return;
        };
        let Some(request) = self.to_send.pop_front() else {
            tracing::trace!("Ignoring writable event with nothing to send");
            return;
        };

        let fd = transport.raw_fd();
        match send_request(transport, &request) {
            Ok(()) => {
                tracing::debug!("Sent {} request", request.command());
                self.awaiting_reply.push_back(request, reactor, fd);
            }
            Err(e) => {
                tracing::warn!("Failed to send {} request: {}", request.command(), e);
                request.fail(&e);
            }
        }

        self.to_send.release_if_empty(reactor);
    }

    fn on_readable(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        let Some(request) = self.awaiting_reply.pop_front() else {
            // Nothing to correlate with: drop the byte and log.
            let byte = match transport.peer_state() {
                Ok(PeerState::Data) => {
                    let mut byte = [0u8; 1];
                    match transport.read(&mut byte) {
                        Ok(1) => Some(byte[0]),
                        _ => None,
                    }
                }
                _ => None,
            };
            self.diagnostics.unexpected_reply(byte);
            return;
        };

        let decode_failed = match read_reply(transport) {
            Ok(reply) => {
                tracing::trace!("Reply to {} request: {:?}", request.command(), reply);
                request.complete(reply);
                false
            }
            Err(e) => {
                tracing::warn!("Failed to read reply to {} request: {}", request.command(), e);
                request.fail(&e);
                true
            }
        };

        if let Some(reactor) = self.reactor.as_mut() {
            self.awaiting_reply.release_if_empty(reactor);
        }

        if decode_failed && self.config.escalate_decode_failures {
            tracing::error!("Reply stream out of sync, dropping connection to boot status daemon");
            self.drop_connection(&BootClientError::ConnectionClosed, true);
        }
    }

    fn on_hangup(&mut self) {
        if self.transport.is_none() {
            return;
        }
        tracing::debug!("Boot status daemon hung up");
        self.drop_connection(&BootClientError::ConnectionClosed, true);
    }

    /// Close the connection. Queued requests fail with
    /// [`BootClientError::Disconnected`]; the disconnect handler is not run.
    pub fn disconnect(&mut self) {
        self.drop_connection(&BootClientError::Disconnected, false);
    }

    /// Fail everything queued, unsent first, then release every watch and
    /// the transport.
    fn drop_connection(&mut self, error: &BootClientError, notify: bool) {
        self.to_send.cancel_all(self.reactor.as_mut(), error);
        self.awaiting_reply.cancel_all(self.reactor.as_mut(), error);

        if let (Some(watch), Some(reactor)) = (self.hangup_watch.take(), self.reactor.as_mut()) {
            reactor.stop_watching(watch);
        }
        self.transport = None;

        let on_disconnect = self.on_disconnect.take();
        if notify {
            if let Some(on_disconnect) = on_disconnect {
                on_disconnect();
            }
        }
    }
}

impl<R: Reactor> Session<R, BootSocket> {
    /// Open the daemon socket named by the configuration.
    pub fn connect(&mut self, on_disconnect: impl FnOnce() + 'static) -> Result<()> {
        if self.transport.is_some() {
            return Err(BootClientError::AlreadyConnected);
        }
        let socket = BootSocket::connect(&self.config.socket_path)?;
        self.connect_with(socket, on_disconnect)
    }
}

impl<R: Reactor, T: Transport> Default for Session<R, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Reactor, T: Transport> Drop for Session<R, T> {
    fn drop(&mut self) {
        self.drop_connection(&BootClientError::Cancelled, false);
    }
}

fn send_request<T: Transport>(transport: &mut T, request: &Request) -> Result<()> {
    let frame = encode_request(request.command(), request.argument())?;
    tracing::trace!("Writing {} byte request frame", frame.len());
    transport.write_all(&frame)?;
    transport.flush()?;
    Ok(())
}
