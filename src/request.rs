//! Request records.
//!
//! A [`Request`] is one call that has not been resolved yet. It is consumed
//! exactly once: by [`Request::complete`] when its reply arrives, or by
//! [`Request::fail`] when the connection cannot carry it.

use std::fmt;

use crate::error::BootClientError;
use crate::protocol::{Command, Reply};

/// Handler invoked when a request fails or is cancelled.
pub type FailureHandler = Box<dyn FnOnce(&BootClientError)>;

/// Handler invoked when the connection to the daemon is lost.
pub type DisconnectHandler = Box<dyn FnOnce()>;

/// Success handler, tagged by the reply shape it expects.
pub enum ReplyHandler {
    /// Bare acknowledgement, no payload.
    Ack(Box<dyn FnOnce()>),
    /// Answer carrying a payload, as raw bytes.
    Answer(Box<dyn FnOnce(&[u8])>),
}

impl ReplyHandler {
    pub fn ack(f: impl FnOnce() + 'static) -> Self {
        ReplyHandler::Ack(Box::new(f))
    }

    pub fn answer(f: impl FnOnce(&[u8]) + 'static) -> Self {
        ReplyHandler::Answer(Box::new(f))
    }
}

impl fmt::Debug for ReplyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyHandler::Ack(_) => f.write_str("ReplyHandler::Ack"),
            ReplyHandler::Answer(_) => f.write_str("ReplyHandler::Answer"),
        }
    }
}

/// One queued call.
pub struct Request {
    command: Command,
    argument: Option<String>,
    on_reply: ReplyHandler,
    on_failure: Option<FailureHandler>,
}

impl Request {
    pub fn new(
        command: Command,
        argument: Option<String>,
        on_reply: ReplyHandler,
        on_failure: Option<FailureHandler>,
    ) -> Self {
        Self {
            command,
            argument,
            on_reply,
            on_failure,
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Resolve with a decoded reply.
    ///
    /// An ack handler accepts an answer and drops the payload. An answer
    /// handler given an ack fails the request instead.
    pub fn complete(self, reply: Reply) {
        match (self.on_reply, reply) {
            (ReplyHandler::Ack(f), Reply::Ack) => f(),
            (ReplyHandler::Ack(f), Reply::Answer(payload)) => {
                tracing::debug!(
                    "Dropping {}-byte answer to {} request",
                    payload.len(),
                    self.command
                );
                f()
            }
            (ReplyHandler::Answer(f), Reply::Answer(payload)) => f(&payload),
            (ReplyHandler::Answer(_), Reply::Ack) => {
                if let Some(on_failure) = self.on_failure {
                    on_failure(&BootClientError::UnexpectedReply(format!(
                        "{} request expects an answer, got an ack",
                        self.command
                    )));
                }
            }
        }
    }

    /// Resolve with a failure. The failure handler, if any, runs once.
    pub fn fail(self, error: &BootClientError) {
        if let Some(on_failure) = self.on_failure {
            on_failure(error);
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("command", &self.command)
            .field("argument", &self.argument)
            .field("on_reply", &self.on_reply)
            .field("has_failure_handler", &self.on_failure.is_some())
            .finish()
    }
}
