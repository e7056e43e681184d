//! # boot-client
//!
//! Rust client for the boot status daemon protocol.
//!
//! A process uses this crate to tell the boot splash daemon what is going on
//! (status updates, "system initialized", "quit"), to check it is alive, and
//! to ask it to prompt for a password, all without blocking its own loop.
//!
//! ## Architecture
//!
//! - **Session**: owns the socket and two FIFO queues (unsent, awaiting reply)
//! - **Reactor**: the session registers readiness watches and is driven by
//!   [`Session::dispatch`]; [`EventLoop`] is a tokio-based reactor
//! - **Protocol**: byte-exact request and reply frames; replies are matched
//!   to requests purely by order
//!
//! ## Example
//!
//! ```ignore
//! use boot_client::{EventLoop, Session};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::<EventLoop>::new();
//!     session.connect(|| eprintln!("daemon hung up"))?;
//!
//!     let event_loop = EventLoop::new();
//!     let exit = event_loop.exit_handle();
//!     session.attach(event_loop)?;
//!
//!     session.update_status("starting services", || {}, None)?;
//!     session.tell_daemon_to_quit(move || exit.exit(0), None)?;
//!
//!     EventLoop::run(&mut session).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod protocol;
pub mod reactor;
pub mod transport;

mod event_loop;
mod queue;
mod request;
mod session;

pub use config::ClientConfig;
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use error::{BootClientError, Result};
pub use event_loop::{EventLoop, ExitHandle};
pub use reactor::{Condition, Reactor, WatchId};
pub use request::{DisconnectHandler, FailureHandler};
pub use session::Session;
pub use transport::{BootSocket, PeerState, SocketPath, Transport};
