//! Driver layer: handshake, session lifecycle and cell execution.
//!
//! [`Coordinator`] is the entry point. It lazily runs a [`Handshake`] to
//! obtain a [`Session`], sends lines one at a time, and applies the
//! recovery policy (restart on death, Ctrl-C on interrupt) per line.

mod coordinator;
mod handshake;
mod interrupt;
pub(crate) mod response;
mod session;

pub use coordinator::Coordinator;
pub use handshake::{Handshake, HandshakeReport, HandshakeState};
pub use interrupt::InterruptHandle;
pub use response::{ErrorKind, ExecutionRequest, ExecutionResult, Status};
pub use session::{Exchange, PromptMode, Session, SessionState};
