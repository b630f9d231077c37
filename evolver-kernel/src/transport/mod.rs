//! Process transport layer.
//!
//! This module owns the child process and its pseudo-terminal: spawning,
//! line writes, prompt-delimited reads, interrupts and teardown. The
//! [`SessionHandle`] and [`Launcher`] traits are the seam the driver layer
//! is written against, so it can be exercised with scripted children.

pub mod config;
mod process;

pub use config::LaunchConfig;
pub use process::{PtyLauncher, PtyProcess};

use std::future::Future;
use std::time::Duration;

use crate::channel::PromptMatcher;
use crate::error::Result;

/// One spawned child process bound to a terminal.
pub trait SessionHandle: Send {
    /// Write `line` followed by a line terminator.
    ///
    /// A terminated handle fails with `ChannelError::Closed`. Write failures
    /// on a live handle may be deferred until the next read.
    fn send_line(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Wait until `pattern` matches the incoming stream.
    ///
    /// Returns the text before the match and consumes the match itself.
    /// `None` waits forever. Fails with `ChannelError::PatternTimeout` when
    /// the timeout elapses and `ChannelError::Closed` when the child goes
    /// away first; in both cases the unmatched text stays available through
    /// [`take_pending`](Self::take_pending).
    fn read_until(
        &mut self,
        pattern: &dyn PromptMatcher,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Drain whatever text is buffered but not yet matched.
    fn take_pending(&mut self) -> String;

    /// Non-blocking liveness check.
    fn is_alive(&mut self) -> bool;

    /// Deliver an interrupt (Ctrl-C) to the child without closing the handle.
    fn send_interrupt(&mut self) -> Result<()>;

    /// Kill the child and release the terminal. Idempotent.
    fn terminate(&mut self) -> Result<()>;
}

/// Factory for session handles.
pub trait Launcher: Send + Sync {
    /// The handle type this launcher produces.
    type Handle: SessionHandle;

    /// Spawn a new child according to `config`.
    fn launch(&self, config: &LaunchConfig) -> Result<Self::Handle>;
}
