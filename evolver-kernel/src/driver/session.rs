//! A live Evolver session: one handle plus the prompt it is driven by.

use std::time::{Duration, Instant};

use log::{debug, warn};

use super::interrupt::InterruptHandle;
use crate::channel::PromptPattern;
use crate::error::{ChannelError, Result};
use crate::transport::SessionHandle;

/// Lifecycle tag, checked before every send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Alive,
    Dead,
}

/// Which prompt delimits command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// The `Enter command:` prompt was confirmed during startup.
    Main,
    /// Startup never showed the main prompt; the literal fallback is used.
    Fallback,
}

/// Output of one line sent to Evolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// The prompt came back normally.
    Completed { output: String, elapsed: Duration },

    /// The wait was interrupted. `resynced` tells whether the prompt came
    /// back within the resync timeout.
    Interrupted { output: String, resynced: bool },
}

impl Exchange {
    /// The captured text, however the exchange ended.
    pub fn into_output(self) -> String {
        match self {
            Exchange::Completed { output, .. } | Exchange::Interrupted { output, .. } => output,
        }
    }
}

/// One live child process and the prompt it is driven by.
pub struct Session<H: SessionHandle> {
    handle: H,
    prompt: PromptPattern,
    mode: PromptMode,
    state: SessionState,
}

impl<H: SessionHandle> Session<H> {
    pub(crate) fn new(handle: H, prompt: PromptPattern, mode: PromptMode) -> Self {
        Self {
            handle,
            prompt,
            mode,
            state: SessionState::Alive,
        }
    }

    /// The active prompt pattern.
    pub fn prompt(&self) -> &PromptPattern {
        &self.prompt
    }

    /// Whether the session runs on the main or the fallback prompt.
    pub fn mode(&self) -> PromptMode {
        self.mode
    }

    /// Current lifecycle tag, without probing the process.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get a reference to the underlying handle.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Get a mutable reference to the underlying handle.
    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    /// Check the child and update the lifecycle tag. A dead session never
    /// comes back to life.
    pub fn is_alive(&mut self) -> bool {
        if self.state == SessionState::Alive && !self.handle.is_alive() {
            debug!("session check: child is gone");
            self.state = SessionState::Dead;
        }
        self.state == SessionState::Alive
    }

    /// Send one line and wait, without a time limit, for the prompt.
    ///
    /// If `interrupt` fires first, Ctrl-C is sent and the prompt is awaited
    /// for at most `resync_timeout`; whatever text arrived is returned
    /// either way. End of stream marks the session dead.
    pub async fn exchange(
        &mut self,
        line: &str,
        interrupt: &InterruptHandle,
        resync_timeout: Duration,
    ) -> Result<Exchange> {
        if !self.is_alive() {
            return Err(ChannelError::Closed.into());
        }

        let start = Instant::now();
        self.handle.send_line(line).await?;

        let waited = tokio::select! {
            biased;
            read = self.handle.read_until(&self.prompt, None) => Some(read),
            () = interrupt.requested() => None,
        };

        let result = match waited {
            Some(read) => read.map(|output| Exchange::Completed {
                output,
                elapsed: start.elapsed(),
            }),
            None => self.resync(resync_timeout).await,
        };

        if let Err(e) = &result {
            if e.is_end_of_stream() {
                self.state = SessionState::Dead;
            }
        }
        result
    }

    async fn resync(&mut self, timeout: Duration) -> Result<Exchange> {
        self.handle.send_interrupt()?;
        match self.handle.read_until(&self.prompt, Some(timeout)).await {
            Ok(output) => Ok(Exchange::Interrupted {
                output,
                resynced: true,
            }),
            Err(e) if e.is_timeout() => {
                warn!("prompt did not return within {:?} of the interrupt", timeout);
                Ok(Exchange::Interrupted {
                    output: self.handle.take_pending(),
                    resynced: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Kill the child and release its resources.
    pub fn terminate(&mut self) {
        self.state = SessionState::Dead;
        if let Err(e) = self.handle.terminate() {
            warn!("failed to terminate session: {}", e);
        }
    }
}

impl<H: SessionHandle> std::fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("prompt", &self.prompt.as_str())
            .field("mode", &self.mode)
            .field("state", &self.state)
            .finish()
    }
}
