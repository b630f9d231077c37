//! Execution coordinator: runs blocks of Evolver input against a lazily
//! started session and keeps going when individual lines fail.

use std::sync::Arc;

use log::{debug, info, warn};

use super::handshake::{Handshake, HandshakeReport};
use super::interrupt::InterruptHandle;
use super::response::{ErrorKind, ExecutionRequest, ExecutionResult};
use super::session::{Exchange, Session};
use crate::config::KernelConfig;
use crate::error::{DriverError, Result};
use crate::output::{NOTICE_TAG, OutputSink};
use crate::transport::{Launcher, PtyLauncher};

/// Owns the (at most one) Evolver session and executes requests on it.
///
/// Requests are processed one at a time; `execute` takes `&mut self`.
/// Interrupts come in through an [`InterruptHandle`] obtained from
/// [`interrupt_handle`](Self::interrupt_handle).
pub struct Coordinator<L: Launcher = PtyLauncher> {
    launcher: L,
    config: KernelConfig,
    sink: Arc<dyn OutputSink>,
    session: Option<Session<L::Handle>>,
    interrupt: InterruptHandle,
    last_handshake: Option<HandshakeReport>,
}

impl Coordinator<PtyLauncher> {
    /// Coordinator that launches real processes on a pseudo-terminal.
    pub fn from_config(config: KernelConfig, sink: Arc<dyn OutputSink>) -> Self {
        Self::new(PtyLauncher, config, sink)
    }
}

impl<L: Launcher> Coordinator<L> {
    /// Create a coordinator. Nothing is spawned until the first non-blank
    /// request.
    pub fn new(launcher: L, config: KernelConfig, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            launcher,
            config,
            sink,
            session: None,
            interrupt: InterruptHandle::new(),
            last_handshake: None,
        }
    }

    /// Handle for interrupting the command currently being waited on.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// The configuration in use.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// The current session, if one has been started.
    pub fn session(&self) -> Option<&Session<L::Handle>> {
        self.session.as_ref()
    }

    /// Report from the most recent successful handshake.
    pub fn last_handshake(&self) -> Option<&HandshakeReport> {
        self.last_handshake.as_ref()
    }

    /// Whether a live session exists right now.
    pub fn is_alive(&mut self) -> bool {
        self.session.as_mut().is_some_and(|s| s.is_alive())
    }

    /// Execute a block of Evolver input.
    ///
    /// Only a failure to get any session running is reported as an error
    /// result. Problems with individual lines are written into the returned
    /// text and the remaining lines still run.
    pub async fn execute(&mut self, request: &ExecutionRequest) -> ExecutionResult {
        if request.is_blank() {
            return ExecutionResult::ok("");
        }

        // Interrupts requested while idle do not carry over
        self.interrupt.clear();

        if let Err(e) = self.ensure_live().await {
            debug!("launch failed: {}", e);
        }
        if !self.is_alive() {
            let message = format!("{} ERROR: could not launch Surface Evolver.\n", NOTICE_TAG);
            if !request.silent {
                self.sink.write_diagnostic(&message);
            }
            return ExecutionResult::error(ErrorKind::LaunchFailure, message);
        }

        let mut text = String::new();
        for line in request.lines() {
            text.push_str(&self.run_line(line).await);
        }

        if !request.silent && !text.is_empty() {
            self.sink.write_output(&text);
        }
        ExecutionResult::ok(text)
    }

    /// Terminate the session, if any. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            info!("shutting down Evolver session");
            session.terminate();
        }
    }

    /// Make sure a live session exists, running the handshake if needed.
    async fn ensure_live(&mut self) -> Result<()> {
        if self.is_alive() {
            return Ok(());
        }
        self.discard_session();

        let handshake = Handshake::new(&self.config, self.sink.as_ref());
        let outcome = handshake.run(&self.launcher).await;
        // Stops pressed while Evolver was starting have nothing to stop
        self.interrupt.clear();
        match outcome {
            Ok((session, report)) => {
                debug!("handshake complete: {:?}", report);
                self.session = Some(session);
                self.last_handshake = Some(report);
                Ok(())
            }
            Err(e) => {
                warn!("could not start Evolver: {}", e);
                self.sink.notice(&format!("ERROR launching Evolver: {}", e));
                Err(e)
            }
        }
    }

    fn discard_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.terminate();
        }
    }

    /// Send one line and return the text it produced, recovering from
    /// process death and interrupts.
    async fn run_line(&mut self, line: &str) -> String {
        let outcome = match self.session.as_mut() {
            Some(session) => {
                session
                    .exchange(line, &self.interrupt, self.config.resync_timeout)
                    .await
            }
            None => Err(DriverError::NotConnected.into()),
        };

        match outcome {
            Ok(Exchange::Completed { output, elapsed }) => {
                debug!("{:?} completed in {:?}", line, elapsed);
                output
            }
            Ok(Exchange::Interrupted { output, resynced }) => {
                info!("{:?} interrupted (resynced: {})", line, resynced);
                // Repeated stops during the resync must not carry over to
                // the next line
                self.interrupt.clear();
                self.sink.notice("Interrupt sent to Evolver.");
                output
            }
            Err(e) if e.is_end_of_stream() => {
                warn!("Evolver died while running {:?}", line);
                self.sink.notice("Evolver died (EOF); restarting.");
                self.discard_session();
                if let Err(e) = self.ensure_live().await {
                    debug!("restart failed: {}", e);
                }
                String::new()
            }
            Err(e) => format!("{} Exception running '{}': {}\n", NOTICE_TAG, line, e),
        }
    }
}

impl<L: Launcher> Drop for Coordinator<L> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
