//! Startup handshake.
//!
//! A fresh Evolver first asks for a datafile, then settles at its command
//! prompt. Neither prompt is reliable across builds, so each wait is bounded
//! and a missing prompt degrades the session instead of failing it:
//!
//! ```text
//! Spawning -> AwaitDatafilePrompt -> AwaitMainPrompt -> Ready
//!                                          |
//!                                          +-> (nudge) -> Degraded -> Ready
//! ```
//!
//! When a prompt was missed or the nudge was needed, Evolver may still owe
//! one more `Enter command:`; it is swallowed before the session is handed
//! out so the first command does not match it.
//!
//! Only a spawn failure or the child exiting mid-handshake ends in `Failed`.

use log::{debug, info, warn};

use super::session::{PromptMode, Session};
use crate::channel::PromptPattern;
use crate::config::KernelConfig;
use crate::error::{ChannelError, DriverError, Error, Result};
use crate::output::OutputSink;
use crate::transport::{Launcher, SessionHandle};

/// Upper bound on extra prompts swallowed after a tolerance path.
const MAX_STALE_PROMPTS: usize = 4;

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Spawning,
    AwaitDatafilePrompt,
    AwaitMainPrompt,
    Ready,
    /// Main prompt never confirmed; continuing on the fallback prompt.
    Degraded,
    Failed,
}

/// What the handshake observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeReport {
    /// Final state; always `Ready` for a completed handshake.
    pub state: HandshakeState,

    /// Whether the datafile prompt showed up in time.
    pub datafile_prompt_seen: bool,

    /// Whether the nudge line had to be sent.
    pub nudged: bool,

    /// Prompt the session runs on.
    pub mode: PromptMode,

    /// Text Evolver printed during startup (version banner, datafile
    /// messages).
    pub banner: String,
}

/// Drives one freshly spawned child to a usable prompt.
pub struct Handshake<'a> {
    config: &'a KernelConfig,
    sink: &'a dyn OutputSink,
    state: HandshakeState,
}

impl<'a> Handshake<'a> {
    pub fn new(config: &'a KernelConfig, sink: &'a dyn OutputSink) -> Self {
        Self {
            config,
            sink,
            state: HandshakeState::Spawning,
        }
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    fn transition(&mut self, next: HandshakeState) {
        debug!("handshake: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Spawn a child with `launcher` and bring it to a prompt.
    ///
    /// On failure the child, if any, has already been terminated.
    pub async fn run<L: Launcher>(
        mut self,
        launcher: &L,
    ) -> Result<(Session<L::Handle>, HandshakeReport)> {
        let datafile_prompt = PromptPattern::datafile().map_err(ChannelError::from)?;
        let main_prompt = PromptPattern::main().map_err(ChannelError::from)?;

        self.transition(HandshakeState::Spawning);
        let launch = self.config.launch_config();
        let mut handle = match launcher.launch(&launch) {
            Ok(handle) => handle,
            Err(e) => {
                self.transition(HandshakeState::Failed);
                return Err(e);
            }
        };

        match self
            .negotiate(&mut handle, &datafile_prompt, main_prompt)
            .await
        {
            Ok((prompt, report)) => {
                let session = Session::new(handle, prompt, report.mode);
                Ok((session, report))
            }
            Err(e) => {
                self.transition(HandshakeState::Failed);
                if let Err(term) = handle.terminate() {
                    warn!("failed to terminate child after handshake error: {}", term);
                }
                Err(e)
            }
        }
    }

    async fn negotiate<H: SessionHandle>(
        &mut self,
        handle: &mut H,
        datafile_prompt: &PromptPattern,
        main_prompt: PromptPattern,
    ) -> Result<(PromptPattern, HandshakeReport)> {
        let timeout = self.config.handshake_timeout;
        let mut banner = String::new();

        self.transition(HandshakeState::AwaitDatafilePrompt);
        let datafile_prompt_seen = match handle.read_until(datafile_prompt, Some(timeout)).await {
            Ok(text) => {
                banner.push_str(&text);
                true
            }
            Err(e) if e.is_timeout() => {
                // Some builds go straight to the command prompt
                warn!("datafile prompt not seen within {:?}", timeout);
                self.sink.notice("Datafile prompt not seen; continuing.");
                false
            }
            Err(e) => return Err(startup_error(e, "the datafile prompt")),
        };

        handle.send_line(&self.config.datafile).await?;

        self.transition(HandshakeState::AwaitMainPrompt);
        match handle.read_until(&main_prompt, Some(timeout)).await {
            Ok(text) => {
                banner.push_str(&text);
                if !datafile_prompt_seen {
                    // The datafile answer was taken as a command and
                    // re-prompts on its own
                    self.settle(handle, &main_prompt, &mut banner).await?;
                }
                return Ok(self.ready(main_prompt, datafile_prompt_seen, false, banner));
            }
            Err(e) if e.is_timeout() => {}
            Err(e) => return Err(startup_error(e, "the main prompt")),
        }

        self.sink.notice("Main prompt not seen; sending an empty line.");
        handle.send_line("").await?;
        match handle
            .read_until(&main_prompt, Some(self.config.nudge_timeout))
            .await
        {
            Ok(text) => {
                banner.push_str(&text);
                // A late prompt and the answer to the nudge both show up
                self.settle(handle, &main_prompt, &mut banner).await?;
                return Ok(self.ready(main_prompt, datafile_prompt_seen, true, banner));
            }
            Err(e) if e.is_timeout() => {}
            Err(e) => return Err(startup_error(e, "the main prompt")),
        }

        self.transition(HandshakeState::Degraded);
        let fallback = PromptPattern::fallback();
        warn!("main prompt never appeared; falling back to {:?}", fallback.as_str());
        self.sink.notice(&format!(
            "Main prompt not seen; using fallback prompt '{}'.",
            fallback.as_str()
        ));

        // Stale fallback prompts from startup would otherwise be matched by
        // the first command
        banner.push_str(&handle.take_pending());

        self.transition(HandshakeState::Ready);
        self.sink.notice("Evolver launched with fallback prompt.");
        Ok((
            fallback,
            HandshakeReport {
                state: self.state,
                datafile_prompt_seen,
                nudged: true,
                mode: PromptMode::Fallback,
                banner,
            },
        ))
    }

    /// Swallow main prompts still in flight, then drain whatever else is
    /// buffered into the banner. Ends at the first quiet `settle_timeout`.
    async fn settle<H: SessionHandle>(
        &self,
        handle: &mut H,
        main_prompt: &PromptPattern,
        banner: &mut String,
    ) -> Result<()> {
        for _ in 0..MAX_STALE_PROMPTS {
            match handle
                .read_until(main_prompt, Some(self.config.settle_timeout))
                .await
            {
                Ok(text) => {
                    debug!("handshake: discarded a stale main prompt");
                    banner.push_str(&text);
                }
                Err(e) if e.is_timeout() => break,
                Err(e) => return Err(startup_error(e, "the main prompt")),
            }
        }
        banner.push_str(&handle.take_pending());
        Ok(())
    }

    fn ready(
        &mut self,
        prompt: PromptPattern,
        datafile_prompt_seen: bool,
        nudged: bool,
        banner: String,
    ) -> (PromptPattern, HandshakeReport) {
        self.transition(HandshakeState::Ready);
        info!("Evolver ready at main prompt");
        self.sink.notice("Evolver launched. Main prompt ready.");
        (
            prompt,
            HandshakeReport {
                state: self.state,
                datafile_prompt_seen,
                nudged,
                mode: PromptMode::Main,
                banner,
            },
        )
    }
}

/// Turn end of stream during startup into a handshake failure; pass other
/// errors through.
fn startup_error(e: Error, waiting_for: &str) -> Error {
    if e.is_end_of_stream() {
        DriverError::HandshakeFailed {
            message: format!("Evolver exited while waiting for {}", waiting_for),
        }
        .into()
    } else {
        e
    }
}
