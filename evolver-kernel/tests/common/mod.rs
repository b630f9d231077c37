//! Scripted stand-ins for Evolver used by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use evolver_kernel::channel::{DATAFILE_PROMPT, MAIN_PROMPT, PatternBuffer, PromptMatcher};
use evolver_kernel::error::{ChannelError, Result, TransportError};
use evolver_kernel::{KernelConfig, LaunchConfig, Launcher, SessionHandle};
use tokio::time::Instant;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// How the fake child reacts to a line.
pub enum Reply {
    /// Write this text (usually ending in a prompt).
    Output(String),
    /// Write this text after a delay.
    Later(String, Duration),
    /// Write nothing.
    Silence,
    /// Exit.
    Die,
    /// Fail the write itself.
    Fail(String),
}

/// Shared view of a handle's activity, readable after the handle has moved
/// into the coordinator.
#[derive(Debug, Clone, Default)]
pub struct Activity {
    sent: Arc<Mutex<Vec<String>>>,
    interrupts: Arc<AtomicUsize>,
    terminations: Arc<AtomicUsize>,
    exited: Arc<AtomicBool>,
}

impl Activity {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn interrupts(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    /// Make the child exit behind the coordinator's back.
    pub fn exit(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }
}

type Script = Box<dyn FnMut(&str) -> Reply + Send>;

/// A fake child process driven by a script instead of a terminal.
pub struct ScriptedHandle {
    buffer: PatternBuffer,
    delayed: VecDeque<(Instant, String)>,
    alive: bool,
    terminated: bool,
    script: Script,
    on_interrupt: String,
    activity: Activity,
}

impl ScriptedHandle {
    /// A child that prints `banner` at startup and answers lines with
    /// `script`.
    pub fn new(banner: &str, script: impl FnMut(&str) -> Reply + Send + 'static) -> Self {
        let mut buffer = PatternBuffer::default();
        buffer.extend(banner.as_bytes());
        Self {
            buffer,
            delayed: VecDeque::new(),
            alive: true,
            terminated: false,
            script: Box::new(script),
            on_interrupt: String::new(),
            activity: Activity::default(),
        }
    }

    /// Text written when Ctrl-C arrives.
    pub fn on_interrupt(mut self, text: &str) -> Self {
        self.on_interrupt = text.to_string();
        self
    }

    /// A child that has already exited after printing `banner`.
    pub fn exited(banner: &str) -> Self {
        let mut handle = Self::new(banner, |_| Reply::Die);
        handle.alive = false;
        handle
    }

    pub fn activity(&self) -> Activity {
        self.activity.clone()
    }

    fn running(&self) -> bool {
        self.alive && !self.terminated && !self.activity.exited.load(Ordering::SeqCst)
    }
}

impl SessionHandle for ScriptedHandle {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.activity.sent.lock().unwrap().push(line.to_string());
        if !self.running() {
            return Ok(());
        }
        match (self.script)(line) {
            Reply::Output(text) => self.buffer.extend(text.as_bytes()),
            Reply::Later(text, delay) => self.delayed.push_back((Instant::now() + delay, text)),
            Reply::Silence => {}
            Reply::Die => self.alive = false,
            Reply::Fail(reason) => {
                return Err(TransportError::Io(io::Error::other(reason)).into());
            }
        }
        Ok(())
    }

    async fn read_until(
        &mut self,
        pattern: &dyn PromptMatcher,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let deadline = timeout.map(|t| Instant::now() + t);
        self.buffer.rescan();
        loop {
            if let Some(m) = self.buffer.find(pattern) {
                let before = self.buffer.take_through(m);
                return Ok(String::from_utf8_lossy(&before).into_owned());
            }

            if let Some(&(due, _)) = self.delayed.front() {
                if let (Some(deadline), Some(timeout)) = (deadline, timeout) {
                    if deadline < due {
                        tokio::time::sleep_until(deadline).await;
                        return Err(ChannelError::PatternTimeout(timeout).into());
                    }
                }
                tokio::time::sleep_until(due).await;
                if let Some((_, text)) = self.delayed.pop_front() {
                    self.buffer.extend(text.as_bytes());
                }
                continue;
            }

            if !self.running() {
                return Err(ChannelError::Closed.into());
            }
            // Nothing more will ever arrive
            return match timeout {
                Some(timeout) => Err(ChannelError::PatternTimeout(timeout).into()),
                None => std::future::pending().await,
            };
        }
    }

    fn take_pending(&mut self) -> String {
        String::from_utf8_lossy(&self.buffer.take()).into_owned()
    }

    fn is_alive(&mut self) -> bool {
        self.running()
    }

    fn send_interrupt(&mut self) -> Result<()> {
        self.activity.interrupts.fetch_add(1, Ordering::SeqCst);
        let text = self.on_interrupt.clone();
        self.buffer.extend(text.as_bytes());
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        if !self.terminated {
            self.terminated = true;
            self.activity.terminations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

type Factory = Box<dyn Fn(usize) -> Result<ScriptedHandle> + Send + Sync>;

/// Spy launcher: builds a handle per spawn and remembers every activity.
pub struct ScriptedLauncher {
    factory: Factory,
    spawns: Arc<AtomicUsize>,
    activities: Arc<Mutex<Vec<Activity>>>,
    launches: Arc<Mutex<Vec<LaunchConfig>>>,
}

impl ScriptedLauncher {
    /// `factory` receives the zero-based spawn index.
    pub fn new(factory: impl Fn(usize) -> Result<ScriptedHandle> + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            spawns: Arc::new(AtomicUsize::new(0)),
            activities: Arc::new(Mutex::new(Vec::new())),
            launches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A launcher whose spawns always fail.
    pub fn failing() -> Self {
        Self::new(|_| {
            Err(TransportError::SpawnFailed {
                program: "evolver".into(),
                reason: "No such file or directory".into(),
            }
            .into())
        })
    }

    pub fn spy(&self) -> LauncherSpy {
        LauncherSpy {
            spawns: self.spawns.clone(),
            activities: self.activities.clone(),
            launches: self.launches.clone(),
        }
    }
}

impl Launcher for ScriptedLauncher {
    type Handle = ScriptedHandle;

    fn launch(&self, config: &LaunchConfig) -> Result<ScriptedHandle> {
        let index = self.spawns.fetch_add(1, Ordering::SeqCst);
        self.launches.lock().unwrap().push(config.clone());
        let handle = (self.factory)(index)?;
        self.activities.lock().unwrap().push(handle.activity());
        Ok(handle)
    }
}

/// Read side of a [`ScriptedLauncher`].
#[derive(Clone)]
pub struct LauncherSpy {
    spawns: Arc<AtomicUsize>,
    activities: Arc<Mutex<Vec<Activity>>>,
    launches: Arc<Mutex<Vec<LaunchConfig>>>,
}

impl LauncherSpy {
    pub fn spawns(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn activity(&self, index: usize) -> Activity {
        self.activities.lock().unwrap()[index].clone()
    }

    pub fn launches(&self) -> Vec<LaunchConfig> {
        self.launches.lock().unwrap().clone()
    }
}

/// A well-behaved Evolver: banner, datafile prompt, then `respond(line)`
/// followed by the main prompt for every command.
pub fn evolver(respond: impl Fn(&str) -> String + Send + 'static) -> ScriptedHandle {
    let mut datafile_answered = false;
    ScriptedHandle::new(
        &format!("Surface Evolver 2.70\n{}", DATAFILE_PROMPT),
        move |line| {
            if !datafile_answered {
                datafile_answered = true;
                return Reply::Output(format!("\n{}", MAIN_PROMPT));
            }
            Reply::Output(format!("{}{}", respond(line), MAIN_PROMPT))
        },
    )
}

/// Upper-cases each command, one line of output per command.
pub fn shout(line: &str) -> String {
    format!("{}\n", line.to_uppercase())
}

pub fn test_config() -> KernelConfig {
    KernelConfig::new("/opt/evolver/bin/evolver")
}
