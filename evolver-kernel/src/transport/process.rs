//! Child process transport using portable-pty.
//!
//! PTY reads are blocking, so a dedicated thread pumps the master side into
//! a tokio channel and the async side assembles chunks in a
//! [`PatternBuffer`] until a prompt shows up.

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use log::{debug, trace, warn};
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::config::LaunchConfig;
use super::{Launcher, SessionHandle};
use crate::channel::{PatternBuffer, PromptMatcher};
use crate::error::{ChannelError, Result, TransportError};

/// Terminal interrupt character (Ctrl-C).
const INTERRUPT: u8 = 0x03;

/// Launcher that spawns real processes on a native pseudo-terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct PtyLauncher;

impl Launcher for PtyLauncher {
    type Handle = PtyProcess;

    fn launch(&self, config: &LaunchConfig) -> Result<PtyProcess> {
        PtyProcess::spawn(config)
    }
}

/// A child process attached to a pseudo-terminal.
pub struct PtyProcess {
    /// Program name, for log messages.
    program: String,

    /// The child (None once terminated).
    child: Option<Box<dyn Child + Send + Sync>>,

    /// PTY master; dropping it hangs up the terminal.
    master: Option<Box<dyn MasterPty + Send>>,

    /// Write side of the PTY master.
    writer: Option<Box<dyn Write + Send>>,

    /// Chunks read from the PTY by the reader thread.
    output: mpsc::UnboundedReceiver<Vec<u8>>,

    /// Received but not yet consumed output.
    buffer: PatternBuffer,

    /// Debug copy of all traffic.
    tee: Option<Box<dyn Write + Send>>,
}

impl PtyProcess {
    /// Spawn `config.program` on a new pseudo-terminal.
    pub fn spawn(config: &LaunchConfig) -> Result<Self> {
        let program = config.program_name();

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: config.pty.terminal_height,
                cols: config.pty.terminal_width,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| TransportError::Pty(e.to_string()))?;

        if !config.echo {
            // Output is still usable with echo on, only noisier
            if let Err(e) = disable_echo(pair.master.as_ref()) {
                warn!("Could not disable terminal echo for {}: {}", program, e);
            }
        }

        let mut cmd = CommandBuilder::new(&config.program);
        cmd.args(&config.args);
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &config.cwd {
            cmd.cwd(dir);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| TransportError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        // Our copy of the slave must go, or reads never see end of stream
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TransportError::Pty(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| TransportError::Pty(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        spawn_reader(reader, tx, config.pty.read_chunk_size)?;

        debug!(
            "spawned {} (pid {:?}) on a {}x{} pty",
            program,
            child.process_id(),
            config.pty.terminal_width,
            config.pty.terminal_height
        );

        let tee: Option<Box<dyn Write + Send>> = if config.debug_tee {
            Some(Box::new(io::stderr()))
        } else {
            None
        };

        Ok(Self {
            program,
            child: Some(child),
            master: Some(pair.master),
            writer: Some(writer),
            output: rx,
            buffer: PatternBuffer::new(config.pty.search_depth),
            tee,
        })
    }

    /// Copy all traffic to `writer` instead of the default tee target.
    pub fn with_tee(mut self, writer: impl Write + Send + 'static) -> Self {
        self.tee = Some(Box::new(writer));
        self
    }

    /// OS process id of the child, if still known.
    pub fn process_id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.process_id())
    }

    /// Whether `terminate` has run.
    pub fn is_terminated(&self) -> bool {
        self.child.is_none()
    }

    fn tee(&mut self, data: &[u8]) {
        if let Some(tee) = self.tee.as_mut() {
            // Best effort; the tee never affects the session
            let _ = tee.write_all(data).and_then(|()| tee.flush());
        }
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(ChannelError::Closed)?;
        if let Err(e) = writer.write_all(data).and_then(|()| writer.flush()) {
            // The next read reports the dead child as end of stream
            warn!("write to {} failed: {}", self.program, e);
        }
        self.tee(data);
        Ok(())
    }
}

impl SessionHandle for PtyProcess {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        trace!("send: {:?}", line);
        let mut payload = Vec::with_capacity(line.len() + 1);
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
        self.write_raw(&payload)
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

            if self.is_terminated() {
                return Err(ChannelError::Closed.into());
            }

            let chunk = match (deadline, timeout) {
                (Some(deadline), Some(timeout)) => {
                    tokio::time::timeout_at(deadline, self.output.recv())
                        .await
                        .map_err(|_| ChannelError::PatternTimeout(timeout))?
                }
                _ => self.output.recv().await,
            };

            match chunk {
                Some(data) => {
                    trace!("recv {} bytes", data.len());
                    self.tee(&data);
                    self.buffer.extend(&data);
                }
                None => {
                    debug!("{}: end of stream", self.program);
                    return Err(ChannelError::Closed.into());
                }
            }
        }
    }

    fn take_pending(&mut self) -> String {
        // Pick up anything the reader thread already delivered
        while let Ok(data) = self.output.try_recv() {
            self.tee(&data);
            self.buffer.extend(&data);
        }
        if self.buffer.is_empty() {
            return String::new();
        }
        String::from_utf8_lossy(&self.buffer.take()).into_owned()
    }

    fn is_alive(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!("{} exited: {:?}", self.program, status);
                false
            }
            Err(e) => {
                warn!("could not poll {}: {}", self.program, e);
                false
            }
        }
    }

    fn send_interrupt(&mut self) -> Result<()> {
        debug!("interrupting {}", self.program);
        self.write_raw(&[INTERRUPT])
    }

    /// Hang up the terminal and hand the child to a reaper thread.
    ///
    /// Never blocks: killing (SIGHUP, then SIGKILL if the child lingers)
    /// and reaping happen off the caller's thread. The reader thread ends
    /// once every process holding the terminal has exited; a grandchild
    /// that ignores SIGHUP keeps it parked in `read` until it goes away.
    fn terminate(&mut self) -> Result<()> {
        self.writer = None;
        self.master = None;
        self.output.close();

        if let Some(child) = self.child.take() {
            spawn_reaper(self.program.clone(), child)?;
        }
        Ok(())
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        let _ = self.terminate();
    }
}

/// Pump blocking PTY reads into `tx` until end of stream.
fn spawn_reader(
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    chunk_size: usize,
) -> Result<()> {
    thread::Builder::new()
        .name("evolver-pty-reader".into())
        .spawn(move || {
            let mut buf = vec![0u8; chunk_size.max(1)];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    // Linux reports a hung-up terminal as EIO
                    Err(e) => {
                        debug!("pty read ended: {}", e);
                        break;
                    }
                }
            }
            debug!("pty reader thread exiting");
        })
        .map_err(TransportError::Io)?;
    Ok(())
}

/// Kill and reap `child` on a dedicated thread.
fn spawn_reaper(program: String, mut child: Box<dyn Child + Send + Sync>) -> Result<()> {
    thread::Builder::new()
        .name("evolver-reaper".into())
        .spawn(move || {
            if !matches!(child.try_wait(), Ok(Some(_))) {
                if let Err(e) = child.kill() {
                    debug!("kill {}: {}", program, e);
                }
            }
            match child.wait() {
                Ok(status) => debug!("terminated {}: {:?}", program, status),
                Err(e) => debug!("reap {}: {}", program, e),
            }
        })
        .map_err(TransportError::Io)?;
    Ok(())
}

#[cfg(unix)]
fn disable_echo(master: &dyn MasterPty) -> Result<()> {
    use std::os::fd::BorrowedFd;

    use nix::sys::termios::{self, LocalFlags, SetArg};

    let raw = master
        .as_raw_fd()
        .ok_or_else(|| TransportError::Pty("PTY master has no file descriptor".into()))?;
    // SAFETY: `raw` belongs to `master`, which outlives this borrow.
    let fd = unsafe { BorrowedFd::borrow_raw(raw) };

    let mut attrs = termios::tcgetattr(fd).map_err(|e| TransportError::Pty(e.to_string()))?;
    attrs.local_flags.remove(LocalFlags::ECHO);
    termios::tcsetattr(fd, SetArg::TCSANOW, &attrs)
        .map_err(|e| TransportError::Pty(e.to_string()))?;
    Ok(())
}

#[cfg(not(unix))]
fn disable_echo(_master: &dyn MasterPty) -> Result<()> {
    Ok(())
}
