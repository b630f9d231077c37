//! Output sinks for captured text and diagnostic notices.
//!
//! The coordinator writes to two independent streams: normal output (what
//! Evolver printed) and diagnostics (notices about launches, restarts and
//! recovery). Sinks must not block; slow consumers should sit behind a
//! [`ChannelSink`].

use std::io::{self, Write};
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;

/// Tag prefixed to every diagnostic line.
pub const NOTICE_TAG: &str = "[EvolverKernel]";

/// The stream a piece of text belongs to. Serializes to the notebook
/// stream names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stream {
    #[serde(rename = "stdout")]
    Output,
    #[serde(rename = "stderr")]
    Diagnostic,
}

/// One piece of emitted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputEvent {
    #[serde(rename = "name")]
    pub stream: Stream,
    pub text: String,
}

/// Destination for emitted text.
pub trait OutputSink: Send + Sync {
    /// Emit normal output.
    fn write_output(&self, text: &str);

    /// Emit diagnostic text.
    fn write_diagnostic(&self, text: &str);

    /// Emit a tagged, newline-terminated diagnostic notice.
    fn notice(&self, message: &str) {
        self.write_diagnostic(&format!("{} {}\n", NOTICE_TAG, message));
    }
}

/// Sink that forwards events over an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutputEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutputEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, stream: Stream, text: &str) {
        let event = OutputEvent {
            stream,
            text: text.to_string(),
        };
        if self.tx.send(event).is_err() {
            log::debug!("output receiver dropped; discarding {:?} text", stream);
        }
    }
}

impl OutputSink for ChannelSink {
    fn write_output(&self, text: &str) {
        self.send(Stream::Output, text);
    }

    fn write_diagnostic(&self, text: &str) {
        self.send(Stream::Diagnostic, text);
    }
}

/// Sink writing to the process's own stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioSink;

impl OutputSink for StdioSink {
    fn write_output(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(text.as_bytes()).and_then(|()| out.flush());
    }

    fn write_diagnostic(&self, text: &str) {
        let mut err = io::stderr().lock();
        let _ = err.write_all(text.as_bytes()).and_then(|()| err.flush());
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<OutputEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Everything written to the normal stream, concatenated.
    pub fn output(&self) -> String {
        self.collect(Stream::Output)
    }

    /// Everything written to the diagnostic stream, concatenated.
    pub fn diagnostics(&self) -> String {
        self.collect(Stream::Diagnostic)
    }

    fn collect(&self, stream: Stream) -> String {
        self.events()
            .into_iter()
            .filter(|e| e.stream == stream)
            .map(|e| e.text)
            .collect()
    }

    fn push(&self, stream: Stream, text: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(OutputEvent {
                stream,
                text: text.to_string(),
            });
        }
    }
}

impl OutputSink for MemorySink {
    fn write_output(&self, text: &str) {
        self.push(Stream::Output, text);
    }

    fn write_diagnostic(&self, text: &str) {
        self.push(Stream::Diagnostic, text);
    }
}
