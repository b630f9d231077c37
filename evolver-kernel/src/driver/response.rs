//! Request and result types for cell execution.

use serde::Serialize;

/// A block of Evolver input to run, one command per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// The raw block as submitted.
    pub code: String,

    /// Suppress forwarding of captured output.
    pub silent: bool,

    /// Whether the caller records this request in its history. Not used by
    /// the kernel; carried for the notebook adapter.
    pub store_history: bool,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            silent: false,
            store_history: true,
        }
    }

    /// Set the silent flag.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Set the store-history flag.
    pub fn store_history(mut self, store_history: bool) -> Self {
        self.store_history = store_history;
        self
    }

    /// Lines that will be sent, in order. Blank lines are skipped; the rest
    /// are passed through unmodified.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.code.lines().filter(|line| !line.trim().is_empty())
    }

    /// True when there is nothing to send.
    pub fn is_blank(&self) -> bool {
        self.code.trim().is_empty()
    }
}

/// Overall status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Call-level failure kinds.
///
/// Per-line problems never show up here; they are written into the
/// captured text so the rest of the block still runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// No Evolver process could be brought to a usable state.
    LaunchFailure,
}

/// Outcome of executing one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub status: Status,

    /// Concatenated output of every line, in order.
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecutionResult {
    /// Successful execution with captured `text`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            text: text.into(),
            error_kind: None,
            error_message: None,
        }
    }

    /// Failed execution.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            text: String::new(),
            error_kind: Some(kind),
            error_message: Some(message.into()),
        }
    }

    /// Check if the execution succeeded.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
