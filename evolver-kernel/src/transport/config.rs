//! Child process launch configuration.

use std::path::PathBuf;

use crate::channel::PtyConfig;

/// Everything needed to start one child on a pseudo-terminal.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Executable to run.
    pub program: PathBuf,

    /// Command-line arguments.
    pub args: Vec<String>,

    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,

    /// Working directory (inherited when `None`).
    pub cwd: Option<PathBuf>,

    /// Terminal settings.
    pub pty: PtyConfig,

    /// Whether the terminal echoes input back. Evolver is driven with echo
    /// off so command text does not show up in captured output.
    pub echo: bool,

    /// Copy every byte sent and received to stderr.
    pub debug_tee: bool,
}

impl LaunchConfig {
    /// Launch `program` with no arguments, echo off.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            pty: PtyConfig::default(),
            echo: false,
            debug_tee: false,
        }
    }

    /// Add a command-line argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Display name of the program, for messages.
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}
