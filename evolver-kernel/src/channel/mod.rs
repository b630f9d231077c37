//! Channel layer for prompt matching and PTY settings.
//!
//! This module handles prompt detection over the raw byte stream
//! coming back from the child's terminal.

mod buffer;
mod patterns;
mod pty;

pub use buffer::PatternBuffer;
pub use patterns::{
    DATAFILE_PROMPT, FALLBACK_PROMPT, MAIN_PROMPT, PromptMatcher, PromptPattern,
    compile_template,
};
pub use pty::PtyConfig;
