//! # evolver-kernel
//!
//! Async driver for the Surface Evolver interactive REPL.
//!
//! Evolver has no scripting API; it only talks to a terminal. This crate
//! runs it on a pseudo-terminal and turns blocks of input ("cells") into
//! prompt-delimited request/response exchanges, the way a notebook kernel
//! needs them.
//!
//! ## Features
//!
//! - Lazy spawn on the first non-blank cell
//! - Whitespace-tolerant prompt matching with a degraded fallback prompt
//! - Startup handshake that tolerates missing or late prompts
//! - Transparent restart when Evolver dies mid-cell
//! - Cooperative interrupts delivered as Ctrl-C
//! - Separate normal and diagnostic output streams
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use evolver_kernel::{Coordinator, ExecutionRequest, KernelConfig, StdioSink};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = KernelConfig::from_env();
//!     let mut kernel = Coordinator::from_config(config, Arc::new(StdioSink));
//!
//!     let result = kernel
//!         .execute(&ExecutionRequest::new("g 5\nshow_vol"))
//!         .await;
//!     println!("status: {:?}", result.status);
//!
//!     kernel.shutdown();
//! }
//! ```

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod info;
pub mod output;
pub mod transport;

// Re-export main types for convenience
pub use channel::{PromptMatcher, PromptPattern};
pub use config::KernelConfig;
pub use driver::{
    Coordinator, ErrorKind, ExecutionRequest, ExecutionResult, HandshakeReport, HandshakeState,
    InterruptHandle, PromptMode, Status,
};
pub use error::Error;
pub use info::KERNEL_INFO;
pub use output::{ChannelSink, MemorySink, OutputSink, StdioSink};
pub use transport::{LaunchConfig, Launcher, PtyLauncher, SessionHandle};
