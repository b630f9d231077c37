//! Line-oriented front end for Surface Evolver
//!
//! Reads cells from stdin, one cell per block of lines ended by an empty
//! line, and runs each through the kernel. Ctrl-C interrupts the command
//! currently running inside Evolver instead of killing this program.
//!
//! # Usage
//!
//! ```bash
//! EVOLVER_DATAFILE=cube.fe cargo run --example repl
//! ```
//!
//! `EVOLVER_CMD` overrides the executable and `EVOLVER_KERNEL_DEBUG=1`
//! mirrors raw terminal traffic to stderr.

use std::sync::Arc;

use evolver_kernel::{Coordinator, ExecutionRequest, KERNEL_INFO, KernelConfig, StdioSink};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = KernelConfig::from_env();
    println!(
        "=== {} {} ({}) ===",
        KERNEL_INFO.implementation,
        KERNEL_INFO.implementation_version,
        config.program.display()
    );
    println!("End each cell with an empty line; Ctrl-D to quit.\n");

    let mut kernel = Coordinator::from_config(config, Arc::new(StdioSink));

    let interrupt = kernel.interrupt_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            interrupt.interrupt();
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut cell = String::new();
    loop {
        let line = lines.next_line().await?;
        let finished = match &line {
            Some(line) if !line.trim().is_empty() => {
                cell.push_str(line);
                cell.push('\n');
                false
            }
            _ => true,
        };

        if finished && !cell.is_empty() {
            let result = kernel.execute(&ExecutionRequest::new(cell.as_str())).await;
            if !result.is_ok() {
                log::warn!("cell failed: {:?}", result.error_kind);
            }
            cell.clear();
        }

        if line.is_none() {
            break;
        }
    }

    kernel.shutdown();
    Ok(())
}
