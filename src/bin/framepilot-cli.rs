//! Framepilot CLI - run the frame controller outside a browser
//!
//! # Usage
//!
//! ```bash
//! # Replay a scripted host session
//! ./target/debug/framepilot-cli demos/rejected.json
//!
//! # JSON output for scripting
//! ./target/debug/framepilot-cli demos/notifications.json --json | jq .
//!
//! # Talk to a real host over stdin/stdout
//! host-bridge | ./target/debug/framepilot-cli --stdio
//! ```
//!
//! # Features
//!
//! This binary requires the `cli` feature flag (enabled by default).

use anyhow::Result;
use clap::Parser;

use framepilot_lib::cli::{initialize, run, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut ctx = initialize(&args).await?;

    let result = run(&mut ctx).await;

    // Graceful shutdown
    ctx.shutdown().await?;

    result
}
