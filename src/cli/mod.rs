//! CLI module for headless frame sessions.
//!
//! The CLI runs the same `FrameController` an embedding app would, against
//! either a scripted `SimulatedHost` (scenario files) or a real host speaking
//! the wire protocol over stdin/stdout. Controller output reaches the terminal
//! through the runtime channel:
//!
//! ```text
//! +-----------------+     +----------------+     +---------------+
//! | FrameController | --> | ChannelRuntime | --> | output.rs     |
//! | (shared logic)  |     | (emit())       |     | (print/JSON)  |
//! +-----------------+     +----------------+     +---------------+
//! ```

mod args;
mod bootstrap;
mod output;
mod runner;
mod stdio;

pub use args::Args;
pub use bootstrap::{initialize, CliContext, HostSession};
pub use output::{print_view, run_event_loop, OutputOptions};
pub use runner::run;
pub use stdio::StdioTransport;
