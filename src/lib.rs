//! GDB/MI protocol engine
//!
//! Drives an external `gdb --interpreter=mi` process: parses MI output
//! records into result-value trees, correlates asynchronous command
//! responses by token, and models multi-step debugger interactions
//! (breakpoints, backtraces, variable watches) as resumable actions
//! scheduled against the debugger process.

pub mod actions;
pub mod common;
pub mod engine;
pub mod exec;
pub mod mi;
pub mod model;
pub mod transport;

// Re-export commonly used types for embedding hosts and tests
pub use common::{Error, Result};
pub use engine::{Debugger, HostInterface, StartMode};
pub use exec::CommandId;
