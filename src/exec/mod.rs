//! Command execution and scheduling
//!
//! Commands go out tagged with a [`CommandId`]; gdb echoes the tag back on
//! the answering result record, which is how responses are routed to the
//! action that asked for them.

pub mod action;
pub mod command;
pub mod executor;

pub use action::{Action, ActionCore, ActionsMap, PendingCommand};
pub use command::{split_output_line, CommandId};
pub use executor::GdbExecutor;
