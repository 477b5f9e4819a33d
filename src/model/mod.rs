//! Debug session state shared between actions and the engine facade

pub mod breakpoint;
pub mod frame;
pub mod watch;

pub use breakpoint::Breakpoint;
pub use frame::{CurrentFrame, Register, StackFrame, ThreadInfo};
pub use watch::{WatchArena, WatchHandle, WatchNode};
