//! Concrete debugger actions
//!
//! Each action drives one conversation with gdb: it queues commands through
//! its [`ActionCore`](crate::exec::ActionCore), consumes the tagged results,
//! and publishes the outcome into the session model.

pub mod backtrace;
pub mod breakpoint;
pub mod memory;
pub mod registers;
pub mod simple;
pub mod threads;
pub mod watch;

pub use backtrace::GenerateBacktraceAction;
pub use breakpoint::BreakpointAddAction;
pub use memory::ExamineMemoryAction;
pub use registers::ListRegistersAction;
pub use simple::{RunAction, SimpleAction, SwitchToFrameAction, SwitchToThreadAction};
pub use threads::ListThreadsAction;
pub use watch::{WatchCollapseAction, WatchCreateAction, WatchExpandedAction, WatchesUpdateAction};
