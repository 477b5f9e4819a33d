//! Memory examination

use crate::exec::{Action, ActionCore, CommandId};
use crate::mi::Record;

/// Dump `length` bytes at `address` with the CLI `x` command. The hex rows
/// arrive as console stream lines; the tagged result only closes the
/// request, which is reported through the callback.
pub struct ExamineMemoryAction {
    core: ActionCore,
    address: String,
    length: u32,
    on_done: Box<dyn FnMut(&Record)>,
}

impl ExamineMemoryAction {
    pub fn new(address: impl Into<String>, length: u32, on_done: impl FnMut(&Record) + 'static) -> Self {
        Self {
            core: ActionCore::new(),
            address: address.into(),
            length,
            on_done: Box::new(on_done),
        }
    }
}

impl Action for ExamineMemoryAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_start(&mut self) {
        self.core.execute(format!("x/{}xb {}", self.length, self.address));
    }

    fn on_command_output(&mut self, _id: CommandId, record: &Record) {
        (self.on_done)(record);
        self.core.finish();
    }
}
