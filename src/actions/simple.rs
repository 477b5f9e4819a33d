//! Small single-command actions

use tracing::warn;

use crate::exec::{Action, ActionCore, CommandId};
use crate::mi::{Record, ResultClass};

/// Fire one command and never wait for its result
pub struct SimpleAction {
    core: ActionCore,
    command: String,
}

impl SimpleAction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            core: ActionCore::new(),
            command: command.into(),
        }
    }
}

impl Action for SimpleAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }
    fn on_start(&mut self) {
        self.core.execute(self.command.clone());
        self.core.finish();
    }
    fn on_command_output(&mut self, _id: CommandId, _record: &Record) {}
}

/// Resume execution (`-exec-run`, `-exec-continue`, a step command) and
/// flip the session's halt flag once gdb confirms with `^running`.
///
/// Always a barrier: a resume must not overtake commands that inspect the
/// halted state.
pub struct RunAction {
    core: ActionCore,
    command: String,
    on_running: Box<dyn FnMut()>,
}

impl RunAction {
    pub fn new(command: impl Into<String>, on_running: impl FnMut() + 'static) -> Self {
        let mut core = ActionCore::new();
        core.set_wait_previous(true);
        Self {
            core,
            command: command.into(),
            on_running: Box::new(on_running),
        }
    }
}

impl Action for RunAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }
    fn on_start(&mut self) {
        self.core.execute(self.command.clone());
    }
    fn on_command_output(&mut self, _id: CommandId, record: &Record) {
        match record.class {
            ResultClass::Running => {
                (self.on_running)();
                self.core.finish();
            }
            ResultClass::Error => {
                warn!(
                    command = %self.command,
                    message = record.value.string_of("msg").unwrap_or(""),
                    "resume command failed"
                );
                self.core.finish();
            }
            _ => self.core.finish(),
        }
    }
}

/// `-stack-select-frame N`, reporting back which frame is now selected
pub struct SwitchToFrameAction {
    core: ActionCore,
    frame: i32,
    user_action: bool,
    on_switched: Box<dyn FnMut(i32, bool)>,
}

impl SwitchToFrameAction {
    pub fn new(frame: i32, user_action: bool, on_switched: impl FnMut(i32, bool) + 'static) -> Self {
        Self {
            core: ActionCore::new(),
            frame,
            user_action,
            on_switched: Box::new(on_switched),
        }
    }
}

impl Action for SwitchToFrameAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }
    fn on_start(&mut self) {
        self.core.execute(format!("-stack-select-frame {}", self.frame));
    }
    fn on_command_output(&mut self, _id: CommandId, record: &Record) {
        if record.class == ResultClass::Done {
            (self.on_switched)(self.frame, self.user_action);
        }
        self.core.finish();
    }
}

/// `-thread-select N`; the result carries the new thread's topmost frame
pub struct SwitchToThreadAction {
    core: ActionCore,
    thread_id: i32,
    on_switched: Box<dyn FnMut(&Record)>,
}

impl SwitchToThreadAction {
    pub fn new(thread_id: i32, on_switched: impl FnMut(&Record) + 'static) -> Self {
        Self {
            core: ActionCore::new(),
            thread_id,
            on_switched: Box::new(on_switched),
        }
    }
}

impl Action for SwitchToThreadAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }
    fn on_start(&mut self) {
        self.core.execute(format!("-thread-select {}", self.thread_id));
    }
    fn on_command_output(&mut self, _id: CommandId, record: &Record) {
        if record.class == ResultClass::Done {
            (self.on_switched)(record);
        }
        self.core.finish();
    }
}
