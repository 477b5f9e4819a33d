//! Action framework and ordered scheduler
//!
//! An action is a small state machine that issues MI commands and consumes
//! the tagged results. The scheduler keeps actions in submission order and
//! honors barrier actions, which refuse to start until everything ahead of
//! them is gone.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::mi::{Record, RecordKind};

use super::command::CommandId;
use super::executor::GdbExecutor;

/// A command queued by an action, not yet written to the transport
#[derive(Debug)]
pub struct PendingCommand {
    pub id: CommandId,
    pub text: String,
}

/// Bookkeeping shared by every action
#[derive(Debug, Default)]
pub struct ActionCore {
    id: i32,
    last_command: i32,
    pending: VecDeque<PendingCommand>,
    started: bool,
    finished: bool,
    wait_previous: bool,
}

impl ActionCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    /// Queue a command under this action's id. The scheduler writes it to
    /// the transport on the next pass.
    pub fn execute(&mut self, command: impl Into<String>) -> CommandId {
        if self.finished {
            warn!(action = self.id, "command queued on a finished action");
            return CommandId::NONE;
        }
        self.last_command += 1;
        let id = CommandId::new(self.id, self.last_command);
        self.pending.push_back(PendingCommand {
            id,
            text: command.into(),
        });
        id
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    pub(crate) fn pop_pending(&mut self) -> Option<PendingCommand> {
        self.pending.pop_front()
    }

    /// Barrier flag: do not start until every earlier action has finished
    pub fn set_wait_previous(&mut self, wait: bool) {
        self.wait_previous = wait;
    }

    pub fn wait_previous(&self) -> bool {
        self.wait_previous
    }
}

/// One unit of scheduled debugger work
pub trait Action {
    fn core(&self) -> &ActionCore;
    fn core_mut(&mut self) -> &mut ActionCore;

    /// Queue the action's first command(s)
    fn on_start(&mut self);

    /// Handle a result record tagged with one of this action's command ids
    fn on_command_output(&mut self, id: CommandId, record: &Record);

    /// Idempotent start
    fn start(&mut self) {
        if !self.core().is_started() {
            self.core_mut().mark_started();
            self.on_start();
        }
    }
}

/// Ordered collection of live actions
pub struct ActionsMap {
    actions: VecDeque<Box<dyn Action>>,
    next_id: i32,
}

impl Default for ActionsMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionsMap {
    pub fn new() -> Self {
        Self {
            actions: VecDeque::new(),
            next_id: 1,
        }
    }

    /// Register an action, assigning its id. It starts on the next
    /// scheduler pass.
    pub fn add(&mut self, mut action: Box<dyn Action>) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        action.core_mut().set_id(id);
        self.actions.push_back(action);
        id
    }

    pub fn find_mut(&mut self, id: i32) -> Option<&mut Box<dyn Action>> {
        self.actions.iter_mut().find(|a| a.core().id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Drop every action and reset id assignment
    pub fn clear(&mut self) {
        self.actions.clear();
        self.next_id = 1;
    }

    /// One scheduler pass: start what may start, flush queued commands,
    /// sweep out finished actions. Stops at the first barrier that still
    /// has predecessors.
    pub fn run(&mut self, executor: &mut GdbExecutor) {
        let mut first = true;
        let mut idx = 0;
        while idx < self.actions.len() {
            let action = &mut self.actions[idx];
            if action.core().wait_previous() && !first {
                break;
            }
            action.start();
            while let Some(pending) = action.core_mut().pop_pending() {
                executor.execute_tagged(pending.id, &pending.text);
            }
            first = false;
            if self.actions[idx].core().is_finished() {
                debug!(action = self.actions[idx].core().id(), "action finished");
                self.actions.remove(idx);
                if idx == 0 {
                    // The queue head is gone, so a barrier can now be first.
                    first = true;
                }
            } else {
                idx += 1;
            }
        }
    }

    /// Drain the executor's buffered records: tagged results go to their
    /// action, everything else goes to the notification handler.
    pub fn dispatch(&mut self, executor: &mut GdbExecutor, mut on_notify: impl FnMut(&Record)) {
        while let Some((id, record)) = executor.pop_result() {
            if record.kind == RecordKind::Result && !id.is_none() {
                match self.find_mut(id.action) {
                    Some(action) => action.on_command_output(id, &record),
                    None => {
                        debug!(%id, "result for a finished or unknown action dropped");
                    }
                }
            } else {
                on_notify(&record);
            }
        }
    }
}
