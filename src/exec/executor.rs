//! Command executor
//!
//! Owns the transport, tags outgoing commands, and buffers parsed output
//! records in arrival order for the dispatch loop.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::mi::Record;
use crate::transport::Transport;

use super::command::{split_output_line, CommandId};

/// Action id used for fire-and-forget commands issued outside any action
const UNTAGGED_ACTION: i32 = 0;

pub struct GdbExecutor {
    transport: Box<dyn Transport>,
    next_untagged: i32,
    results: VecDeque<(CommandId, Record)>,
    stopped: Rc<Cell<bool>>,
    interrupting: bool,
    temporary_interrupt: bool,
    child_pid: Option<i64>,
}

impl GdbExecutor {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            next_untagged: 1,
            results: VecDeque::new(),
            stopped: Rc::new(Cell::new(false)),
            interrupting: false,
            temporary_interrupt: false,
            child_pid: None,
        }
    }

    /// Send a command outside any action. The result record, if anyone
    /// cares, arrives tagged with the returned id.
    pub fn execute(&mut self, command: &str) -> CommandId {
        let id = CommandId::new(UNTAGGED_ACTION, self.next_untagged);
        self.next_untagged += 1;
        self.execute_tagged(id, command)
    }

    /// Send a command on behalf of an action. Returns [`CommandId::NONE`]
    /// when the transport write fails; callers must check.
    pub fn execute_tagged(&mut self, id: CommandId, command: &str) -> CommandId {
        debug!("cmd==> {id}{command}");
        match self.transport.write_line(&format!("{id}{command}")) {
            Ok(()) => id,
            Err(e) => {
                warn!("command write failed: {e}");
                CommandId::NONE
            }
        }
    }

    /// Classify and buffer one raw output line. Returns false for lines
    /// that fit no record shape; those are logged and dropped.
    pub fn process_output(&mut self, line: &str) -> bool {
        let (id, rest) = split_output_line(line);
        match Record::parse(rest) {
            Ok(record) => {
                trace!("output==> {line}");
                self.results.push_back((id, record));
                true
            }
            Err(_) => {
                warn!("unparsable_output==> {line}");
                false
            }
        }
    }

    /// Read everything the transport has buffered and process it.
    /// Returns true when at least one line arrived.
    pub fn poll_transport(&mut self) -> bool {
        let lines = self.transport.read_available_lines();
        let any = !lines.is_empty();
        for line in lines {
            self.process_output(&line);
        }
        any
    }

    pub fn has_output(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn pop_result(&mut self) -> Option<(CommandId, Record)> {
        self.results.pop_front()
    }

    pub fn stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Shared halt flag, handed to closures that outlive a borrow of self
    pub fn stopped_flag(&self) -> Rc<Cell<bool>> {
        self.stopped.clone()
    }

    pub fn set_stopped(&mut self, stopped: bool) {
        self.stopped.set(stopped);
        if stopped {
            // Whatever interrupt was in flight has landed.
            self.interrupting = false;
        }
    }

    /// Request a halt. Redundant while already halted or while a previous
    /// interrupt is still in flight.
    pub fn interrupt(&mut self, temporary: bool) {
        if self.stopped.get() || self.interrupting {
            return;
        }
        self.interrupting = true;
        self.temporary_interrupt = temporary;
        if let Err(e) = self.transport.send_interrupt(self.child_pid) {
            warn!("interrupt failed: {e}");
            self.interrupting = false;
        }
    }

    pub fn is_interrupting(&self) -> bool {
        self.interrupting
    }

    /// A temporary interrupt pauses the debuggee just long enough to issue
    /// commands; the stop is not surfaced to the host.
    pub fn is_temporary_interrupt(&self) -> bool {
        self.temporary_interrupt
    }

    pub fn clear_temporary_interrupt(&mut self) {
        self.temporary_interrupt = false;
    }

    pub fn set_child_pid(&mut self, pid: i64) {
        self.child_pid = Some(pid);
    }

    pub fn has_child_pid(&self) -> bool {
        self.child_pid.is_some()
    }

    pub fn is_alive(&self) -> bool {
        self.transport.is_alive()
    }

    /// Drop buffered results
    pub fn clear(&mut self) {
        self.results.clear();
    }

    /// Kill the debugger process and drop whatever was buffered
    pub fn force_stop(&mut self) {
        self.transport.shutdown();
        self.clear();
    }
}
