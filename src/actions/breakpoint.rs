//! Breakpoint insertion

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::exec::{Action, ActionCore, CommandId};
use crate::mi::{Record, ResultClass};
use crate::model::Breakpoint;

/// Insert one breakpoint, then disable it in the same action when the
/// stored breakpoint is disabled. gdb has no "insert disabled" flag, so a
/// disabled breakpoint takes a second round trip.
pub struct BreakpointAddAction {
    core: ActionCore,
    breakpoint: Rc<RefCell<Breakpoint>>,
    temporary: bool,
    insert_cmd: CommandId,
    disable_cmd: CommandId,
}

impl BreakpointAddAction {
    pub fn new(breakpoint: Rc<RefCell<Breakpoint>>) -> Self {
        Self {
            core: ActionCore::new(),
            breakpoint,
            temporary: false,
            insert_cmd: CommandId::NONE,
            disable_cmd: CommandId::NONE,
        }
    }

    /// Temporary breakpoints back run-to-cursor; gdb removes them on hit
    pub fn temporary(breakpoint: Rc<RefCell<Breakpoint>>) -> Self {
        let mut action = Self::new(breakpoint);
        action.temporary = true;
        action
    }
}

impl Action for BreakpointAddAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_start(&mut self) {
        let command = self.breakpoint.borrow().insert_command(self.temporary);
        self.insert_cmd = self.core.execute(command);
    }

    fn on_command_output(&mut self, id: CommandId, record: &Record) {
        if id == self.insert_cmd {
            match record.class {
                ResultClass::Done => {
                    let number = record
                        .value
                        .path("bkpt.number")
                        .and_then(|v| v.as_str())
                        .and_then(|s| s.parse::<i32>().ok());
                    let mut bp = self.breakpoint.borrow_mut();
                    bp.index = number;
                    debug!(location = %bp.location(), index = ?number, "breakpoint inserted");
                    match (number, bp.enabled) {
                        (Some(n), false) => {
                            drop(bp);
                            self.disable_cmd = self.core.execute(format!("-break-disable {n}"));
                        }
                        _ => self.core.finish(),
                    }
                }
                _ => {
                    warn!(
                        location = %self.breakpoint.borrow().location(),
                        message = record.value.string_of("msg").unwrap_or(""),
                        "breakpoint insert failed"
                    );
                    self.core.finish();
                }
            }
        } else if id == self.disable_cmd {
            self.core.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ActionsMap, GdbExecutor};
    use crate::transport::MockTransport;

    fn pump(actions: &mut ActionsMap, executor: &mut GdbExecutor) {
        for _ in 0..8 {
            actions.run(executor);
            executor.poll_transport();
            actions.dispatch(executor, |_| {});
            if actions.is_empty() {
                break;
            }
        }
    }

    fn bkpt_responder(cmd: &str) -> Vec<String> {
        let digits = cmd.bytes().take_while(|b| b.is_ascii_digit()).count();
        let (token, text) = cmd.split_at(digits);
        if text.starts_with("-break-insert") {
            vec![format!("{token}^done,bkpt={{number=\"7\",line=\"42\"}}")]
        } else if text.starts_with("-break-disable") {
            vec![format!("{token}^done")]
        } else {
            vec![]
        }
    }

    #[test]
    fn enabled_breakpoint_needs_one_command() {
        let mock = MockTransport::new().with_responder(bkpt_responder);
        let written = mock.written();
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let bp = Rc::new(RefCell::new(Breakpoint::new("main.c", 42)));
        actions.add(Box::new(BreakpointAddAction::new(bp.clone())));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        assert_eq!(bp.borrow().index, Some(7));
        assert_eq!(written.borrow().len(), 1);
        assert!(written.borrow()[0].ends_with("-break-insert -f main.c:42"));
    }

    #[test]
    fn disabled_breakpoint_gets_a_disable_round_trip() {
        let mock = MockTransport::new().with_responder(bkpt_responder);
        let written = mock.written();
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let mut disabled = Breakpoint::new("main.c", 42);
        disabled.enabled = false;
        let bp = Rc::new(RefCell::new(disabled));
        actions.add(Box::new(BreakpointAddAction::new(bp.clone())));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        assert_eq!(bp.borrow().index, Some(7));
        let written = written.borrow();
        assert_eq!(written.len(), 2);
        assert!(written[1].ends_with("-break-disable 7"));
    }

    #[test]
    fn insert_failure_leaves_no_index() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let digits = cmd.bytes().take_while(|b| b.is_ascii_digit()).count();
            vec![format!(
                "{}^error,msg=\"No source file named nope.c.\"",
                &cmd[..digits]
            )]
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let bp = Rc::new(RefCell::new(Breakpoint::new("nope.c", 1)));
        actions.add(Box::new(BreakpointAddAction::new(bp.clone())));
        pump(&mut actions, &mut executor);

        assert!(actions.is_empty());
        assert_eq!(bp.borrow().index, None);
    }
}
