//! Thread list retrieval

use std::cell::RefCell;
use std::rc::Rc;

use crate::exec::{Action, ActionCore, CommandId};
use crate::mi::{Frame, Record, ResultClass};
use crate::model::ThreadInfo;

/// `-thread-info`: rebuild the host-visible thread list
pub struct ListThreadsAction {
    core: ActionCore,
    threads: Rc<RefCell<Vec<ThreadInfo>>>,
    on_changed: Box<dyn FnMut()>,
}

impl ListThreadsAction {
    pub fn new(threads: Rc<RefCell<Vec<ThreadInfo>>>, on_changed: impl FnMut() + 'static) -> Self {
        Self {
            core: ActionCore::new(),
            threads,
            on_changed: Box::new(on_changed),
        }
    }

    fn describe(thread: &crate::mi::ResultValue) -> String {
        let target = thread.string_of("target-id").unwrap_or("");
        let name = thread.string_of("name").unwrap_or("");
        let state = thread.string_of("state").unwrap_or("");

        let mut info = String::new();
        if !name.is_empty() {
            info.push_str(name);
            info.push(' ');
        }
        info.push_str(target);
        if let Some(frame) = thread.find("frame") {
            if let Some(func) = frame.string_of("func") {
                info.push_str(&format!(" in {}({})", func, Frame::format_args(frame)));
            }
            if let (Some(file), Some(line)) = (frame.string_of("file"), frame.string_of("line")) {
                info.push_str(&format!(" at {file}:{line}"));
            }
        }
        if !state.is_empty() {
            info.push_str(&format!(" ({state})"));
        }
        info
    }
}

impl Action for ListThreadsAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_start(&mut self) {
        self.core.execute("-thread-info");
    }

    fn on_command_output(&mut self, _id: CommandId, record: &Record) {
        if record.class == ResultClass::Done {
            let current = record.value.int_of("current-thread-id").unwrap_or(-1) as i32;
            let mut rows = Vec::new();
            if let Some(threads) = record.value.find("threads") {
                for thread in threads.children() {
                    let Some(id) = thread.int_of("id").map(|n| n as i32) else {
                        continue;
                    };
                    rows.push(ThreadInfo {
                        id,
                        active: id == current,
                        info: Self::describe(thread),
                    });
                }
            }
            *self.threads.borrow_mut() = rows;
            (self.on_changed)();
        }
        self.core.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ActionsMap, GdbExecutor};
    use crate::transport::MockTransport;

    #[test]
    fn parses_thread_list() {
        let mock = MockTransport::new().with_responder(|cmd| {
            let digits = cmd.bytes().take_while(|b| b.is_ascii_digit()).count();
            vec![format!(
                "{}^done,threads=[{{id=\"2\",target-id=\"Thread 0x7f1\",name=\"worker\",frame={{level=\"0\",func=\"poll\",args=[],file=\"w.c\",line=\"5\"}},state=\"stopped\"}},{{id=\"1\",target-id=\"Thread 0x7f0\",frame={{level=\"0\",func=\"main\",args=[]}},state=\"stopped\"}}],current-thread-id=\"1\"",
                &cmd[..digits]
            )]
        });
        let mut executor = GdbExecutor::new(Box::new(mock));
        let mut actions = ActionsMap::new();

        let threads = Rc::new(RefCell::new(Vec::new()));
        actions.add(Box::new(ListThreadsAction::new(threads.clone(), || {})));
        actions.run(&mut executor);
        executor.poll_transport();
        actions.dispatch(&mut executor, |_| {});

        let threads = threads.borrow();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, 2);
        assert!(!threads[0].active);
        assert!(threads[0].info.contains("worker"));
        assert!(threads[0].info.contains("poll()"));
        assert!(threads[0].info.contains("at w.c:5"));
        assert!(threads[1].active);
    }
}
