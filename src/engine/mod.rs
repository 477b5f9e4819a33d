//! Session facade
//!
//! [`Debugger`] ties the pieces together: it owns the executor and the
//! action queue, keeps the session model (breakpoints, watches, frames),
//! and reports state changes to the host through [`HostInterface`]. The
//! host drives it by calling [`Debugger::poll`] from its idle loop.

mod notifications;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use crate::actions::{
    BreakpointAddAction, ExamineMemoryAction, GenerateBacktraceAction, ListRegistersAction,
    ListThreadsAction, RunAction, SimpleAction, SwitchToFrameAction, SwitchToThreadAction,
    WatchCollapseAction, WatchCreateAction, WatchExpandedAction, WatchesUpdateAction,
};
use crate::common::config::DebuggerConfig;
use crate::common::{Error, Result};
use crate::exec::{Action, ActionsMap, GdbExecutor};
use crate::mi::Record;
use crate::model::{
    Breakpoint, CurrentFrame, Register, StackFrame, ThreadInfo, WatchArena, WatchHandle, WatchNode,
};
use crate::transport::Transport;

/// Callbacks into the embedding host. Every method has an empty default so
/// hosts implement only what they surface.
pub trait HostInterface {
    fn notify_watches_changed(&self) {}
    fn notify_backtrace_changed(&self) {}
    fn notify_threads_changed(&self) {}
    fn notify_registers_changed(&self) {}
    /// A tooltip watch finished resolving
    fn update_value_tooltip(&self) {}
    /// Move the editor caret to the current execution position
    fn sync_editor_position(&self, _file: &str, _line: i32) {}
    /// The debuggee halted and the stop is user-visible
    fn session_paused(&self) {}
    fn session_finished(&self, _exit_code: Option<i32>) {}
}

/// How a fresh session begins executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Run until a breakpoint or the end
    Run,
    /// Stop at the first line of the program
    StepInto,
}

/// Work scheduled from inside an action callback, applied on the next
/// queue pass (callbacks cannot touch the action map they live in)
enum EngineRequest {
    SwitchFrame { number: i32, user_action: bool },
    RefreshWatches { barrier: bool },
    StoppedRefresh,
}

pub struct Debugger {
    config: DebuggerConfig,
    host: Rc<dyn HostInterface>,
    executor: Option<GdbExecutor>,
    actions: ActionsMap,

    breakpoints: Vec<Rc<RefCell<Breakpoint>>>,
    temporary_breakpoints: Vec<Rc<RefCell<Breakpoint>>>,
    watches: Rc<RefCell<WatchArena>>,
    backtrace: Rc<RefCell<Vec<StackFrame>>>,
    threads: Rc<RefCell<Vec<ThreadInfo>>>,
    registers: Rc<RefCell<Vec<Register>>>,
    current_frame: Rc<RefCell<CurrentFrame>>,

    requests: Rc<RefCell<VecDeque<EngineRequest>>>,
    pub(crate) exit_code: Option<i32>,
}

impl Debugger {
    pub fn new(config: DebuggerConfig, host: Rc<dyn HostInterface>) -> Self {
        Self {
            config,
            host,
            executor: None,
            actions: ActionsMap::new(),
            breakpoints: Vec::new(),
            temporary_breakpoints: Vec::new(),
            watches: Rc::new(RefCell::new(WatchArena::new())),
            backtrace: Rc::new(RefCell::new(Vec::new())),
            threads: Rc::new(RefCell::new(Vec::new())),
            registers: Rc::new(RefCell::new(Vec::new())),
            current_frame: Rc::new(RefCell::new(CurrentFrame::new())),
            requests: Rc::new(RefCell::new(VecDeque::new())),
            exit_code: None,
        }
    }

    pub fn is_session_active(&self) -> bool {
        self.executor.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.executor.as_ref().is_some_and(|e| e.stopped())
    }

    pub fn watches(&self) -> Rc<RefCell<WatchArena>> {
        self.watches.clone()
    }

    pub fn backtrace(&self) -> Rc<RefCell<Vec<StackFrame>>> {
        self.backtrace.clone()
    }

    pub fn threads(&self) -> Rc<RefCell<Vec<ThreadInfo>>> {
        self.threads.clone()
    }

    pub fn registers(&self) -> Rc<RefCell<Vec<Register>>> {
        self.registers.clone()
    }

    pub fn current_frame(&self) -> Rc<RefCell<CurrentFrame>> {
        self.current_frame.clone()
    }

    // === Session lifecycle ===

    /// Begin a session over an already-open transport. Re-inserts every
    /// stored breakpoint, recreates every watch, then starts the debuggee.
    pub fn start_session(
        &mut self,
        transport: Box<dyn Transport>,
        debuggee_args: &[String],
        mode: StartMode,
    ) -> Result<()> {
        if self.executor.is_some() {
            return Err(Error::SessionAlreadyActive);
        }
        let mut executor = GdbExecutor::new(transport);
        // gdb accepts commands until the first resume.
        executor.set_stopped(true);
        self.executor = Some(executor);
        self.exit_code = None;
        self.actions.clear();
        self.current_frame.borrow_mut().reset();

        for bp in &self.breakpoints {
            bp.borrow_mut().index = None;
            self.actions.add(Box::new(BreakpointAddAction::new(bp.clone())));
        }
        for bp in self.temporary_breakpoints.drain(..) {
            self.actions.add(Box::new(BreakpointAddAction::temporary(bp)));
        }

        let roots: Vec<WatchHandle> = self.watches.borrow().roots().to_vec();
        for root in roots {
            self.watches.borrow_mut().reset_root(root);
            self.queue_watch_create(root);
        }

        if !debuggee_args.is_empty() {
            self.actions.add(Box::new(SimpleAction::new(format!(
                "-exec-arguments {}",
                debuggee_args.join(" ")
            ))));
        }
        if self.config.session.enable_pretty_printing {
            self.actions
                .add(Box::new(SimpleAction::new("-enable-pretty-printing")));
        }
        let initial = self.config.gdb.initial_commands.clone();
        for command in initial {
            self.send_command(&command)?;
        }
        if self.config.session.catch_exceptions {
            self.send_command("catch throw")?;
            self.send_command("catch catch")?;
        }

        let run_command = match mode {
            StartMode::Run => "-exec-run",
            StartMode::StepInto => "-exec-step",
        };
        self.commit_run_command(run_command);
        self.pump();
        Ok(())
    }

    /// One idle tick: ingest transport output, dispatch it, progress the
    /// action queue. Tears the session down when the process has died.
    pub fn poll(&mut self) {
        let alive = match self.executor.as_mut() {
            Some(executor) => {
                executor.poll_transport();
                executor.is_alive()
            }
            None => return,
        };
        if !alive {
            // Drain what the process wrote before dying, it may carry the
            // exit notification.
            let mut notifications: Vec<Record> = Vec::new();
            if let Some(executor) = self.executor.as_mut() {
                self.actions.dispatch(executor, |r| notifications.push(r.clone()));
            }
            for record in &notifications {
                self.handle_notification(record);
            }
            self.handle_termination();
            return;
        }
        self.pump();
    }

    /// Kill the debugger process outright
    pub fn stop(&mut self) {
        if let Some(executor) = self.executor.as_mut() {
            executor.force_stop();
            self.handle_termination();
        }
    }

    pub(crate) fn handle_termination(&mut self) {
        debug!(exit_code = ?self.exit_code, "session terminated");
        self.actions.clear();
        self.executor = None;
        self.requests.borrow_mut().clear();
        for bp in &self.breakpoints {
            bp.borrow_mut().index = None;
        }
        self.backtrace.borrow_mut().clear();
        self.threads.borrow_mut().clear();
        self.registers.borrow_mut().clear();
        self.current_frame.borrow_mut().reset();
        self.host.session_finished(self.exit_code);
    }

    /// Settle the queue: dispatch buffered records, apply requests made by
    /// callbacks, let runnable actions issue their commands. Loops because
    /// each step can produce work for the others.
    fn pump(&mut self) {
        for _ in 0..64 {
            let Some(executor) = self.executor.as_mut() else {
                return;
            };
            let mut notifications: Vec<Record> = Vec::new();
            self.actions.dispatch(executor, |r| notifications.push(r.clone()));
            for record in &notifications {
                self.handle_notification(record);
            }
            self.drain_requests();

            let Some(executor) = self.executor.as_mut() else {
                return;
            };
            if executor.stopped() {
                self.actions.run(executor);
            }
            executor.poll_transport();
            if !executor.has_output() {
                break;
            }
        }
    }

    fn drain_requests(&mut self) {
        loop {
            let request = self.requests.borrow_mut().pop_front();
            let Some(request) = request else { break };
            match request {
                EngineRequest::SwitchFrame { number, user_action } => {
                    self.queue_switch_frame(number, user_action)
                }
                EngineRequest::RefreshWatches { barrier } => self.queue_watch_update(barrier),
                EngineRequest::StoppedRefresh => self.refresh_stopped_state(),
            }
        }
    }

    // === Run control ===

    fn commit_run_command(&mut self, command: &str) {
        let Some(executor) = self.executor.as_ref() else {
            return;
        };
        self.current_frame.borrow_mut().reset();
        let stopped = executor.stopped_flag();
        self.actions.add(Box::new(RunAction::new(command, move || {
            stopped.set(false);
        })));
    }

    pub fn continue_run(&mut self) {
        if self.is_stopped() {
            self.commit_run_command("-exec-continue");
            self.pump();
        }
    }

    pub fn step_over(&mut self) {
        if self.is_stopped() {
            self.commit_run_command("-exec-next");
            self.pump();
        }
    }

    pub fn step_into(&mut self) {
        if self.is_stopped() {
            self.commit_run_command("-exec-step");
            self.pump();
        }
    }

    pub fn step_out(&mut self) {
        if self.is_stopped() {
            self.commit_run_command("-exec-finish");
            self.pump();
        }
    }

    pub fn next_instruction(&mut self) {
        if self.is_stopped() {
            self.commit_run_command("-exec-next-instruction");
            self.pump();
        }
    }

    pub fn step_instruction(&mut self) {
        if self.is_stopped() {
            self.commit_run_command("-exec-step-instruction");
            self.pump();
        }
    }

    /// Ask the running debuggee to halt; the stop surfaces asynchronously
    pub fn interrupt(&mut self) {
        if let Some(executor) = self.executor.as_mut() {
            executor.interrupt(false);
        }
    }

    /// Run until `file:line`. Returns false when no session is active; the
    /// caller should then start one, and the stored temporary breakpoint
    /// fires on the way.
    pub fn run_to_cursor(&mut self, file: &str, line: i32) -> bool {
        if self.executor.is_some() {
            if self.is_stopped() {
                self.commit_run_command(&format!("-exec-until {file}:{line}"));
                self.pump();
            }
            true
        } else {
            self.temporary_breakpoints
                .push(Rc::new(RefCell::new(Breakpoint::new(file, line))));
            false
        }
    }

    /// Move the program counter to `file:line` without executing the code
    /// in between
    pub fn set_next_statement(&mut self, file: &str, line: i32) {
        if !self.is_stopped() {
            return;
        }
        self.actions.add(Box::new(SimpleAction::new(format!(
            "-break-insert -t {file}:{line}"
        ))));
        self.commit_run_command(&format!("-exec-jump {file}:{line}"));
        self.pump();
    }

    /// Pause a running debuggee just long enough to apply `work`, then
    /// resume. When already stopped, `work` applies directly.
    fn with_stopped_target(&mut self, work: impl FnOnce(&mut Self)) {
        let running = self
            .executor
            .as_ref()
            .is_some_and(|e| !e.stopped() && !e.is_interrupting());
        if running {
            if let Some(executor) = self.executor.as_mut() {
                executor.interrupt(true);
            }
            work(self);
            self.commit_run_command("-exec-continue");
        } else {
            work(self);
        }
        self.pump();
    }

    // === Breakpoints ===

    pub fn add_breakpoint(&mut self, file: &str, line: i32) -> Rc<RefCell<Breakpoint>> {
        let bp = Rc::new(RefCell::new(Breakpoint::new(file, line)));
        self.breakpoints.push(bp.clone());
        if self.executor.is_some() {
            let action = BreakpointAddAction::new(bp.clone());
            self.with_stopped_target(move |engine| {
                engine.actions.add(Box::new(action));
            });
        }
        bp
    }

    pub fn remove_breakpoint(&mut self, bp: &Rc<RefCell<Breakpoint>>) {
        self.breakpoints.retain(|b| !Rc::ptr_eq(b, bp));
        let index = bp.borrow().index;
        if let (Some(index), true) = (index, self.executor.is_some()) {
            self.with_stopped_target(move |engine| {
                engine
                    .actions
                    .add(Box::new(SimpleAction::new(format!("-break-delete {index}"))));
            });
        }
    }

    pub fn breakpoints(&self) -> &[Rc<RefCell<Breakpoint>>] {
        &self.breakpoints
    }

    // === Watches ===

    fn watch_notifier(&self, for_tooltip: bool) -> impl FnMut() + 'static {
        let host = self.host.clone();
        move || {
            if for_tooltip {
                host.update_value_tooltip();
            } else {
                host.notify_watches_changed();
            }
        }
    }

    fn queue_watch_create(&mut self, watch: WatchHandle) {
        let for_tooltip = self
            .watches
            .borrow()
            .get(watch)
            .is_some_and(|n| n.for_tooltip);
        let action = WatchCreateAction::new(
            self.watches.clone(),
            watch,
            self.config.session.dynamic_update_range,
            self.watch_notifier(for_tooltip),
        );
        self.actions.add(Box::new(action));
    }

    pub fn add_watch(&mut self, symbol: &str) -> WatchHandle {
        self.add_watch_inner(symbol, false)
    }

    /// Transient watch backing a value tooltip
    pub fn add_tooltip_watch(&mut self, symbol: &str) -> WatchHandle {
        self.add_watch_inner(symbol, true)
    }

    fn add_watch_inner(&mut self, symbol: &str, for_tooltip: bool) -> WatchHandle {
        let handle = self
            .watches
            .borrow_mut()
            .add_root(WatchNode::root(symbol, for_tooltip));
        if self.is_stopped() {
            self.queue_watch_create(handle);
            self.pump();
        }
        handle
    }

    pub fn delete_watch(&mut self, watch: WatchHandle) {
        let Some(root) = self.watches.borrow().root_of(watch) else {
            return;
        };
        let varobj = self
            .watches
            .borrow()
            .get(root)
            .map(|n| n.id.clone())
            .unwrap_or_default();
        if !varobj.is_empty() && self.executor.is_some() {
            self.with_stopped_target(move |engine| {
                engine
                    .actions
                    .add(Box::new(SimpleAction::new(format!("-var-delete {varobj}"))));
            });
        }
        self.watches.borrow_mut().remove(root);
    }

    pub fn set_watch_value(&mut self, watch: WatchHandle, value: &str) {
        let varobj = self
            .watches
            .borrow()
            .get(watch)
            .map(|n| n.id.clone())
            .unwrap_or_default();
        if varobj.is_empty() || self.executor.is_none() {
            return;
        }
        // Editors tend to leave a line-continuation backslash behind.
        let value = value.trim().trim_end_matches('\\').trim_end().to_string();
        self.with_stopped_target(move |engine| {
            engine.actions.add(Box::new(SimpleAction::new(format!(
                "-var-assign {varobj} {value}"
            ))));
            engine.queue_watch_update(true);
        });
    }

    pub fn expand_watch(&mut self, watch: WatchHandle) {
        let (varobj, expanded, for_tooltip) = {
            let arena = self.watches.borrow();
            let Some(node) = arena.get(watch) else { return };
            if node.id.is_empty() || node.has_been_expanded {
                return;
            }
            let root = arena.root_of(watch);
            let root_id = root
                .and_then(|r| arena.get(r))
                .map(|n| n.id.clone())
                .unwrap_or_default();
            (root_id, watch, node.for_tooltip)
        };
        if !self.is_stopped() {
            return;
        }
        let action = WatchExpandedAction::new(
            self.watches.clone(),
            varobj,
            expanded,
            self.watch_notifier(for_tooltip),
        );
        self.actions.add(Box::new(action));
        self.pump();
    }

    pub fn collapse_watch(&mut self, watch: WatchHandle) {
        let (varobj, for_tooltip, delete) = {
            let arena = self.watches.borrow();
            let Some(node) = arena.get(watch) else { return };
            if !node.has_been_expanded {
                return;
            }
            (node.id.clone(), node.for_tooltip, node.delete_on_collapse)
        };
        if !delete || varobj.is_empty() || !self.is_stopped() {
            return;
        }
        let action = WatchCollapseAction::new(
            self.watches.clone(),
            watch,
            varobj,
            self.watch_notifier(for_tooltip),
        );
        self.actions.add(Box::new(action));
        self.pump();
    }

    fn queue_watch_update(&mut self, barrier: bool) {
        let host = self.host.clone();
        let mut action = WatchesUpdateAction::new(self.watches.clone(), move || {
            host.notify_watches_changed();
        });
        if barrier {
            action.core_mut().set_wait_previous(true);
        }
        self.actions.add(Box::new(action));
    }

    /// Re-read every watch value; normally triggered by a stop, exposed
    /// for hosts that refresh on their own schedule
    pub fn update_watches(&mut self) {
        if self.is_stopped() {
            self.queue_watch_update(false);
            self.pump();
        }
    }

    // === State requests ===

    pub fn request_backtrace(&mut self) {
        if !self.is_stopped() {
            return;
        }
        let requests = self.requests.clone();
        let host = self.host.clone();
        let action = GenerateBacktraceAction::new(
            self.backtrace.clone(),
            self.current_frame.clone(),
            self.config.session.auto_switch_frame,
            self.config.session.backtrace_depth,
            move |number| {
                requests.borrow_mut().push_back(EngineRequest::SwitchFrame {
                    number,
                    user_action: false,
                });
            },
            move || host.notify_backtrace_changed(),
        );
        self.actions.add(Box::new(action));
        self.pump();
    }

    pub fn request_threads(&mut self) {
        if !self.is_stopped() {
            return;
        }
        let host = self.host.clone();
        let action = ListThreadsAction::new(self.threads.clone(), move || {
            host.notify_threads_changed();
        });
        self.actions.add(Box::new(action));
        self.pump();
    }

    pub fn request_registers(&mut self) {
        if !self.is_stopped() {
            return;
        }
        let host = self.host.clone();
        let action = ListRegistersAction::new(self.registers.clone(), move || {
            host.notify_registers_changed();
        });
        self.actions.add(Box::new(action));
        self.pump();
    }

    pub fn examine_memory(
        &mut self,
        address: &str,
        length: u32,
        on_done: impl FnMut(&Record) + 'static,
    ) {
        if !self.is_stopped() {
            return;
        }
        self.actions
            .add(Box::new(ExamineMemoryAction::new(address, length, on_done)));
        self.pump();
    }

    // === Frame and thread selection ===

    pub fn switch_to_frame(&mut self, number: i32) {
        if !self.is_stopped() {
            return;
        }
        self.queue_switch_frame(number, true);
        self.pump();
    }

    fn queue_switch_frame(&mut self, number: i32, user_action: bool) {
        let current_frame = self.current_frame.clone();
        let backtrace = self.backtrace.clone();
        let requests = self.requests.clone();
        let host = self.host.clone();
        let action = SwitchToFrameAction::new(number, user_action, move |frame, user| {
            {
                let mut current = current_frame.borrow_mut();
                if user {
                    current.switch_to_frame(frame);
                } else {
                    current.set_frame(frame);
                }
            }
            let position = backtrace
                .borrow()
                .iter()
                .find(|row| row.number == frame)
                .filter(|row| row.valid)
                .map(|row| (row.filename.clone(), row.line.unwrap_or(0)));
            if let Some((file, line)) = position {
                current_frame.borrow_mut().set_position(file.clone(), line);
                host.sync_editor_position(&file, line);
            }
            requests
                .borrow_mut()
                .push_back(EngineRequest::RefreshWatches { barrier: true });
            host.notify_backtrace_changed();
        });
        self.actions.add(Box::new(action));
    }

    pub fn switch_to_thread(&mut self, thread_id: i32) {
        if !self.is_stopped() {
            return;
        }
        let current_frame = self.current_frame.clone();
        let requests = self.requests.clone();
        let action = SwitchToThreadAction::new(thread_id, move |_record| {
            current_frame.borrow_mut().reset();
            current_frame.borrow_mut().set_thread_id(thread_id);
            requests.borrow_mut().push_back(EngineRequest::StoppedRefresh);
        });
        self.actions.add(Box::new(action));
        self.pump();
    }

    /// Refresh everything shown while stopped: backtrace, threads, watches
    pub(crate) fn refresh_stopped_state(&mut self) {
        if !self.is_stopped() {
            return;
        }
        let requests = self.requests.clone();
        let host = self.host.clone();
        let action = GenerateBacktraceAction::new(
            self.backtrace.clone(),
            self.current_frame.clone(),
            self.config.session.auto_switch_frame,
            self.config.session.backtrace_depth,
            move |number| {
                requests.borrow_mut().push_back(EngineRequest::SwitchFrame {
                    number,
                    user_action: false,
                });
            },
            move || host.notify_backtrace_changed(),
        );
        self.actions.add(Box::new(action));

        let host = self.host.clone();
        self.actions.add(Box::new(ListThreadsAction::new(
            self.threads.clone(),
            move || host.notify_threads_changed(),
        )));
        self.queue_watch_update(false);
    }

    // === Raw commands ===

    /// Send a command the way a console user would type it. MI commands
    /// pass through; CLI commands are wrapped in `-interpreter-exec`.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        let Some(executor) = self.executor.as_mut() else {
            return Err(Error::SessionNotActive);
        };
        if command.starts_with('-') {
            executor.execute(&command.replace('\n', "\\n"));
        } else {
            let escaped = command
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n");
            executor.execute(&format!("-interpreter-exec console \"{escaped}\""));
        }
        Ok(())
    }
}
