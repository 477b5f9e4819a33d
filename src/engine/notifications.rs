//! Out-of-band record handling
//!
//! Everything gdb says without being asked lands here: stop events, thread
//! lifecycle notifications, stream chatter.

use tracing::{debug, trace, warn};

use crate::mi::{Frame, Record, RecordKind, ResultClass, StoppedReason};

use super::Debugger;

impl Debugger {
    pub(crate) fn handle_notification(&mut self, record: &Record) {
        match record.kind {
            RecordKind::NotifyAsync => self.handle_notify_async(record),
            RecordKind::ExecAsync => match record.class {
                ResultClass::Stopped => self.handle_stopped(record),
                ResultClass::Running => {
                    if let Some(executor) = self.executor.as_mut() {
                        executor.set_stopped(false);
                    }
                }
                _ => debug!(event = %record.async_type, "unhandled exec event"),
            },
            RecordKind::StatusAsync => {
                trace!(event = %record.async_type, "status update");
            }
            RecordKind::ConsoleStream | RecordKind::TargetStream | RecordKind::LogStream => {
                trace!(text = %record.stream_text.trim_end(), "stream output");
            }
            RecordKind::Result => {
                // An untagged result answers nothing we asked.
                debug!(value = %record.value.make_debug_string(), "untagged result dropped");
            }
        }
    }

    fn handle_notify_async(&mut self, record: &Record) {
        if record.async_type == "thread-group-started" {
            // The inferior pid is what interrupts get signalled to.
            if let Some(pid) = record.value.int_of("pid") {
                if let Some(executor) = self.executor.as_mut() {
                    if !executor.has_child_pid() {
                        debug!(pid, "debuggee started");
                        executor.set_child_pid(pid);
                    }
                }
            }
        } else {
            trace!(event = %record.async_type, "notification");
        }
    }

    fn handle_stopped(&mut self, record: &Record) {
        let temporary = {
            let Some(executor) = self.executor.as_mut() else {
                return;
            };
            let temporary = executor.is_temporary_interrupt();
            executor.set_stopped(true);
            temporary
        };

        let reason = StoppedReason::parse(&record.value);
        let session_over = matches!(
            reason,
            StoppedReason::ExitedNormally | StoppedReason::ExitedSignalled | StoppedReason::Exited
        );

        match reason {
            StoppedReason::SignalReceived => {
                let signal = record.value.string_of("signal-name").unwrap_or("");
                if signal != "SIGTRAP" && signal != "SIGINT" {
                    warn!(
                        signal,
                        meaning = record.value.string_of("signal-meaning").unwrap_or(""),
                        "debuggee received a signal"
                    );
                }
                self.update_cursor(record, true);
            }
            StoppedReason::ExitedNormally | StoppedReason::ExitedSignalled => {
                if let Some(executor) = self.executor.as_mut() {
                    executor.execute("-gdb-exit");
                }
            }
            StoppedReason::Exited => {
                self.exit_code = record.value.int_of("exit-code").map(|n| n as i32);
                if let Some(executor) = self.executor.as_mut() {
                    executor.execute("-gdb-exit");
                }
            }
            _ => self.update_cursor(record, !temporary),
        }

        if !temporary && !session_over {
            self.host.session_paused();
        }
        if let Some(executor) = self.executor.as_mut() {
            executor.clear_temporary_interrupt();
        }
    }

    /// Move the session focus to where the debuggee stopped and refresh
    /// everything shown while halted
    fn update_cursor(&mut self, record: &Record, sync_editor: bool) {
        if let Some(frame) = Frame::from_stopped_record(&record.value) {
            let thread_id = record.value.int_of("thread-id").unwrap_or(-1) as i32;
            {
                let mut current = self.current_frame.borrow_mut();
                current.set_thread_id(thread_id);
                if frame.has_valid_source() {
                    current.set_position(frame.source_path(), frame.line.unwrap_or(0));
                }
            }
            if sync_editor && frame.has_valid_source() {
                self.host
                    .sync_editor_position(frame.source_path(), frame.line.unwrap_or(0));
            }
        }
        self.refresh_stopped_state();
    }
}
