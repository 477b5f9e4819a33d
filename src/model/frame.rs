//! Execution position: stack frames, threads, registers

/// One row of the backtrace shown to the host
#[derive(Debug, Clone, Default)]
pub struct StackFrame {
    pub number: i32,
    pub address: String,
    pub symbol: String,
    pub filename: String,
    pub line: Option<i32>,
    /// Whether the frame can be navigated to in an editor
    pub valid: bool,
}

/// The frame the session is currently focused on.
///
/// gdb picks frame 0 after every stop; the engine may auto-select the first
/// frame with source info instead, and the user's explicit choice overrides
/// both until the next run.
#[derive(Debug, Default)]
pub struct CurrentFrame {
    stack_frame: i32,
    user_selected: i32,
    thread_id: i32,
    filename: String,
    line: i32,
}

impl CurrentFrame {
    pub fn new() -> Self {
        let mut frame = Self::default();
        frame.reset();
        frame
    }

    /// Forget the focus; called whenever the debuggee resumes
    pub fn reset(&mut self) {
        self.stack_frame = -1;
        self.user_selected = -1;
    }

    /// Explicit user frame selection, sticky until the next resume
    pub fn switch_to_frame(&mut self, number: i32) {
        self.stack_frame = number;
        self.user_selected = number;
    }

    /// Engine-chosen frame; ignored while the user holds a selection
    pub fn set_frame(&mut self, number: i32) {
        if self.user_selected >= 0 {
            self.stack_frame = self.user_selected;
        } else {
            self.stack_frame = number;
        }
    }

    pub fn set_thread_id(&mut self, thread_id: i32) {
        self.thread_id = thread_id;
    }

    pub fn set_position(&mut self, filename: impl Into<String>, line: i32) {
        self.filename = filename.into();
        self.line = line;
    }

    pub fn frame_number(&self) -> i32 {
        self.stack_frame
    }

    pub fn user_selected(&self) -> i32 {
        self.user_selected
    }

    pub fn thread_id(&self) -> i32 {
        self.thread_id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn line(&self) -> i32 {
        self.line
    }
}

/// One row of the thread list
#[derive(Debug, Clone)]
pub struct ThreadInfo {
    pub id: i32,
    pub active: bool,
    /// Human-readable summary: name, state, topmost frame
    pub info: String,
}

/// One CPU register with its current value
#[derive(Debug, Clone)]
pub struct Register {
    pub name: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_selection_overrides_engine_choice() {
        let mut current = CurrentFrame::new();
        assert_eq!(current.frame_number(), -1);

        current.set_frame(2);
        assert_eq!(current.frame_number(), 2);
        assert_eq!(current.user_selected(), -1);

        current.switch_to_frame(5);
        current.set_frame(0);
        assert_eq!(current.frame_number(), 5);

        current.reset();
        assert_eq!(current.frame_number(), -1);
        current.set_frame(0);
        assert_eq!(current.frame_number(), 0);
    }
}
