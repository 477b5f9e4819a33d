//! Backtrace retrieval
//!
//! Three commands go out together and their results arrive in any order:
//! the currently selected frame, the frame list, and the argument list.
//! The action assembles the host-visible backtrace once all three landed.

use std::cell::RefCell;
use std::rc::Rc;

use crate::exec::{Action, ActionCore, CommandId};
use crate::mi::{Frame, FrameArguments, Record, ResultClass};
use crate::model::{CurrentFrame, StackFrame};

pub struct GenerateBacktraceAction {
    core: ActionCore,
    backtrace: Rc<RefCell<Vec<StackFrame>>>,
    current_frame: Rc<RefCell<CurrentFrame>>,
    auto_switch_frame: bool,
    depth: u32,

    info_cmd: CommandId,
    frames_cmd: CommandId,
    args_cmd: CommandId,

    /// Frame gdb currently has selected, from `-stack-info-frame`
    gdb_frame: i32,
    frames: Vec<Frame>,
    args: FrameArguments,
    have_info: bool,
    have_frames: bool,
    have_args: bool,

    switch_frame: Box<dyn FnMut(i32)>,
    on_changed: Box<dyn FnMut()>,
}

impl GenerateBacktraceAction {
    pub fn new(
        backtrace: Rc<RefCell<Vec<StackFrame>>>,
        current_frame: Rc<RefCell<CurrentFrame>>,
        auto_switch_frame: bool,
        depth: u32,
        switch_frame: impl FnMut(i32) + 'static,
        on_changed: impl FnMut() + 'static,
    ) -> Self {
        Self {
            core: ActionCore::new(),
            backtrace,
            current_frame,
            auto_switch_frame,
            depth,
            info_cmd: CommandId::NONE,
            frames_cmd: CommandId::NONE,
            args_cmd: CommandId::NONE,
            gdb_frame: 0,
            frames: Vec::new(),
            args: FrameArguments::default(),
            have_info: false,
            have_frames: false,
            have_args: false,
            switch_frame: Box::new(switch_frame),
            on_changed: Box::new(on_changed),
        }
    }

    fn try_complete(&mut self) {
        if !(self.have_info && self.have_frames && self.have_args) {
            return;
        }

        let mut first_valid = -1;
        let mut rows = Vec::with_capacity(self.frames.len());
        for frame in &self.frames {
            let valid = frame.has_valid_source();
            if valid && first_valid < 0 {
                first_valid = frame.level;
            }
            let args = self.args.frame_args(frame.level as usize);
            let symbol = if frame.function.is_empty() {
                frame.address.clone()
            } else {
                format!("{}({})", frame.function, args)
            };
            rows.push(StackFrame {
                number: frame.level,
                address: frame.address.clone(),
                symbol,
                filename: frame.source_path().to_string(),
                line: frame.line,
                valid,
            });
        }
        *self.backtrace.borrow_mut() = rows;

        let user_selected = self.current_frame.borrow().user_selected();
        let chosen = if user_selected >= 0 {
            user_selected
        } else if self.auto_switch_frame && first_valid > 0 {
            first_valid
        } else {
            0
        };
        self.current_frame.borrow_mut().set_frame(chosen);
        if chosen != self.gdb_frame {
            (self.switch_frame)(chosen);
        }
        (self.on_changed)();
        self.core.finish();
    }
}

impl Action for GenerateBacktraceAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_start(&mut self) {
        self.info_cmd = self.core.execute("-stack-info-frame");
        self.frames_cmd = self.core.execute(format!("-stack-list-frames 0 {}", self.depth));
        self.args_cmd = self
            .core
            .execute(format!("-stack-list-arguments 1 0 {}", self.depth));
    }

    fn on_command_output(&mut self, id: CommandId, record: &Record) {
        if id == self.info_cmd {
            if record.class == ResultClass::Done {
                if let Some(frame) = record.value.find("frame").and_then(Frame::from_value) {
                    self.gdb_frame = frame.level;
                }
            }
            self.have_info = true;
        } else if id == self.frames_cmd {
            if record.class == ResultClass::Done {
                if let Some(stack) = record.value.find("stack") {
                    // Frames without a level cannot be addressed; skip them.
                    self.frames = stack.children().iter().filter_map(Frame::from_value).collect();
                }
            }
            self.have_frames = true;
        } else if id == self.args_cmd {
            if record.class == ResultClass::Done {
                self.args = FrameArguments::attach(&record.value);
            }
            self.have_args = true;
        }
        self.try_complete();
    }
}
