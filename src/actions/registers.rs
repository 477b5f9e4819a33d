//! CPU register retrieval
//!
//! MI splits registers over two commands: names come from
//! `-data-list-register-names`, values from `-data-list-register-values x`,
//! joined by register number.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::exec::{Action, ActionCore, CommandId};
use crate::mi::{Record, ResultClass};
use crate::model::Register;

pub struct ListRegistersAction {
    core: ActionCore,
    registers: Rc<RefCell<Vec<Register>>>,
    names_cmd: CommandId,
    values_cmd: CommandId,
    names: Vec<String>,
    values: BTreeMap<i64, String>,
    have_names: bool,
    have_values: bool,
    on_changed: Box<dyn FnMut()>,
}

impl ListRegistersAction {
    pub fn new(registers: Rc<RefCell<Vec<Register>>>, on_changed: impl FnMut() + 'static) -> Self {
        Self {
            core: ActionCore::new(),
            registers,
            names_cmd: CommandId::NONE,
            values_cmd: CommandId::NONE,
            names: Vec::new(),
            values: BTreeMap::new(),
            have_names: false,
            have_values: false,
            on_changed: Box::new(on_changed),
        }
    }

    fn try_complete(&mut self) {
        if !(self.have_names && self.have_values) {
            return;
        }
        let mut rows = Vec::new();
        for (&number, value) in &self.values {
            let name = self
                .names
                .get(number as usize)
                .map(String::as_str)
                .unwrap_or("");
            // gdb pads the name list with empty slots for absent registers.
            if name.is_empty() {
                continue;
            }
            rows.push(Register {
                name: name.to_string(),
                value: value.clone(),
            });
        }
        *self.registers.borrow_mut() = rows;
        (self.on_changed)();
        self.core.finish();
    }
}

impl Action for ListRegistersAction {
    fn core(&self) -> &ActionCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_start(&mut self) {
        self.names_cmd = self.core.execute("-data-list-register-names");
        self.values_cmd = self.core.execute("-data-list-register-values x");
    }

    fn on_command_output(&mut self, id: CommandId, record: &Record) {
        if id == self.names_cmd {
            if record.class == ResultClass::Done {
                if let Some(names) = record.value.find("register-names") {
                    self.names = names
                        .children()
                        .iter()
                        .map(|n| n.as_str().unwrap_or("").to_string())
                        .collect();
                }
            }
            self.have_names = true;
        } else if id == self.values_cmd {
            if record.class == ResultClass::Done {
                if let Some(values) = record.value.find("register-values") {
                    for entry in values.children() {
                        if let (Some(number), Some(value)) =
                            (entry.int_of("number"), entry.string_of("value"))
                        {
                            self.values.insert(number, value.to_string());
                        }
                    }
                }
            }
            self.have_values = true;
        }
        self.try_complete();
    }
}
