//! Command correlation tokens

use std::fmt;

/// Identifies one command within one action.
///
/// The wire form is the action id followed by the command sequence number
/// zero-padded to exactly ten digits, so the split point of an echoed token
/// is always `len - 10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId {
    pub action: i32,
    pub command: i32,
}

impl CommandId {
    /// Sentinel for "no command": notifications and failed writes
    pub const NONE: CommandId = CommandId {
        action: -1,
        command: -1,
    };

    pub fn new(action: i32, command: i32) -> Self {
        Self { action, command }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:010}", self.action, self.command)
    }
}

/// Split an output line into its optional command token and the record text.
///
/// A token is always more than ten digits long (ten for the sequence number
/// plus at least one for the action id), so a shorter digit run cannot be a
/// token and the line is a notification.
pub fn split_output_line(line: &str) -> (CommandId, &str) {
    let digits = line.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits <= 10 {
        return (CommandId::NONE, line);
    }
    let split = digits - 10;
    let action: i32 = match line[..split].parse() {
        Ok(n) => n,
        Err(_) => return (CommandId::NONE, line),
    };
    let command: i32 = match line[split..digits].parse() {
        Ok(n) => n,
        Err(_) => return (CommandId::NONE, line),
    };
    (CommandId::new(action, command), &line[digits..])
}
