//! Breakpoint bookkeeping
//!
//! The host owns the source positions; gdb owns the numeric index. The
//! index is cleared whenever the session ends, so a breakpoint survives
//! across sessions and is re-inserted on the next start.

/// One user breakpoint
#[derive(Debug, Clone, Default)]
pub struct Breakpoint {
    pub filename: String,
    pub line: i32,
    /// gdb's breakpoint number; `None` while not inserted
    pub index: Option<i32>,
    pub enabled: bool,
    pub condition: Option<String>,
    pub ignore_count: Option<i32>,
}

impl Breakpoint {
    pub fn new(filename: impl Into<String>, line: i32) -> Self {
        Self {
            filename: filename.into(),
            line,
            index: None,
            enabled: true,
            condition: None,
            ignore_count: None,
        }
    }

    /// The location argument of `-break-insert`
    pub fn location(&self) -> String {
        format!("{}:{}", self.filename, self.line)
    }

    /// Build the full insert command for this breakpoint
    pub fn insert_command(&self, temporary: bool) -> String {
        let mut cmd = String::from("-break-insert -f");
        if temporary {
            cmd.push_str(" -t");
        }
        if let Some(condition) = &self.condition {
            cmd.push_str(&format!(" -c \"{}\"", condition.replace('"', "\\\"")));
        }
        if let Some(ignore) = self.ignore_count {
            cmd.push_str(&format!(" -i {ignore}"));
        }
        cmd.push(' ');
        cmd.push_str(&self.location());
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_command_shape() {
        let mut bp = Breakpoint::new("src/main.c", 42);
        assert_eq!(bp.insert_command(false), "-break-insert -f src/main.c:42");
        assert_eq!(bp.insert_command(true), "-break-insert -f -t src/main.c:42");

        bp.condition = Some("x > 3".to_string());
        bp.ignore_count = Some(2);
        assert_eq!(
            bp.insert_command(false),
            "-break-insert -f -c \"x > 3\" -i 2 src/main.c:42"
        );
    }
}
