//! Stack frame extraction from MI payloads

use std::fmt::Write as _;

use super::value::ResultValue;

/// One stack frame as reported by `-stack-list-frames` or a stop event
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub level: i32,
    pub address: String,
    pub function: String,
    pub file: String,
    pub fullname: String,
    pub line: Option<i32>,
    /// Shared library the frame comes from, when gdb knows it
    pub from: String,
}

impl Frame {
    /// Build a frame from a `frame={...}` tuple. Returns `None` when the
    /// tuple has no `level` field.
    pub fn from_value(value: &ResultValue) -> Option<Frame> {
        let level = value.int_of("level")? as i32;
        Some(Frame {
            level,
            address: value.string_of("addr").unwrap_or_default().to_string(),
            function: value.string_of("func").unwrap_or_default().to_string(),
            file: value.string_of("file").unwrap_or_default().to_string(),
            fullname: value.string_of("fullname").unwrap_or_default().to_string(),
            line: value.int_of("line").map(|l| l as i32),
            from: value.string_of("from").unwrap_or_default().to_string(),
        })
    }

    /// Extract the frame of a `*stopped` payload
    pub fn from_stopped_record(value: &ResultValue) -> Option<Frame> {
        let frame = value.find("frame")?;
        // Stop events omit the level; treat the reported frame as level 0.
        Some(Frame {
            level: frame.int_of("level").unwrap_or(0) as i32,
            address: frame.string_of("addr").unwrap_or_default().to_string(),
            function: frame.string_of("func").unwrap_or_default().to_string(),
            file: frame.string_of("file").unwrap_or_default().to_string(),
            fullname: frame.string_of("fullname").unwrap_or_default().to_string(),
            line: frame.int_of("line").map(|l| l as i32),
            from: frame.string_of("from").unwrap_or_default().to_string(),
        })
    }

    /// A frame is navigable when gdb reported both a source file and a line
    pub fn has_valid_source(&self) -> bool {
        self.line.is_some() && (!self.fullname.is_empty() || !self.file.is_empty())
    }

    /// Preferred source path for editor navigation
    pub fn source_path(&self) -> &str {
        if self.fullname.is_empty() {
            &self.file
        } else {
            &self.fullname
        }
    }

    /// Render `args=[{name=...,value=...},...]` as `a=1, b="x"`
    pub fn format_args(frame_value: &ResultValue) -> String {
        let mut out = String::new();
        if let Some(args) = frame_value.find("args") {
            for arg in args.children() {
                let (Some(name), Some(value)) = (arg.string_of("name"), arg.string_of("value"))
                else {
                    continue;
                };
                if !out.is_empty() {
                    out.push_str(", ");
                }
                let _ = write!(out, "{name}={value}");
            }
        }
        out
    }
}

/// Per-frame argument lists from `-stack-list-arguments`
#[derive(Debug, Default)]
pub struct FrameArguments {
    /// Rendered argument string per frame level
    args: Vec<String>,
}

impl FrameArguments {
    /// Attach a `stack-args=[frame={level=...,args=[...]},...]` payload
    pub fn attach(value: &ResultValue) -> FrameArguments {
        let mut args = Vec::new();
        if let Some(stack_args) = value.find("stack-args") {
            for frame in stack_args.children() {
                args.push(Frame::format_args(frame));
            }
        }
        FrameArguments { args }
    }

    pub fn count(&self) -> usize {
        self.args.len()
    }

    pub fn frame_args(&self, level: usize) -> &str {
        self.args.get(level).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::super::value::parse_value;
    use super::*;

    #[test]
    fn frame_from_value() {
        let root = parse_value(
            "frame={level=\"2\",addr=\"0x0040107b\",func=\"main\",file=\"t.c\",fullname=\"/src/t.c\",line=\"14\"}",
        )
        .unwrap();
        let frame = Frame::from_value(root.find("frame").unwrap()).unwrap();
        assert_eq!(frame.level, 2);
        assert_eq!(frame.function, "main");
        assert_eq!(frame.line, Some(14));
        assert!(frame.has_valid_source());
        assert_eq!(frame.source_path(), "/src/t.c");
    }

    #[test]
    fn frame_without_level_is_skipped() {
        let root = parse_value("frame={func=\"??\"}").unwrap();
        assert!(Frame::from_value(root.find("frame").unwrap()).is_none());
    }

    #[test]
    fn frame_without_source_is_invalid() {
        let root =
            parse_value("frame={level=\"5\",addr=\"0x7ffff7a05b97\",func=\"__libc_start_main\",from=\"/lib/libc.so.6\"}")
                .unwrap();
        let frame = Frame::from_value(root.find("frame").unwrap()).unwrap();
        assert!(!frame.has_valid_source());
        assert_eq!(frame.from, "/lib/libc.so.6");
    }

    #[test]
    fn stopped_frame() {
        let root = parse_value(
            "reason=\"end-stepping-range\",frame={addr=\"0x1234\",func=\"work\",file=\"w.c\",fullname=\"/src/w.c\",line=\"9\"},thread-id=\"1\"",
        )
        .unwrap();
        let frame = Frame::from_stopped_record(&root).unwrap();
        assert_eq!(frame.level, 0);
        assert_eq!(frame.line, Some(9));
    }

    #[test]
    fn args_formatting() {
        let root = parse_value(
            "stack-args=[frame={level=\"0\",args=[{name=\"a\",value=\"1\"},{name=\"b\",value=\"\\\"x\\\"\"}]},frame={level=\"1\",args=[]}]",
        )
        .unwrap();
        let args = FrameArguments::attach(&root);
        assert_eq!(args.count(), 2);
        assert_eq!(args.frame_args(0), "a=1, b=\"x\"");
        assert_eq!(args.frame_args(1), "");
        assert_eq!(args.frame_args(7), "");
    }
}
