//! Record classification
//!
//! The first character of an output line (after any command token has been
//! stripped) decides the record kind; result records additionally carry a
//! result class word.

use crate::common::{Error, Result};

use super::value::{parse_value, ResultValue};

/// Top-level record kind, keyed on the line's first character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// `^` command result
    Result,
    /// `*` execution state change
    ExecAsync,
    /// `+` ongoing status
    StatusAsync,
    /// `=` general notification
    NotifyAsync,
    /// `~` console output
    ConsoleStream,
    /// `@` target output
    TargetStream,
    /// `&` gdb log output
    LogStream,
}

/// Result class word of `^` and `*` records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    Done,
    Running,
    Connected,
    Error,
    Exit,
    Stopped,
    /// Stream and notify records carry no class
    Unknown,
}

impl ResultClass {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "done" => Some(Self::Done),
            "running" => Some(Self::Running),
            "connected" => Some(Self::Connected),
            "error" => Some(Self::Error),
            "exit" => Some(Self::Exit),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }
}

/// One parsed MI output record
#[derive(Debug, Clone)]
pub struct Record {
    pub kind: RecordKind,
    pub class: ResultClass,
    /// Event name of async records, e.g. `thread-group-started`
    pub async_type: String,
    /// Parsed payload; empty root for records without one
    pub value: ResultValue,
    /// Unescaped text of stream records
    pub stream_text: String,
}

impl Record {
    fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            class: ResultClass::Unknown,
            async_type: String::new(),
            value: ResultValue::tuple("", Vec::new()),
            stream_text: String::new(),
        }
    }

    /// Parse one output line. The caller must have stripped the command
    /// token already; the line starts with the record's marker character.
    pub fn parse(line: &str) -> Result<Record> {
        let mut chars = line.chars();
        let marker = chars
            .next()
            .ok_or_else(|| Error::unparsable(line))?;
        let rest = chars.as_str();

        match marker {
            '^' => {
                // The class word runs to the first comma; anything gdb does
                // not document is a hard parse failure.
                let (word, payload) = match rest.find(',') {
                    Some(i) => (&rest[..i], &rest[i + 1..]),
                    None => (rest, ""),
                };
                let class = ResultClass::from_word(word)
                    .ok_or_else(|| Error::parse(format!("unknown result class {word:?}")))?;
                let mut record = Record::new(RecordKind::Result);
                record.class = class;
                record.value = parse_value(payload)?;
                Ok(record)
            }
            '*' | '+' => {
                let kind = if marker == '*' {
                    RecordKind::ExecAsync
                } else {
                    RecordKind::StatusAsync
                };
                let (word, payload) = match rest.find(',') {
                    Some(i) => (&rest[..i], &rest[i + 1..]),
                    None => (rest, ""),
                };
                let mut record = Record::new(kind);
                record.async_type = word.to_string();
                record.class = match word {
                    "stopped" => ResultClass::Stopped,
                    "running" => ResultClass::Running,
                    _ => ResultClass::Unknown,
                };
                record.value = parse_value(payload)?;
                Ok(record)
            }
            '=' => {
                let (word, payload) = match rest.find(',') {
                    Some(i) => (&rest[..i], &rest[i + 1..]),
                    None => (rest, ""),
                };
                let mut record = Record::new(RecordKind::NotifyAsync);
                record.async_type = word.to_string();
                record.value = parse_value(payload)?;
                Ok(record)
            }
            '~' | '@' | '&' => {
                let kind = match marker {
                    '~' => RecordKind::ConsoleStream,
                    '@' => RecordKind::TargetStream,
                    _ => RecordKind::LogStream,
                };
                let mut record = Record::new(kind);
                record.stream_text = parse_value(rest)?
                    .children()
                    .first()
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_default();
                Ok(record)
            }
            _ => Err(Error::unparsable(line)),
        }
    }
}

/// Why execution stopped, from the `reason` field of a `*stopped` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoppedReason {
    BreakpointHit,
    SignalReceived,
    EndSteppingRange,
    FunctionFinished,
    ExitedNormally,
    ExitedSignalled,
    /// Inferior exited with a code, carried in `exit-code`
    Exited,
    LocationReached,
    /// Missing or unrecognized reason
    Unknown,
}

impl StoppedReason {
    pub fn parse(value: &ResultValue) -> Self {
        match value.string_of("reason") {
            Some("breakpoint-hit") => Self::BreakpointHit,
            Some("signal-received") => Self::SignalReceived,
            Some("end-stepping-range") => Self::EndSteppingRange,
            Some("function-finished") => Self::FunctionFinished,
            Some("exited-normally") => Self::ExitedNormally,
            Some("exited-signalled") => Self::ExitedSignalled,
            Some("exited") => Self::Exited,
            Some("location-reached") => Self::LocationReached,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_with_payload() {
        let record = Record::parse("^done,a = 5, b = 6").unwrap();
        assert_eq!(record.kind, RecordKind::Result);
        assert_eq!(record.class, ResultClass::Done);
        assert_eq!(record.value.string_of("b"), Some("6"));
    }

    #[test]
    fn done_without_payload() {
        let record = Record::parse("^done").unwrap();
        assert_eq!(record.class, ResultClass::Done);
        assert!(record.value.children().is_empty());
    }

    #[test]
    fn malformed_class_word_fails() {
        assert!(Record::parse("^done a = 5").is_err());
        assert!(Record::parse("^finished").is_err());
    }

    #[test]
    fn error_record() {
        let record = Record::parse("^error,msg=\"No symbol.\"").unwrap();
        assert_eq!(record.class, ResultClass::Error);
        assert_eq!(record.value.string_of("msg"), Some("No symbol."));
    }

    #[test]
    fn stopped_record() {
        let record = Record::parse(
            "*stopped,reason=\"breakpoint-hit\",bkptno=\"1\",frame={func=\"main\",line=\"12\"}",
        )
        .unwrap();
        assert_eq!(record.kind, RecordKind::ExecAsync);
        assert_eq!(record.class, ResultClass::Stopped);
        assert_eq!(StoppedReason::parse(&record.value), StoppedReason::BreakpointHit);
        assert_eq!(record.value.path("frame.func").unwrap().as_str(), Some("main"));
    }

    #[test]
    fn running_record() {
        let record = Record::parse("*running,thread-id=\"all\"").unwrap();
        assert_eq!(record.class, ResultClass::Running);
    }

    #[test]
    fn status_record() {
        let record = Record::parse("+download,section=\".text\"").unwrap();
        assert_eq!(record.kind, RecordKind::StatusAsync);
        assert_eq!(record.class, ResultClass::Unknown);
    }

    #[test]
    fn notify_record() {
        let record = Record::parse("=thread-group-started,id=\"i1\",pid=\"2044\"").unwrap();
        assert_eq!(record.kind, RecordKind::NotifyAsync);
        assert_eq!(record.async_type, "thread-group-started");
        assert_eq!(record.value.int_of("pid"), Some(2044));
    }

    #[test]
    fn console_stream_is_unescaped() {
        let record = Record::parse("~\"Reading symbols...\\n\"").unwrap();
        assert_eq!(record.kind, RecordKind::ConsoleStream);
        assert_eq!(record.stream_text, "Reading symbols...\n");
    }

    #[test]
    fn log_stream() {
        let record = Record::parse("&\"x/8xb 0x1000\\n\"").unwrap();
        assert_eq!(record.kind, RecordKind::LogStream);
        assert_eq!(record.stream_text, "x/8xb 0x1000\n");
    }

    #[test]
    fn garbage_fails() {
        assert!(Record::parse("(gdb) ").is_err());
        assert!(Record::parse("").is_err());
    }

    #[test]
    fn stopped_reason_taxonomy() {
        let cases = [
            ("signal-received", StoppedReason::SignalReceived),
            ("end-stepping-range", StoppedReason::EndSteppingRange),
            ("function-finished", StoppedReason::FunctionFinished),
            ("exited-normally", StoppedReason::ExitedNormally),
            ("exited-signalled", StoppedReason::ExitedSignalled),
            ("exited", StoppedReason::Exited),
            ("location-reached", StoppedReason::LocationReached),
            ("something-new", StoppedReason::Unknown),
        ];
        for (word, expected) in cases {
            let value = parse_value(&format!("reason=\"{word}\"")).unwrap();
            assert_eq!(StoppedReason::parse(&value), expected);
        }
        let no_reason = parse_value("thread-id=\"1\"").unwrap();
        assert_eq!(StoppedReason::parse(&no_reason), StoppedReason::Unknown);
    }
}
