//! GDB/MI output grammar
//!
//! One line of MI output is classified into a record ([`Record`]) whose
//! payload, when present, is a tree of named values ([`ResultValue`]).

pub mod frame;
pub mod record;
pub mod token;
pub mod value;
pub mod variable;

pub use frame::{Frame, FrameArguments};
pub use record::{Record, RecordKind, ResultClass, StoppedReason};
pub use token::{next_token, Token, TokenKind};
pub use value::{parse_value, ResultValue, ValueKind};
pub use variable::{InScope, UpdatedVariable};
