//! Tokenizer for one line of MI output
//!
//! Tokens are byte ranges into the source line; quoted strings keep their
//! quotes and escapes so callers can extract the verbatim text.

/// Lexical token kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare identifier/number run, or a double-quoted string
    String,
    Equal,
    Comma,
    ListStart,
    ListEnd,
    TupleStart,
    TupleEnd,
}

/// One lexical token: a half-open byte range `[start, end)` into the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(start: usize, end: usize, kind: TokenKind) -> Self {
        Self { start, end, kind }
    }

    /// Extract the verbatim token text, quotes and escapes included
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

fn is_structural(b: u8) -> bool {
    matches!(b, b'=' | b',' | b'[' | b']' | b'{' | b'}' | b'"')
}

/// Produce the next token starting at `pos`, skipping leading whitespace.
///
/// Returns `None` at end of input, on an unterminated quoted string, or on
/// an unrecognized character.
pub fn next_token(text: &str, pos: usize) -> Option<Token> {
    let bytes = text.as_bytes();
    let mut start = pos;

    while start < bytes.len() && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    if start >= bytes.len() {
        return None;
    }

    let single = |kind| Some(Token::new(start, start + 1, kind));
    match bytes[start] {
        b'=' => single(TokenKind::Equal),
        b',' => single(TokenKind::Comma),
        b'[' => single(TokenKind::ListStart),
        b']' => single(TokenKind::ListEnd),
        b'{' => single(TokenKind::TupleStart),
        b'}' => single(TokenKind::TupleEnd),
        b'"' => {
            // The quote scanner must skip escaped quotes, not stop at them.
            let mut ii = start + 1;
            while ii < bytes.len() {
                match bytes[ii] {
                    b'\\' => ii += 2,
                    b'"' => return Some(Token::new(start, ii + 1, TokenKind::String)),
                    _ => ii += 1,
                }
            }
            None
        }
        _ => {
            let mut end = start;
            while end < bytes.len() && !bytes[end].is_ascii_whitespace() && !is_structural(bytes[end])
            {
                end += 1;
            }
            Some(Token::new(start, end, TokenKind::String))
        }
    }
}
