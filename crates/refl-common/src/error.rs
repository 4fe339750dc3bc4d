//! The single error shape produced by the tokenizer and parser.

use std::fmt;

/// A syntax error: one formatted message plus the line it occurred on. The parser has no
/// notion of recoverable lex errors (malformed numerics fall through silently) and no error
/// kind taxonomy beyond this — the first failure wins and halts parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl ParseError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParserError: {}:0: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_reference_format() {
        let e = ParseError::new(12, "expected ';'");
        assert_eq!(e.to_string(), "ParserError: 12:0: expected ';'");
    }
}
