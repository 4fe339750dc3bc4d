//! Byte-level source iterator for the tokenizer.
//!
//! Wraps a source string and provides character-by-character iteration with byte-offset
//! position and line tracking. All positions are byte offsets into the original UTF-8 source
//! text. Unlike a typical compiler cursor, this one supports seeking back to an arbitrary
//! earlier `(pos, line)` pair: the tokenizer "ungets" a token by resetting the cursor rather
//! than by keeping a token stack.
pub struct Cursor<'src> {
    source: &'src str,
    pos: u32,
    line: u32,
    chars: std::str::Chars<'src>,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            chars: source.chars(),
        }
    }

    /// Look at the current character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Look at the character after the current one without consuming anything.
    pub fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next()
    }

    /// Consume the current character and advance the position.
    ///
    /// `\r` is swallowed without affecting the line counter (CRLF collapses to one line
    /// break). `\n` increments the line counter.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8() as u32;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    pub fn pos(&self) -> u32 {
        self.pos
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn is_eof(&self) -> bool {
        self.peek().is_none()
    }

    pub fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Extract a slice of the source text by byte offsets.
    pub fn slice(&self, start: u32, end: u32) -> &'src str {
        &self.source[start as usize..end as usize]
    }

    /// Reset the cursor to an earlier position and line, re-deriving the character iterator
    /// from the source slice. Used for token unget and for lookahead save/restore.
    pub fn seek(&mut self, pos: u32, line: u32) {
        self.pos = pos;
        self.line = line;
        self.chars = self.source[pos as usize..].chars();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cursor_starts_at_line_one() {
        let cursor = Cursor::new("hello");
        assert_eq!(cursor.pos(), 0);
        assert_eq!(cursor.line(), 1);
    }

    #[test]
    fn newline_advances_line_carriage_return_does_not() {
        let mut cursor = Cursor::new("a\r\nb\nc");
        cursor.advance(); // a
        assert_eq!(cursor.line(), 1);
        cursor.advance(); // \r
        assert_eq!(cursor.line(), 1);
        cursor.advance(); // \n
        assert_eq!(cursor.line(), 2);
        cursor.advance(); // b
        cursor.advance(); // \n
        assert_eq!(cursor.line(), 3);
    }

    #[test]
    fn seek_rewinds_position_and_line() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.advance();
        cursor.advance();
        cursor.advance(); // now at 'c', line 2
        assert_eq!(cursor.line(), 2);
        cursor.seek(0, 1);
        assert_eq!(cursor.pos(), 0);
        assert_eq!(cursor.line(), 1);
        assert_eq!(cursor.peek(), Some('a'));
    }

    #[test]
    fn slice_extracts_text() {
        let cursor = Cursor::new("hello world");
        assert_eq!(cursor.slice(0, 5), "hello");
        assert_eq!(cursor.slice(6, 11), "world");
    }
}
