//! The tokenizer: character cursor, comment capture, leading-char skipping, symbol
//! coalescing, and macro-call elision.

mod macro_guard;

pub mod cursor;

use rustc_hash::FxHashSet;

use refl_common::{Comment, ConstValue, ParseError, Token, TokenKind};

use cursor::Cursor;
pub use macro_guard::MacroParsingGuard;

/// Lexes a source buffer into `Token`s on demand. Tokens are not queued: `unget_token` simply
/// resets the cursor to the token's recorded start, so the next `get_token` call re-lexes the
/// same bytes.
pub struct Tokenizer<'src> {
    source: &'src str,
    cursor: Cursor<'src>,
    prev_pos: u32,
    prev_line: u32,
    comment: Comment,
    last_comment: Comment,
    error: Option<ParseError>,
    macros_enabled: bool,
    macros: FxHashSet<String>,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Tokenizer {
            source,
            cursor: Cursor::new(source),
            prev_pos: 0,
            prev_line: 1,
            comment: Comment::default(),
            last_comment: Comment::default(),
            error: None,
            macros_enabled: true,
            macros: FxHashSet::default(),
        }
    }

    pub fn reset(&mut self, source: &'src str) {
        self.source = source;
        self.cursor = Cursor::new(source);
        self.prev_pos = 0;
        self.prev_line = 1;
        self.comment = Comment::default();
        self.last_comment = Comment::default();
        self.error = None;
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    fn set_error(&mut self, message: impl Into<String>) -> bool {
        self.error = Some(ParseError::new(self.cursor.line(), message));
        false
    }

    /// The comment most recently completed before the current token, if its end line is
    /// exactly `decl_start_line` (the doc-comment adjacency rule).
    pub fn take_adjacent_comment(&mut self, decl_start_line: u32) -> Option<String> {
        if !self.last_comment.is_empty() && self.last_comment.end_line == decl_start_line {
            Some(std::mem::take(&mut self.last_comment).text)
        } else {
            None
        }
    }

    pub fn is_eof(&self) -> bool {
        self.cursor.is_eof()
    }

    fn peek(&self) -> Option<char> {
        self.cursor.peek()
    }

    /// Consumes and returns the next character, recording the pre-advance position so a
    /// single `unget_char` can restore it. `\r` is swallowed transparently.
    fn get_char(&mut self, set_previous: bool) -> Option<char> {
        if set_previous {
            self.prev_pos = self.cursor.pos();
            self.prev_line = self.cursor.line();
        }

        loop {
            match self.cursor.advance() {
                None => return None,
                Some('\r') => continue,
                Some(c) => return Some(c),
            }
        }
    }

    fn unget_char(&mut self) {
        self.cursor.seek(self.prev_pos, self.prev_line);
    }

    /// Skips whitespace, control characters, and comments, accumulating comment text into
    /// the in-progress comment block. Adjacent `//` lines fuse into one comment; a block
    /// comment strips leading `*`/space per line and drops trailing empty lines.
    fn get_leading_char(&mut self) -> Option<char> {
        if !self.comment.text.is_empty() {
            self.last_comment = std::mem::take(&mut self.comment);
        }
        self.comment.text.clear();
        self.comment.start_line = self.cursor.line();
        self.comment.end_line = self.cursor.line();

        loop {
            let mut c = self.get_char(true)?;

            if c == '\n' {
                if !self.comment.text.is_empty() {
                    self.comment.text.push('\n');
                }
                continue;
            }

            if c.is_whitespace() || c.is_control() {
                continue;
            }

            let next = self.peek();

            if c == '/' && next == Some('/') {
                self.lex_line_comment(&mut c);
                continue;
            }

            if c == '/' && next == Some('*') {
                self.lex_block_comment();
                continue;
            }

            return Some(c);
        }
    }

    fn lex_line_comment(&mut self, c: &mut char) {
        let mut lines: Vec<String> = Vec::new();
        let mut indentation_last_line: usize = 0;
        let mut next = self.peek();

        while !self.is_eof() && *c == '/' && next == Some('/') {
            let mut line = String::new();
            loop {
                match self.get_char(true) {
                    None => break,
                    Some('\n') => break,
                    Some(ch) => line.push(ch),
                }
            }

            let stripped = line.trim_start_matches('/');
            let trimmed = stripped.trim_start_matches([' ', '\t']);
            let first_char_index = stripped.len() - trimmed.len();
            let line = trimmed.to_string();

            if first_char_index > indentation_last_line && !lines.is_empty() {
                let last = lines.last_mut().unwrap();
                last.push(' ');
                last.push_str(&line);
            } else {
                lines.push(line);
                indentation_last_line = first_char_index;
            }

            while !self.is_eof() {
                match self.get_char(true) {
                    Some(ch) if ch.is_whitespace() => {
                        *c = ch;
                        continue;
                    }
                    Some(ch) => {
                        *c = ch;
                        break;
                    }
                    None => break,
                }
            }

            if !self.is_eof() {
                next = self.peek();
            }
        }

        if !self.is_eof() {
            self.unget_char();
        }

        self.comment.text = lines.join("\n");
        self.comment.end_line = self.cursor.line();
    }

    fn lex_block_comment(&mut self) {
        let mut lines: Vec<String> = Vec::new();
        let mut line = String::new();

        let mut c = self.get_char(true);
        let mut next = self.peek();
        while let Some(ch) = c {
            if ch == '*' && next == Some('/') {
                break;
            }

            if ch == '\n' {
                if !lines.is_empty() || !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
            } else if !line.is_empty() || !(ch.is_whitespace() || ch == '*') {
                line.push(ch);
            }

            c = self.get_char(true);
            next = self.peek();
        }

        if c.is_some() {
            self.get_char(true); // skip the closing '/'
        }

        while !self.is_eof() {
            match self.get_char(true) {
                Some(ch) if ch.is_whitespace() => continue,
                _ => break,
            }
        }
        if !self.is_eof() {
            self.unget_char();
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        self.comment.text = lines.join("\n");
        self.comment.end_line = self.cursor.line();
    }

    pub fn add_macro(&mut self, name: impl Into<String>) -> bool {
        self.macros.insert(name.into())
    }

    pub fn set_macro_parsing(&mut self, enabled: bool) {
        self.macros_enabled = enabled;
    }

    /// Returns a guard that disables macro parsing until dropped, restoring the previous
    /// flag even if the caller returns early via `?`.
    pub fn disable_macro_parsing(&mut self) -> MacroParsingGuard<'_, 'src> {
        MacroParsingGuard::new(self)
    }

    /// Consumes an optional parenthesized, comma-separated, recursively-elidable argument
    /// list following a macro-name identifier. The matched macro call vanishes from the
    /// token stream; the caller asks for the next token afterward.
    fn parse_macro(&mut self) -> bool {
        if !self.match_symbol("(") {
            return true;
        }

        if !self.match_symbol(")") {
            loop {
                let mut key = Token::eof(0, 0);
                if !self.get_identifier(&mut key) {
                    return self.set_error("Expected identifier in macro sequence");
                }

                if matches!(key.kind, TokenKind::Macro) {
                    self.parse_macro();
                }

                if !self.match_symbol(",") {
                    break;
                }
            }

            if !self.match_symbol(")") {
                return self.set_error("Expected ')'");
            }
        }

        true
    }

    pub fn get_token(&mut self, out: &mut Token) -> bool {
        self.get_token_with(out, false, false)
    }

    pub fn get_token_with(
        &mut self,
        out: &mut Token,
        angle_brackets_for_strings: bool,
        separate_angles: bool,
    ) -> bool {
        let Some(c) = self.get_leading_char() else {
            self.unget_char();
            return false;
        };

        let start_pos = self.prev_pos;
        let start_line = self.prev_line;

        if c.is_alphabetic() || c == '_' {
            self.lex_identifier(out, c, start_pos, start_line)
        } else if c.is_ascii_digit() || ((c == '-' || c == '+') && matches!(self.peek(), Some(p) if p.is_ascii_digit()))
        {
            self.lex_number(out, c, start_pos, start_line)
        } else if c == '"' || (angle_brackets_for_strings && c == '<') {
            self.lex_string(out, c, start_pos, start_line)
        } else {
            self.lex_symbol(out, c, start_pos, start_line, separate_angles)
        }
    }

    fn lex_identifier(&mut self, out: &mut Token, first: char, start_pos: u32, start_line: u32) -> bool {
        let mut text = String::new();
        text.push(first);
        loop {
            match self.get_char(true) {
                Some(c) if c.is_alphanumeric() || c == '_' => text.push(c),
                _ => {
                    self.unget_char();
                    break;
                }
            }
        }

        out.span = refl_common::Span::new(start_pos, self.cursor.pos());
        out.line = start_line;

        if text == "true" {
            out.kind = TokenKind::Const(ConstValue::Bool(true));
        } else if text == "false" {
            out.kind = TokenKind::Const(ConstValue::Bool(false));
        } else if self.macros_enabled && self.macros.contains(&text) {
            out.kind = TokenKind::Macro;
            out.text = text;
            if !self.parse_macro() {
                return self.set_error("Invalid syntax");
            }
            return self.get_token(out);
        } else {
            out.kind = TokenKind::Identifier;
        }
        out.text = text;
        true
    }

    fn lex_number(&mut self, out: &mut Token, first: char, start_pos: u32, start_line: u32) -> bool {
        let is_negated = first == '-';
        let mut is_float = false;
        let mut is_hex = false;
        let mut c = first;

        loop {
            if c == '.' {
                is_float = true;
            }
            if c == 'x' || c == 'X' {
                is_hex = true;
            }

            match self.get_char(true) {
                Some(next) => {
                    let continues = next.is_ascii_digit()
                        || (!is_float && next == '.')
                        || (!is_hex && (next == 'x' || next == 'X'))
                        || (is_hex && next.is_ascii_hexdigit());
                    if !continues {
                        if !(is_float && (next == 'f' || next == 'F')) {
                            self.unget_char();
                        } else {
                            c = next;
                        }
                        break;
                    }
                    c = next;
                }
                None => break,
            }
        }

        let text = self.cursor.slice(start_pos, self.cursor.pos()).to_string();
        out.span = refl_common::Span::new(start_pos, self.cursor.pos());
        out.line = start_line;
        out.text = text.clone();

        let digits = text.trim_end_matches(['f', 'F']);
        if !is_float {
            if is_hex {
                let clean = digits.trim_start_matches(['+', '-']);
                let clean = clean.trim_start_matches("0x").trim_start_matches("0X");
                out.kind = if is_negated {
                    let parsed = i64::from_str_radix(clean, 16).unwrap_or(0);
                    Self::fit_signed(-parsed)
                } else {
                    let parsed = u64::from_str_radix(clean, 16).unwrap_or(0);
                    Self::fit_unsigned(parsed)
                };
            } else if is_negated {
                out.kind = match digits.parse::<i32>() {
                    Ok(v) => TokenKind::Const(ConstValue::Int32(v)),
                    Err(_) => TokenKind::Const(ConstValue::Int64(digits.parse().unwrap_or(0))),
                };
            } else {
                out.kind = match digits.parse::<u32>() {
                    Ok(v) => TokenKind::Const(ConstValue::UInt32(v)),
                    Err(_) => TokenKind::Const(ConstValue::UInt64(digits.parse().unwrap_or(0))),
                };
            }
        } else {
            out.kind = TokenKind::Const(ConstValue::Real(digits.parse().unwrap_or(0.0)));
        }

        true
    }

    fn fit_signed(v: i64) -> TokenKind {
        if let Ok(v32) = i32::try_from(v) {
            TokenKind::Const(ConstValue::Int32(v32))
        } else {
            TokenKind::Const(ConstValue::Int64(v))
        }
    }

    fn fit_unsigned(v: u64) -> TokenKind {
        if let Ok(v32) = u32::try_from(v) {
            TokenKind::Const(ConstValue::UInt32(v32))
        } else {
            TokenKind::Const(ConstValue::UInt64(v))
        }
    }

    fn lex_string(&mut self, out: &mut Token, opener: char, start_pos: u32, start_line: u32) -> bool {
        let closing = if opener == '"' { '"' } else { '>' };
        let mut text = String::new();
        let mut closed = false;

        loop {
            match self.get_char(true) {
                None => break,
                Some(c) if c == closing => {
                    closed = true;
                    break;
                }
                Some('\\') => match self.get_char(true) {
                    None => break,
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('"') => text.push('"'),
                    Some(other) => text.push(other),
                },
                Some(c) => text.push(c),
            }
        }

        if !closed {
            self.unget_char();
        }

        out.span = refl_common::Span::new(start_pos, self.cursor.pos());
        out.line = start_line;
        out.kind = TokenKind::Const(ConstValue::String(text.clone()));
        out.text = text;
        true
    }

    fn lex_symbol(
        &mut self,
        out: &mut Token,
        first: char,
        start_pos: u32,
        start_line: u32,
        separate_angles: bool,
    ) -> bool {
        const PAIRS: &[(char, char)] = &[
            ('<', '<'),
            ('-', '>'),
            ('!', '='),
            ('<', '='),
            ('>', '='),
            ('+', '+'),
            ('-', '-'),
            ('+', '='),
            ('-', '='),
            ('*', '='),
            ('/', '='),
            ('^', '='),
            ('|', '='),
            ('&', '='),
            ('~', '='),
            ('%', '='),
            ('&', '&'),
            ('|', '|'),
            ('=', '='),
            (':', ':'),
            ('.', '.'),
        ];

        let second = self.get_char(true);
        let is_pair = second.is_some_and(|d| {
            PAIRS.contains(&(first, d)) || (!separate_angles && (first, d) == ('>', '>'))
        });

        if is_pair {
            let third = self.get_char(true);
            if third != Some('.') {
                self.unget_char();
            }
        } else {
            self.unget_char();
        }

        out.span = refl_common::Span::new(start_pos, self.cursor.pos());
        out.line = start_line;
        out.kind = TokenKind::Symbol;
        out.text = self.cursor.slice(start_pos, self.cursor.pos()).to_string();
        true
    }

    pub fn get_const(&mut self, out: &mut Token) -> bool {
        if !self.get_token(out) {
            return false;
        }
        if matches!(out.kind, TokenKind::Const(_)) {
            return true;
        }
        self.unget_token(out);
        false
    }

    pub fn get_identifier(&mut self, out: &mut Token) -> bool {
        if !self.get_token(out) {
            return false;
        }
        if matches!(out.kind, TokenKind::Identifier) {
            return true;
        }
        self.unget_token(out);
        false
    }

    /// Resets the cursor to the token's recorded start. There is no token stack: identity is
    /// position-derived, so re-lexing from that position reproduces the same token.
    pub fn unget_token(&mut self, token: &Token) {
        self.cursor.seek(token.span.start, token.line);
    }

    pub fn match_identifier(&mut self, text: &str) -> bool {
        let mut tok = Token::eof(0, 0);
        if self.get_token(&mut tok) {
            if tok.is_identifier() && tok.text == text {
                return true;
            }
            self.unget_token(&tok);
        }
        false
    }

    pub fn match_symbol(&mut self, text: &str) -> bool {
        let mut tok = Token::eof(0, 0);
        let separate_angles = text == ">";
        if self.get_token_with(&mut tok, false, separate_angles) {
            if tok.is_symbol(text) {
                return true;
            }
            self.unget_token(&tok);
        }
        false
    }

    pub fn require_identifier(&mut self, text: &str) -> bool {
        if !self.match_identifier(text) {
            return self.set_error(format!("Expected '{text}'"));
        }
        true
    }

    pub fn require_symbol(&mut self, text: &str) -> bool {
        if !self.match_symbol(text) {
            return self.set_error(format!("Expected '{text}'"));
        }
        true
    }

    /// Skips raw characters to the end of the current line, used after a `#` directive has
    /// already consumed its own identifier. When `multiline` is set a trailing `\` continues
    /// the directive onto the next line instead of ending the skip.
    pub fn skip_directive_tail(&mut self, multiline: bool) {
        let mut last_char = '\n';
        loop {
            loop {
                if self.is_eof() {
                    break;
                }
                match self.get_char(false) {
                    Some('\n') => break,
                    Some(c) => last_char = c,
                    None => break,
                }
            }
            if !(multiline && last_char == '\\') {
                break;
            }
            last_char = '\n';
        }
    }

    pub fn current_line(&self) -> u32 {
        self.cursor.line()
    }

    pub fn source(&self) -> &'src str {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(src: &str) -> (Tokenizer<'_>, Token) {
        (Tokenizer::new(src), Token::eof(0, 0))
    }

    #[test]
    fn identifier_lexes_plain_text() {
        let (mut t, mut out) = tok("foo_bar 42");
        assert!(t.get_token(&mut out));
        assert!(out.is_identifier());
        assert_eq!(out.text, "foo_bar");
    }

    #[test]
    fn true_false_reclassify_as_bool_const() {
        let (mut t, mut out) = tok("true false");
        assert!(t.get_token(&mut out));
        assert_eq!(out.kind, TokenKind::Const(ConstValue::Bool(true)));
        assert!(t.get_token(&mut out));
        assert_eq!(out.kind, TokenKind::Const(ConstValue::Bool(false)));
    }

    #[test]
    fn unget_token_round_trips() {
        let (mut t, mut a) = tok("hello world");
        assert!(t.get_token(&mut a));
        t.unget_token(&a);
        let mut b = Token::eof(0, 0);
        assert!(t.get_token(&mut b));
        assert_eq!(a, b);
    }

    #[test]
    fn two_char_symbols_coalesce() {
        let (mut t, mut out) = tok("-> != ::");
        assert!(t.get_token(&mut out));
        assert_eq!(out.text, "->");
        assert!(t.get_token(&mut out));
        assert_eq!(out.text, "!=");
        assert!(t.get_token(&mut out));
        assert_eq!(out.text, "::");
    }

    #[test]
    fn triple_dot_extends_past_the_pair() {
        let (mut t, mut out) = tok("...");
        assert!(t.get_token(&mut out));
        assert_eq!(out.text, "...");
    }

    #[test]
    fn double_angle_coalesces_unless_separated() {
        let (mut t, mut out) = tok(">>");
        assert!(t.get_token_with(&mut out, false, false));
        assert_eq!(out.text, ">>");

        let (mut t2, mut out2) = tok(">>");
        assert!(t2.get_token_with(&mut out2, false, true));
        assert_eq!(out2.text, ">");
    }

    #[test]
    fn string_literal_strips_quotes_and_escapes() {
        let (mut t, mut out) = tok("\"a\\nb\"");
        assert!(t.get_token(&mut out));
        assert_eq!(out.text, "a\nb");
    }

    #[test]
    fn angle_bracket_string_used_for_includes_only_when_requested() {
        let (mut t, mut out) = tok("<foo/bar.h>");
        assert!(t.get_token_with(&mut out, true, false));
        assert_eq!(out.text, "foo/bar.h");
    }

    #[test]
    fn line_comments_fuse_and_promote_to_last_comment() {
        let (mut t, mut out) = tok("// hello\n// world\nint x;");
        assert!(t.get_token(&mut out));
        assert_eq!(out.text, "int");
        let c = t.take_adjacent_comment(out.line);
        assert_eq!(c, Some("hello\nworld".to_string()));
    }

    #[test]
    fn comment_not_adjacent_when_blank_line_intervenes() {
        let (mut t, mut out) = tok("// hello\n\nint x;");
        assert!(t.get_token(&mut out));
        let c = t.take_adjacent_comment(out.line);
        assert_eq!(c, None);
    }

    #[test]
    fn block_comment_strips_leading_stars_and_spaces() {
        let (mut t, mut out) = tok("/**\n * one\n * two\n */\nint x;");
        assert!(t.get_token(&mut out));
        let c = t.take_adjacent_comment(out.line).unwrap();
        assert!(c.contains("one"));
        assert!(c.contains("two"));
    }

    #[test]
    fn macro_call_is_elided_entirely() {
        let mut t = Tokenizer::new("FOO(bar, baz(1,2)) int x;");
        t.add_macro("FOO");
        t.add_macro("baz");
        let mut out = Token::eof(0, 0);
        assert!(t.get_token(&mut out));
        assert!(out.is_identifier());
        assert_eq!(out.text, "int");
    }

    #[test]
    fn macro_without_call_site_still_elides_cleanly() {
        let mut t = Tokenizer::new("FOO int x;");
        t.add_macro("FOO");
        let mut out = Token::eof(0, 0);
        assert!(t.get_token(&mut out));
        assert_eq!(out.text, "int");
    }

    #[test]
    fn directive_tail_stops_at_newline() {
        let (mut t, mut out) = tok("define FOO 1\nint x;");
        assert!(t.get_identifier(&mut out));
        assert!(t.get_identifier(&mut out)); // FOO
        t.skip_directive_tail(false);
        let mut next = Token::eof(0, 0);
        assert!(t.get_token(&mut next));
        assert_eq!(next.text, "int");
    }

    #[test]
    fn directive_tail_continues_past_backslash_newline() {
        let (mut t, mut out) = tok("define FOO 1 \\\nmore\nint x;");
        assert!(t.get_identifier(&mut out));
        assert!(t.get_identifier(&mut out)); // FOO
        t.skip_directive_tail(true);
        let mut next = Token::eof(0, 0);
        assert!(t.get_token(&mut next));
        assert_eq!(next.text, "int");
    }

    #[test]
    fn hex_and_float_numeric_literals() {
        let (mut t, mut out) = tok("0xFF 3.14f");
        assert!(t.get_token(&mut out));
        assert_eq!(out.kind, TokenKind::Const(ConstValue::UInt32(255)));
        assert!(t.get_token(&mut out));
        assert!(matches!(out.kind, TokenKind::Const(ConstValue::Real(_))));
    }
}
