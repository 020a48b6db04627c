// Lexical scanner.
//
// Converts query text into `(Token, Pos, String)` triples on demand. Uses
// memchr for accelerated delimiter search inside quoted literals. Whitespace
// collapses into a single `Ws` token so the parser can skip it on demand.

use memchr::memchr2;

use crate::token::{Pos, Token};

/// A streaming tokenizer over query text.
pub struct Scanner<'a> {
    /// The source bytes (UTF-8).
    src: &'a [u8],
    /// Current byte offset into src.
    pos: usize,
    /// Current line number (zero-based).
    line: u32,
    /// Current column number (zero-based), reset at line start.
    column: u32,
    /// Last significant token emitted; decides whether `/` opens a regex.
    prev: Option<Token>,
}

impl<'a> Scanner<'a> {
    /// Create a scanner positioned at the start of `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            src: input.as_bytes(),
            pos: 0,
            line: 0,
            column: 0,
            prev: None,
        }
    }

    /// Produce the next token, its starting position, and its literal text.
    ///
    /// Keyword, operator and punctuation tokens carry an empty literal.
    pub fn scan(&mut self) -> (Token, Pos, String) {
        let pos = self.position();
        let Some(ch) = self.peek() else {
            return (Token::Eof, pos, String::new());
        };

        if ch.is_ascii_whitespace() {
            return (Token::Ws, pos, self.scan_whitespace());
        }

        let (tok, lit) = if ch.is_ascii_alphabetic() || ch == b'_' {
            self.scan_ident()
        } else if ch == b'"' {
            self.scan_quoted_ident()
        } else if ch.is_ascii_digit() {
            self.scan_number()
        } else if ch == b'\'' {
            self.scan_string()
        } else if ch == b'/' && self.at_regex_position() {
            self.scan_regex()
        } else {
            self.scan_symbol()
        };

        self.prev = Some(tok);
        (tok, pos, lit)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn position(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> u8 {
        let ch = self.src[self.pos];
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.column = 0;
        } else if ch & 0xC0 != 0x80 {
            // UTF-8 continuation bytes do not advance the column.
            self.column += 1;
        }
        ch
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn text_from(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }

    /// A `/` opens a regex only where an operand can start: the previous
    /// significant token must not itself be able to end an operand.
    fn at_regex_position(&self) -> bool {
        !matches!(
            self.prev,
            Some(
                Token::Ident
                    | Token::Number
                    | Token::DurationVal
                    | Token::String
                    | Token::True
                    | Token::False
                    | Token::RightParen
                    | Token::Regex
            )
        )
    }

    // -----------------------------------------------------------------------
    // Token scanners
    // -----------------------------------------------------------------------

    fn scan_whitespace(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.advance();
        }
        self.text_from(start)
    }

    /// Bare identifier or keyword.
    fn scan_ident(&mut self) -> (Token, String) {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
        let text = self.text_from(start);
        match Token::lookup_keyword(&text) {
            Some(kw) => (kw, String::new()),
            None => (Token::Ident, text),
        }
    }

    /// Quoted identifier: one or more `"..."` segments joined by dots.
    /// The literal is the unescaped segments re-joined with `.`.
    fn scan_quoted_ident(&mut self) -> (Token, String) {
        let start = self.pos;
        let mut segments = Vec::new();
        loop {
            self.advance(); // opening quote
            let Some(segment) = self.scan_escaped(b'"') else {
                return (Token::Illegal, self.text_from(start));
            };
            segments.push(segment);

            if self.peek() == Some(b'.') && self.peek_at(1) == Some(b'"') {
                self.advance(); // the dot
                continue;
            }
            break;
        }
        (Token::Ident, segments.join("."))
    }

    fn scan_string(&mut self) -> (Token, String) {
        let start = self.pos;
        self.advance(); // opening quote
        match self.scan_escaped(b'\'') {
            Some(value) => (Token::String, value),
            None => (Token::Illegal, self.text_from(start)),
        }
    }

    /// Consume up to and including the closing `quote`, unescaping
    /// `\<quote>`, `\\` and `\n`. Returns `None` on an unterminated literal
    /// or a bad escape, leaving the position where scanning stopped.
    fn scan_escaped(&mut self, quote: u8) -> Option<String> {
        let mut value = Vec::new();
        loop {
            let rest = &self.src[self.pos..];
            let Some(offset) = memchr2(b'\\', quote, rest) else {
                self.advance_n(rest.len());
                return None;
            };
            value.extend_from_slice(&rest[..offset]);
            self.advance_n(offset);

            if self.advance() == quote {
                return Some(String::from_utf8_lossy(&value).into_owned());
            }
            match self.peek() {
                Some(c) if c == quote => {
                    value.push(quote);
                    self.advance();
                }
                Some(b'\\') => {
                    value.push(b'\\');
                    self.advance();
                }
                Some(b'n') => {
                    value.push(b'\n');
                    self.advance();
                }
                _ => return None,
            }
        }
    }

    /// Number or duration literal. The literal is the raw text, so a
    /// consumer can still see whether a fractional part was written.
    fn scan_number(&mut self) -> (Token, String) {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // A fractional part makes this a plain number, never a duration.
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            return (Token::Number, self.text_from(start));
        }

        // An immediately following unit marker makes a duration literal.
        match self.peek() {
            Some(b'u' | b's' | b'h' | b'd' | b'w') => {
                self.advance();
                (Token::DurationVal, self.text_from(start))
            }
            Some(b'm') => {
                self.advance();
                if self.peek() == Some(b's') {
                    self.advance();
                }
                (Token::DurationVal, self.text_from(start))
            }
            // µ is two bytes.
            Some(0xC2) if self.peek_at(1) == Some(0xB5) => {
                self.advance();
                self.advance();
                (Token::DurationVal, self.text_from(start))
            }
            _ => (Token::Number, self.text_from(start)),
        }
    }

    /// Regex literal `/.../`. Only `\/` is an escape; every other
    /// backslash sequence passes through to the pattern untouched.
    fn scan_regex(&mut self) -> (Token, String) {
        let start = self.pos;
        self.advance(); // opening slash
        let mut body = Vec::new();
        loop {
            let rest = &self.src[self.pos..];
            let Some(offset) = memchr2(b'\\', b'/', rest) else {
                self.advance_n(rest.len());
                return (Token::Illegal, self.text_from(start));
            };
            body.extend_from_slice(&rest[..offset]);
            self.advance_n(offset);

            if self.advance() == b'/' {
                return (Token::Regex, String::from_utf8_lossy(&body).into_owned());
            }
            match self.peek() {
                Some(b'/') => {
                    body.push(b'/');
                    self.advance();
                }
                Some(_) => {
                    body.push(b'\\');
                    body.push(self.advance());
                }
                None => return (Token::Illegal, self.text_from(start)),
            }
        }
    }

    fn scan_symbol(&mut self) -> (Token, String) {
        let start = self.pos;
        let tok = match self.advance() {
            b'+' => Token::Add,
            b'-' => Token::Sub,
            b'*' => Token::Mul,
            b'/' => Token::Div,
            b'=' => Token::Eq,
            b'!' if self.peek() == Some(b'=') => {
                self.advance();
                Token::Neq
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Token::Lte
                } else {
                    Token::Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Token::Gte
                } else {
                    Token::Gt
                }
            }
            b',' => Token::Comma,
            b';' => Token::Semicolon,
            b'(' => Token::LeftParen,
            b')' => Token::RightParen,
            b'.' => Token::Dot,
            _ => {
                // Consume the rest of a multi-byte character in one token.
                while self.peek().is_some_and(|c| c & 0xC0 == 0x80) {
                    self.advance();
                }
                Token::Illegal
            }
        };
        if tok == Token::Illegal {
            (tok, self.text_from(start))
        } else {
            (tok, String::new())
        }
    }
}

// ---------------------------------------------------------------------------
// BufScanner
// ---------------------------------------------------------------------------

/// A [`Scanner`] with a single-slot pushback buffer.
///
/// `unscan` marks the most recently scanned triple as live; the next `scan`
/// returns it again. Exactly one level of lookahead is guaranteed.
pub struct BufScanner<'a> {
    s: Scanner<'a>,
    buf: (Token, Pos, String),
    buffered: bool,
}

impl<'a> BufScanner<'a> {
    /// Create a buffered scanner positioned at the start of `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            s: Scanner::new(input),
            buf: (Token::Eof, Pos::default(), String::new()),
            buffered: false,
        }
    }

    /// Return the buffered triple if it is live, else read the scanner.
    pub fn scan(&mut self) -> (Token, Pos, String) {
        if self.buffered {
            self.buffered = false;
            return self.buf.clone();
        }
        let item = self.s.scan();
        self.buf = item.clone();
        item
    }

    /// Push the most recently scanned triple back onto the buffer.
    pub fn unscan(&mut self) {
        self.buffered = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &str) -> Vec<(Token, Pos, String)> {
        let mut s = Scanner::new(input);
        let mut out = Vec::new();
        loop {
            let item = s.scan();
            let done = item.0 == Token::Eof;
            out.push(item);
            if done {
                break;
            }
        }
        out
    }

    fn kinds(input: &str) -> Vec<Token> {
        scan_all(input).into_iter().map(|(t, _, _)| t).collect()
    }

    #[test]
    fn test_scan_keywords_case_insensitive() {
        assert_eq!(
            kinds("SELECT from Where"),
            vec![
                Token::KwSelect,
                Token::Ws,
                Token::KwFrom,
                Token::Ws,
                Token::KwWhere,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_scan_keyword_literal_is_empty() {
        let items = scan_all("select");
        assert_eq!(items[0].0, Token::KwSelect);
        assert_eq!(items[0].2, "");
    }

    #[test]
    fn test_scan_ident_preserves_case() {
        let items = scan_all("CpuLoad _x9");
        assert_eq!(items[0].0, Token::Ident);
        assert_eq!(items[0].2, "CpuLoad");
        assert_eq!(items[2].0, Token::Ident);
        assert_eq!(items[2].2, "_x9");
    }

    #[test]
    fn test_scan_whitespace_collapses() {
        let toks = kinds("a  \t\n  b");
        assert_eq!(toks, vec![Token::Ident, Token::Ws, Token::Ident, Token::Eof]);
    }

    #[test]
    fn test_scan_quoted_ident() {
        let items = scan_all(r#""cpu load""#);
        assert_eq!(items[0].0, Token::Ident);
        assert_eq!(items[0].2, "cpu load");
    }

    #[test]
    fn test_scan_quoted_ident_segments_join() {
        let items = scan_all(r#""db"."rp"."m""#);
        assert_eq!(items[0].0, Token::Ident);
        assert_eq!(items[0].2, "db.rp.m");
        assert_eq!(items[1].0, Token::Eof);
    }

    #[test]
    fn test_scan_quoted_ident_escapes() {
        let items = scan_all(r#""say \"hi\"\nnow""#);
        assert_eq!(items[0].0, Token::Ident);
        assert_eq!(items[0].2, "say \"hi\"\nnow");
    }

    #[test]
    fn test_scan_string_escapes() {
        let items = scan_all(r"'it\'s \\ a\nb'");
        assert_eq!(items[0].0, Token::String);
        assert_eq!(items[0].2, "it's \\ a\nb");
    }

    #[test]
    fn test_scan_unterminated_string_is_illegal() {
        let items = scan_all("'oops");
        assert_eq!(items[0].0, Token::Illegal);
    }

    #[test]
    fn test_scan_bad_escape_is_illegal() {
        let items = scan_all(r"'bad \x escape'");
        assert_eq!(items[0].0, Token::Illegal);
    }

    #[test]
    fn test_scan_numbers() {
        let items = scan_all("42 10.5 0.001");
        assert_eq!(items[0].0, Token::Number);
        assert_eq!(items[0].2, "42");
        assert_eq!(items[2].0, Token::Number);
        assert_eq!(items[2].2, "10.5");
        assert_eq!(items[4].0, Token::Number);
        assert_eq!(items[4].2, "0.001");
    }

    #[test]
    fn test_scan_durations() {
        for lit in ["10u", "10µ", "15ms", "100s", "10m", "3h", "2d", "1w"] {
            let items = scan_all(lit);
            assert_eq!(items[0].0, Token::DurationVal, "input {lit}");
            assert_eq!(items[0].2, lit);
            assert_eq!(items[1].0, Token::Eof);
        }
    }

    #[test]
    fn test_scan_fractional_is_never_duration() {
        let items = scan_all("10.5m");
        assert_eq!(items[0].0, Token::Number);
        assert_eq!(items[0].2, "10.5");
        assert_eq!(items[1].0, Token::Ident);
        assert_eq!(items[1].2, "m");
    }

    #[test]
    fn test_scan_duration_stops_after_unit() {
        let items = scan_all("10m5");
        assert_eq!(items[0].0, Token::DurationVal);
        assert_eq!(items[0].2, "10m");
        assert_eq!(items[1].0, Token::Number);
        assert_eq!(items[1].2, "5");
    }

    #[test]
    fn test_scan_operators_and_punctuation() {
        assert_eq!(
            kinds("+-*=!=<<=>>=,;()."),
            vec![
                Token::Add,
                Token::Sub,
                Token::Mul,
                Token::Eq,
                Token::Neq,
                Token::Lt,
                Token::Lte,
                Token::Gt,
                Token::Gte,
                Token::Comma,
                Token::Semicolon,
                Token::LeftParen,
                Token::RightParen,
                Token::Dot,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_scan_bare_bang_is_illegal() {
        assert_eq!(kinds("!")[0], Token::Illegal);
    }

    #[test]
    fn test_scan_regex_after_operator() {
        let items = scan_all("= /web.*/");
        assert_eq!(items[0].0, Token::Eq);
        assert_eq!(items[2].0, Token::Regex);
        assert_eq!(items[2].2, "web.*");
    }

    #[test]
    fn test_scan_regex_escaped_slash() {
        let items = scan_all(r"= /a\/b/");
        assert_eq!(items[2].0, Token::Regex);
        assert_eq!(items[2].2, "a/b");
    }

    #[test]
    fn test_scan_regex_passes_other_escapes_through() {
        let items = scan_all(r"= /\d+/");
        assert_eq!(items[2].0, Token::Regex);
        assert_eq!(items[2].2, r"\d+");
    }

    #[test]
    fn test_scan_slash_after_operand_is_division() {
        assert_eq!(
            kinds("a / b / c"),
            vec![
                Token::Ident,
                Token::Ws,
                Token::Div,
                Token::Ws,
                Token::Ident,
                Token::Ws,
                Token::Div,
                Token::Ws,
                Token::Ident,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_scan_unterminated_regex_is_illegal() {
        let items = scan_all("= /oops");
        assert_eq!(items[2].0, Token::Illegal);
    }

    #[test]
    fn test_scan_positions() {
        let items = scan_all("SELECT\n  value");
        assert_eq!(items[0].1, Pos { line: 0, column: 0 });
        // The whitespace run starts right after SELECT.
        assert_eq!(items[1].1, Pos { line: 0, column: 6 });
        assert_eq!(items[2].1, Pos { line: 1, column: 2 });
    }

    #[test]
    fn test_scan_position_is_token_start() {
        let items = scan_all("  cpu");
        assert_eq!(items[1].0, Token::Ident);
        assert_eq!(items[1].1, Pos { line: 0, column: 2 });
    }

    #[test]
    fn test_scan_illegal_byte() {
        let items = scan_all("#");
        assert_eq!(items[0].0, Token::Illegal);
        assert_eq!(items[0].2, "#");
    }

    #[test]
    fn test_buf_scanner_unscan_replays() {
        let mut s = BufScanner::new("SELECT value");
        let first = s.scan();
        assert_eq!(first.0, Token::KwSelect);
        s.unscan();
        assert_eq!(s.scan(), first);
        assert_eq!(s.scan().0, Token::Ws);
    }

    #[test]
    fn test_buf_scanner_single_slot() {
        let mut s = BufScanner::new("a b");
        s.scan(); // a
        s.scan(); // ws
        s.unscan();
        s.unscan(); // still only the whitespace is buffered
        assert_eq!(s.scan().0, Token::Ws);
        let (tok, _, lit) = s.scan();
        assert_eq!((tok, lit.as_str()), (Token::Ident, "b"));
    }
}
