//! Cursor reader over a single command line.
//!
//! [`TextReader`] pairs shared, immutable text with a mutable byte cursor.
//! Cloning a reader is cheap and is how speculative parse attempts work: try
//! on the clone, keep the clone only if the attempt succeeded.

use crate::error::{CommandSyntaxError, ErrorKind};
use std::str::FromStr;
use std::sync::Arc;

/// Separates tokens on a command line.
pub const ARGUMENT_SEPARATOR: char = ' ';

const SYNTAX_ESCAPE: char = '\\';
const SYNTAX_DOUBLE_QUOTE: char = '"';
const SYNTAX_SINGLE_QUOTE: char = '\'';

type ReadResult<T> = Result<T, CommandSyntaxError>;

/// A scanner with a byte cursor over immutable text.
///
/// Invariant: `cursor <= text.len()` and `cursor` sits on a char boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReader {
    text: Arc<str>,
    cursor: usize,
}

impl TextReader {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            cursor: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamped to the text and snapped back to a char boundary.
    pub fn set_cursor(&mut self, cursor: usize) {
        let mut cursor = cursor.min(self.text.len());
        while !self.text.is_char_boundary(cursor) {
            cursor -= 1;
        }
        self.cursor = cursor;
    }

    pub fn total_length(&self) -> usize {
        self.text.len()
    }

    pub fn remaining_length(&self) -> usize {
        self.text.len() - self.cursor
    }

    /// Text already consumed.
    pub fn read_so_far(&self) -> &str {
        &self.text[..self.cursor]
    }

    pub fn remaining(&self) -> &str {
        &self.text[self.cursor..]
    }

    pub fn can_read(&self) -> bool {
        self.can_read_n(1)
    }

    /// Whether at least `length` more bytes are available.
    pub fn can_read_n(&self, length: usize) -> bool {
        self.cursor + length <= self.text.len()
    }

    fn next_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    pub fn peek(&self) -> ReadResult<char> {
        self.peek_at(0)
    }

    /// The character `offset` characters past the cursor.
    pub fn peek_at(&self, offset: usize) -> ReadResult<char> {
        self.remaining()
            .chars()
            .nth(offset)
            .ok_or_else(|| ErrorKind::OutOfBounds.with_context(self))
    }

    pub fn read(&mut self) -> ReadResult<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Ok(c)
    }

    /// Advance one character; a no-op at the end of input.
    pub fn skip(&mut self) {
        if let Some(c) = self.next_char() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn skip_whitespace(&mut self) {
        self.skip_while(char::is_whitespace);
    }

    fn skip_while(&mut self, accept: impl Fn(char) -> bool) {
        while let Some(c) = self.next_char() {
            if !accept(c) {
                break;
            }
            self.cursor += c.len_utf8();
        }
    }

    // ========================================================================
    // Typed readers
    // ========================================================================

    pub fn read_byte(&mut self) -> ReadResult<i8> {
        self.read_number(is_integer_char, ErrorKind::ExpectedByte, ErrorKind::InvalidByte)
    }

    pub fn read_short(&mut self) -> ReadResult<i16> {
        self.read_number(is_integer_char, ErrorKind::ExpectedShort, ErrorKind::InvalidShort)
    }

    pub fn read_int(&mut self) -> ReadResult<i32> {
        self.read_number(is_integer_char, ErrorKind::ExpectedInt, ErrorKind::InvalidInt)
    }

    pub fn read_long(&mut self) -> ReadResult<i64> {
        self.read_number(is_integer_char, ErrorKind::ExpectedLong, ErrorKind::InvalidLong)
    }

    pub fn read_float(&mut self) -> ReadResult<f32> {
        self.read_number(is_float_char, ErrorKind::ExpectedFloat, ErrorKind::InvalidFloat)
    }

    pub fn read_double(&mut self) -> ReadResult<f64> {
        self.read_number(is_float_char, ErrorKind::ExpectedDouble, ErrorKind::InvalidDouble)
    }

    fn read_number<T: FromStr>(
        &mut self,
        accept: fn(char) -> bool,
        expected: ErrorKind,
        invalid: fn(String) -> ErrorKind,
    ) -> ReadResult<T> {
        let start = self.cursor;
        self.skip_while(accept);
        let raw = &self.text[start..self.cursor];
        if raw.is_empty() {
            return Err(expected.with_context(self));
        }
        match raw.parse() {
            Ok(value) => Ok(value),
            Err(_) => {
                let raw = raw.to_owned();
                self.cursor = start;
                Err(invalid(raw).with_context(self))
            }
        }
    }

    pub fn read_bool(&mut self) -> ReadResult<bool> {
        let start = self.cursor;
        let value = self.read_text()?;
        match value.as_str() {
            "" => Err(ErrorKind::ExpectedBool.with_context(self)),
            "true" => Ok(true),
            "false" => Ok(false),
            _ => {
                self.cursor = start;
                Err(ErrorKind::InvalidBool(value).with_context(self))
            }
        }
    }

    // ========================================================================
    // Text
    // ========================================================================

    pub fn is_allowed_in_unquoted_text(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+')
    }

    pub fn is_quoted_text_start(c: char) -> bool {
        c == SYNTAX_DOUBLE_QUOTE || c == SYNTAX_SINGLE_QUOTE
    }

    pub fn read_unquoted_text(&mut self) -> String {
        let start = self.cursor;
        self.skip_while(Self::is_allowed_in_unquoted_text);
        self.text[start..self.cursor].to_owned()
    }

    /// Read a `"`- or `'`-quoted string. Returns an empty string at the end of input.
    pub fn read_quoted_text(&mut self) -> ReadResult<String> {
        let Some(next) = self.next_char() else {
            return Ok(String::new());
        };
        if !Self::is_quoted_text_start(next) {
            return Err(ErrorKind::ExpectedStartOfQuote.with_context(self));
        }
        self.skip();
        self.read_text_until(next)
    }

    /// Read up to and including `terminator`, honouring `\` escapes of the
    /// terminator and of `\` itself.
    pub fn read_text_until(&mut self, terminator: char) -> ReadResult<String> {
        let mut result = String::new();
        let mut escaped = false;
        while let Some(c) = self.next_char() {
            self.cursor += c.len_utf8();
            if escaped {
                if c == terminator || c == SYNTAX_ESCAPE {
                    result.push(c);
                    escaped = false;
                } else {
                    self.cursor -= c.len_utf8();
                    return Err(ErrorKind::InvalidEscape(c).with_context(self));
                }
            } else if c == SYNTAX_ESCAPE {
                escaped = true;
            } else if c == terminator {
                return Ok(result);
            } else {
                result.push(c);
            }
        }
        Err(ErrorKind::ExpectedEndOfQuote.with_context(self))
    }

    /// Quoted or unquoted text, depending on the next character.
    pub fn read_text(&mut self) -> ReadResult<String> {
        match self.next_char() {
            None => Ok(String::new()),
            Some(next) if Self::is_quoted_text_start(next) => {
                self.skip();
                self.read_text_until(next)
            }
            Some(_) => Ok(self.read_unquoted_text()),
        }
    }

    /// Consume `symbol` or fail with [`ErrorKind::ExpectedSymbol`].
    pub fn expect(&mut self, symbol: char) -> ReadResult<()> {
        if self.next_char() != Some(symbol) {
            return Err(ErrorKind::ExpectedSymbol(symbol).with_context(self));
        }
        self.skip();
        Ok(())
    }
}

fn is_integer_char(c: char) -> bool {
    c.is_ascii_digit() || c == '-' || c == '+'
}

fn is_float_char(c: char) -> bool {
    is_integer_char(c) || matches!(c, '.' | 'e' | 'E')
}
