//! Error types.
//!
//! Everything that can go wrong while reading, parsing or executing a command
//! line is a [`CommandSyntaxError`]: an [`ErrorKind`] plus, when known, the
//! input text and the cursor where the problem was detected. Tree
//! registration problems are reported separately as [`TreeError`].

use crate::reader::TextReader;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// How many characters before the cursor are echoed back in messages.
const CONTEXT_AMOUNT: usize = 10;

// ============================================================================
// Error kinds
// ============================================================================

/// The reason a command line was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    // Reader
    #[error("Expected bool")]
    ExpectedBool,
    #[error("Expected byte")]
    ExpectedByte,
    #[error("Expected short")]
    ExpectedShort,
    #[error("Expected integer")]
    ExpectedInt,
    #[error("Expected long")]
    ExpectedLong,
    #[error("Expected float")]
    ExpectedFloat,
    #[error("Expected double")]
    ExpectedDouble,
    #[error("Invalid bool, expected true or false but found '{0}'")]
    InvalidBool(String),
    #[error("Invalid byte '{0}'")]
    InvalidByte(String),
    #[error("Invalid short '{0}'")]
    InvalidShort(String),
    #[error("Invalid integer '{0}'")]
    InvalidInt(String),
    #[error("Invalid long '{0}'")]
    InvalidLong(String),
    #[error("Invalid float '{0}'")]
    InvalidFloat(String),
    #[error("Invalid double '{0}'")]
    InvalidDouble(String),
    #[error("Expected quote to start a string")]
    ExpectedStartOfQuote,
    #[error("Unclosed quoted string")]
    ExpectedEndOfQuote,
    #[error("Invalid escape sequence '{0}' in quoted string")]
    InvalidEscape(char),
    #[error("Expected '{0}'")]
    ExpectedSymbol(char),
    #[error("Unexpected end of input")]
    OutOfBounds,

    // Grammar
    #[error("Expected literal {0}")]
    LiteralIncorrect(String),
    #[error("Expected whitespace to end one argument, but found trailing data")]
    ExpectedArgumentSeparator,

    // Dispatch
    #[error("Unknown command")]
    UnknownCommand,
    #[error("Incorrect argument for command")]
    UnknownArgument,
    #[error("Could not parse command: {0}")]
    DispatcherParse(String),

    // Bounded values
    #[error("Byte must not be less than {min}, found {found}")]
    ByteTooSmall { found: i8, min: i8 },
    #[error("Byte must not be more than {max}, found {found}")]
    ByteTooBig { found: i8, max: i8 },
    #[error("Short must not be less than {min}, found {found}")]
    ShortTooSmall { found: i16, min: i16 },
    #[error("Short must not be more than {max}, found {found}")]
    ShortTooBig { found: i16, max: i16 },
    #[error("Integer must not be less than {min}, found {found}")]
    IntegerTooSmall { found: i32, min: i32 },
    #[error("Integer must not be more than {max}, found {found}")]
    IntegerTooBig { found: i32, max: i32 },
    #[error("Long must not be less than {min}, found {found}")]
    LongTooSmall { found: i64, min: i64 },
    #[error("Long must not be more than {max}, found {found}")]
    LongTooBig { found: i64, max: i64 },
    #[error("Float must not be less than {min}, found {found}")]
    FloatTooSmall { found: f32, min: f32 },
    #[error("Float must not be more than {max}, found {found}")]
    FloatTooBig { found: f32, max: f32 },
    #[error("Double must not be less than {min}, found {found}")]
    DoubleTooSmall { found: f64, min: f64 },
    #[error("Double must not be more than {max}, found {found}")]
    DoubleTooBig { found: f64, max: f64 },

    // Arguments
    #[error("Invalid term '{0}'")]
    InvalidTerm(String),
    #[error("Expected UUID")]
    ExpectedUuid,
    #[error("Invalid UUID '{0}'")]
    InvalidUuid(String),
    #[error("No such argument '{0}' exists on this command")]
    NoSuchArgument(String),
    #[error("Argument '{name}' is defined as {found}, not {expected}")]
    ArgumentTypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Raised by command actions with their own message.
    #[error("{0}")]
    Custom(String),
}

impl ErrorKind {
    /// Attach the reader's text and cursor.
    pub fn with_context(self, reader: &TextReader) -> CommandSyntaxError {
        CommandSyntaxError {
            kind: self,
            cursor: Some(reader.cursor()),
            input: Some(reader.shared_text()),
        }
    }

    /// Raise without position information.
    pub fn into_error(self) -> CommandSyntaxError {
        CommandSyntaxError::new(self)
    }
}

// ============================================================================
// Positioned error
// ============================================================================

/// A rejected command line, optionally positioned in its input.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSyntaxError {
    kind: ErrorKind,
    cursor: Option<usize>,
    input: Option<Arc<str>>,
}

impl CommandSyntaxError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            cursor: None,
            input: None,
        }
    }

    /// Position an error at `cursor` in `input`.
    pub fn at(kind: ErrorKind, input: impl Into<Arc<str>>, cursor: usize) -> Self {
        Self {
            kind,
            cursor: Some(cursor),
            input: Some(input.into()),
        }
    }

    /// Shorthand for [`ErrorKind::Custom`].
    pub fn custom(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Custom(message.into()))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// The message without position information.
    pub fn raw_message(&self) -> String {
        self.kind.to_string()
    }

    /// Up to ten characters of input before the cursor, followed by a marker.
    ///
    /// Returns `None` when the error carries no position.
    pub fn context(&self) -> Option<String> {
        let (input, cursor) = self.position()?;
        let before = &input[..cursor];
        let count = before.chars().count();
        let mut context = String::new();
        if count > CONTEXT_AMOUNT {
            context.push_str("...");
        }
        context.extend(before.chars().skip(count.saturating_sub(CONTEXT_AMOUNT)));
        context.push_str("<--[HERE]");
        Some(context)
    }

    /// Two-line rendering: the input, then a caret under the cursor column.
    pub fn caret(&self) -> Option<String> {
        let (input, cursor) = self.position()?;
        let column = input[..cursor].chars().count();
        Some(format!("{input}\n{}^", " ".repeat(column)))
    }

    fn position(&self) -> Option<(&str, usize)> {
        let input = self.input.as_deref()?;
        let mut cursor = self.cursor?.min(input.len());
        while !input.is_char_boundary(cursor) {
            cursor -= 1;
        }
        Some((input, cursor))
    }
}

impl fmt::Display for CommandSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let (Some(cursor), Some(context)) = (self.cursor, self.context()) {
            write!(f, " at position {cursor}: {context}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandSyntaxError {}

impl From<ErrorKind> for CommandSyntaxError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

// ============================================================================
// Registration errors
// ============================================================================

/// A node could not be added to the command tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Default node '{0}' cannot be registered at the root")]
    DefaultNodeAtRoot(String),

    #[error("Node '{parent}' already has a default child '{existing}', cannot add '{added}'")]
    MultipleDefaultNodes {
        parent: String,
        existing: String,
        added: String,
    },

    #[error("Node '{0}' redirects and cannot have children")]
    RedirectWithChildren(String),

    #[error("Unknown node id {0}")]
    UnknownNode(usize),
}
