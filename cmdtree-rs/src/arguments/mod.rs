//! Argument types: typed parsers run by argument nodes.
//!
//! An [`ArgumentType`] turns the next token(s) of the input into a value.
//! Parsed values are stored type-erased in the context and read back with
//! [`CommandContext::argument`](crate::CommandContext::argument).

mod boolean;
mod numeric;
mod string;
mod unique_id;

pub use boolean::BoolArgument;
pub use numeric::{
    ByteArgument, DoubleArgument, FloatArgument, IntegerArgument, LongArgument, ShortArgument,
};
pub use string::{escape_if_required, StringArgument, StringKind, TermArgument};
pub use unique_id::UuidArgument;

use crate::context::CommandContext;
use crate::error::CommandSyntaxError;
use crate::range::TextRange;
use crate::reader::TextReader;
use crate::suggestion::{Suggestions, SuggestionsBuilder};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A parser for one argument slot.
pub trait ArgumentType: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Consume input at the reader's cursor. On failure the cursor position is
    /// unspecified; callers parse on a cloned reader.
    fn parse(&self, reader: &mut TextReader) -> Result<Self::Value, CommandSyntaxError>;

    /// Sample inputs, for help output.
    fn examples(&self) -> Vec<String> {
        Vec::new()
    }

    /// Completions offered when the node has no custom provider.
    fn list_suggestions(&self, _context: &CommandContext, builder: SuggestionsBuilder) -> Suggestions {
        builder.build()
    }
}

/// Object-safe view of an [`ArgumentType`] with its value erased.
pub(crate) trait ErasedArgumentType: Send + Sync {
    fn parse_erased(&self, reader: &mut TextReader) -> Result<ParsedValue, CommandSyntaxError>;
    fn examples(&self) -> Vec<String>;
    fn list_suggestions(&self, context: &CommandContext, builder: SuggestionsBuilder) -> Suggestions;
}

impl<T: ArgumentType> ErasedArgumentType for T {
    fn parse_erased(&self, reader: &mut TextReader) -> Result<ParsedValue, CommandSyntaxError> {
        self.parse(reader).map(ParsedValue::new)
    }

    fn examples(&self) -> Vec<String> {
        ArgumentType::examples(self)
    }

    fn list_suggestions(&self, context: &CommandContext, builder: SuggestionsBuilder) -> Suggestions {
        ArgumentType::list_suggestions(self, context, builder)
    }
}

// ============================================================================
// Parsed values
// ============================================================================

/// A type-erased argument value.
#[derive(Clone)]
pub struct ParsedValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ParsedValue {
    pub fn new<V: Any + Send + Sync>(value: V) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<V>(),
        }
    }

    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.inner.downcast_ref()
    }

    /// Name of the stored type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ParsedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParsedValue<{}>", self.type_name)
    }
}

/// A value together with the input range it was read from.
#[derive(Debug, Clone)]
pub struct ParsedArgument {
    range: TextRange,
    value: ParsedValue,
}

impl ParsedArgument {
    pub fn new(range: TextRange, value: ParsedValue) -> Self {
        Self { range, value }
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn value(&self) -> &ParsedValue {
        &self.value
    }
}

// ============================================================================
// Shorthands
// ============================================================================

pub fn boolean() -> BoolArgument {
    BoolArgument
}

pub fn byte() -> ByteArgument {
    ByteArgument::new()
}

pub fn short() -> ShortArgument {
    ShortArgument::new()
}

pub fn integer() -> IntegerArgument {
    IntegerArgument::new()
}

pub fn integer_between(min: i32, max: i32) -> IntegerArgument {
    IntegerArgument::between(min, max)
}

pub fn long() -> LongArgument {
    LongArgument::new()
}

pub fn float() -> FloatArgument {
    FloatArgument::new()
}

pub fn double() -> DoubleArgument {
    DoubleArgument::new()
}

/// A UUID, with or without hyphens.
pub fn uuid() -> UuidArgument {
    UuidArgument
}

/// A single unquoted word.
pub fn word() -> StringArgument {
    StringArgument::new(StringKind::SingleWord)
}

/// A word or a quoted phrase.
pub fn string() -> StringArgument {
    StringArgument::new(StringKind::QuotablePhrase)
}

/// Everything up to the end of the input.
pub fn greedy_string() -> StringArgument {
    StringArgument::new(StringKind::GreedyPhrase)
}

/// One of a fixed set of words.
pub fn term<I, S>(options: I) -> TermArgument
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TermArgument::new(options)
}
