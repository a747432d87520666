use super::ArgumentType;
use crate::context::CommandContext;
use crate::error::{CommandSyntaxError, ErrorKind};
use crate::reader::TextReader;
use crate::suggestion::{Suggestions, SuggestionsBuilder};

/// How much input a [`StringArgument`] consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// One unquoted token.
    SingleWord,
    /// An unquoted token or a quoted phrase.
    QuotablePhrase,
    /// The rest of the input.
    GreedyPhrase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringArgument {
    kind: StringKind,
}

impl StringArgument {
    pub fn new(kind: StringKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> StringKind {
        self.kind
    }
}

impl ArgumentType for StringArgument {
    type Value = String;

    fn parse(&self, reader: &mut TextReader) -> Result<String, CommandSyntaxError> {
        match self.kind {
            StringKind::SingleWord => Ok(reader.read_unquoted_text()),
            StringKind::QuotablePhrase => reader.read_text(),
            StringKind::GreedyPhrase => {
                let text = reader.remaining().to_owned();
                reader.set_cursor(reader.total_length());
                Ok(text)
            }
        }
    }

    fn examples(&self) -> Vec<String> {
        let examples: &[&str] = match self.kind {
            StringKind::SingleWord => &["word", "words_with_underscores"],
            StringKind::QuotablePhrase => &["\"quoted phrase\"", "word", "\"\""],
            StringKind::GreedyPhrase => &["word", "words with spaces", "\"and symbols\""],
        };
        examples.iter().map(|s| s.to_string()).collect()
    }
}

/// Quote `input` unless it is a valid unquoted token.
pub fn escape_if_required(input: &str) -> String {
    if input.chars().all(TextReader::is_allowed_in_unquoted_text) {
        return input.to_owned();
    }
    let mut result = String::with_capacity(input.len() + 2);
    result.push('"');
    for c in input.chars() {
        if c == '\\' || c == '"' {
            result.push('\\');
        }
        result.push(c);
    }
    result.push('"');
    result
}

// ============================================================================
// Terms
// ============================================================================

/// One word out of a fixed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermArgument {
    options: Vec<String>,
}

impl TermArgument {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

impl ArgumentType for TermArgument {
    type Value = String;

    fn parse(&self, reader: &mut TextReader) -> Result<String, CommandSyntaxError> {
        let start = reader.cursor();
        let term = reader.read_unquoted_text();
        if self.options.contains(&term) {
            return Ok(term);
        }
        reader.set_cursor(start);
        Err(ErrorKind::InvalidTerm(term).with_context(reader))
    }

    fn examples(&self) -> Vec<String> {
        self.options.clone()
    }

    fn list_suggestions(&self, _context: &CommandContext, mut builder: SuggestionsBuilder) -> Suggestions {
        let typed = builder.remaining_lowercase();
        for option in &self.options {
            if option.to_lowercase().starts_with(&typed) {
                builder.suggest(option.as_str());
            }
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_word() {
        let mut reader = TextReader::new("hello world");
        let value = StringArgument::new(StringKind::SingleWord).parse(&mut reader);
        assert_eq!(value.as_deref(), Ok("hello"));
        assert_eq!(reader.cursor(), 5);
    }

    #[test]
    fn test_quotable_phrase() {
        let mut reader = TextReader::new("\"hello world\" again");
        let value = StringArgument::new(StringKind::QuotablePhrase).parse(&mut reader);
        assert_eq!(value.as_deref(), Ok("hello world"));
        assert_eq!(reader.remaining(), " again");
    }

    #[test]
    fn test_greedy_phrase() {
        let mut reader = TextReader::new("say Hello world! This is a test.");
        reader.set_cursor(4);
        let value = StringArgument::new(StringKind::GreedyPhrase).parse(&mut reader);
        assert_eq!(value.as_deref(), Ok("Hello world! This is a test."));
        assert!(!reader.can_read());
    }

    #[test]
    fn test_escape_if_required() {
        assert_eq!(escape_if_required("hello"), "hello");
        assert_eq!(escape_if_required(""), "");
        assert_eq!(escape_if_required("hello world"), "\"hello world\"");
        assert_eq!(escape_if_required("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_term() {
        let colors = TermArgument::new(["red", "green"]);
        assert_eq!(colors.parse(&mut TextReader::new("green")).as_deref(), Ok("green"));

        let mut reader = TextReader::new("blue");
        let error = colors.parse(&mut reader).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::InvalidTerm("blue".into()));
        assert_eq!(reader.cursor(), 0);
    }
}
