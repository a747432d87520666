use super::ArgumentType;
use crate::context::CommandContext;
use crate::error::CommandSyntaxError;
use crate::reader::TextReader;
use crate::suggestion::{Suggestions, SuggestionsBuilder};

/// `true` or `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolArgument;

impl ArgumentType for BoolArgument {
    type Value = bool;

    fn parse(&self, reader: &mut TextReader) -> Result<bool, CommandSyntaxError> {
        reader.read_bool()
    }

    fn examples(&self) -> Vec<String> {
        vec!["true".into(), "false".into()]
    }

    fn list_suggestions(&self, _context: &CommandContext, mut builder: SuggestionsBuilder) -> Suggestions {
        let typed = builder.remaining_lowercase();
        for value in ["true", "false"] {
            if value.starts_with(&typed) {
                builder.suggest(value);
            }
        }
        builder.build()
    }
}
