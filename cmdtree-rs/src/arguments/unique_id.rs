use super::ArgumentType;
use crate::error::{CommandSyntaxError, ErrorKind};
use crate::reader::TextReader;
use uuid::Uuid;

/// A UUID, hyphenated (`8-4-4-4-12`) or as 32 bare hex digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UuidArgument;

impl ArgumentType for UuidArgument {
    type Value = Uuid;

    fn parse(&self, reader: &mut TextReader) -> Result<Uuid, CommandSyntaxError> {
        let start = reader.cursor();
        let token = reader.read_unquoted_text();
        if token.is_empty() {
            return Err(ErrorKind::ExpectedUuid.with_context(reader));
        }
        match Uuid::parse_str(&token) {
            Ok(id) => Ok(id),
            Err(_) => {
                reader.set_cursor(start);
                Err(ErrorKind::InvalidUuid(token).with_context(reader))
            }
        }
    }

    fn examples(&self) -> Vec<String> {
        vec![
            "dd12be42-52a9-4a91-a8a1-11c01849e498".into(),
            "dd12be4252a94a91a8a111c01849e498".into(),
        ]
    }
}
