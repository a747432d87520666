//! Bounded numeric arguments.

use super::ArgumentType;
use crate::error::{CommandSyntaxError, ErrorKind};
use crate::reader::TextReader;

macro_rules! numeric_argument {
    (
        $(#[$meta:meta])*
        $name:ident($ty:ty), $read:ident, $too_small:ident, $too_big:ident, [$($example:literal),*]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name {
            minimum: $ty,
            maximum: $ty,
        }

        impl $name {
            pub fn new() -> Self {
                Self::between(<$ty>::MIN, <$ty>::MAX)
            }

            /// Inclusive bounds.
            pub fn between(minimum: $ty, maximum: $ty) -> Self {
                Self { minimum, maximum }
            }

            pub fn at_least(minimum: $ty) -> Self {
                Self::between(minimum, <$ty>::MAX)
            }

            pub fn minimum(&self) -> $ty {
                self.minimum
            }

            pub fn maximum(&self) -> $ty {
                self.maximum
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ArgumentType for $name {
            type Value = $ty;

            fn parse(&self, reader: &mut TextReader) -> Result<$ty, CommandSyntaxError> {
                let start = reader.cursor();
                let found = reader.$read()?;
                if found < self.minimum {
                    reader.set_cursor(start);
                    return Err(ErrorKind::$too_small { found, min: self.minimum }.with_context(reader));
                }
                if found > self.maximum {
                    reader.set_cursor(start);
                    return Err(ErrorKind::$too_big { found, max: self.maximum }.with_context(reader));
                }
                Ok(found)
            }

            fn examples(&self) -> Vec<String> {
                vec![$($example.to_string()),*]
            }
        }
    };
}

numeric_argument!(ByteArgument(i8), read_byte, ByteTooSmall, ByteTooBig, ["0", "12", "-7"]);
numeric_argument!(ShortArgument(i16), read_short, ShortTooSmall, ShortTooBig, ["0", "123", "-123"]);
numeric_argument!(
    /// A 32-bit integer.
    IntegerArgument(i32), read_int, IntegerTooSmall, IntegerTooBig, ["0", "123", "-123"]
);
numeric_argument!(LongArgument(i64), read_long, LongTooSmall, LongTooBig, ["0", "123", "-123"]);
numeric_argument!(FloatArgument(f32), read_float, FloatTooSmall, FloatTooBig, ["0", "1.2", ".5", "-1", "-.5", "-1234.56"]);
numeric_argument!(DoubleArgument(f64), read_double, DoubleTooSmall, DoubleTooBig, ["0", "1.2", ".5", "-1", "-.5", "-1234.56"]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_in_bounds() {
        let mut reader = TextReader::new("15");
        assert_eq!(IntegerArgument::between(0, 100).parse(&mut reader), Ok(15));
        assert!(!reader.can_read());
    }

    #[test]
    fn test_integer_too_small_resets_cursor() {
        let mut reader = TextReader::new("foo -5");
        reader.set_cursor(4);
        let error = IntegerArgument::between(0, 100).parse(&mut reader).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::IntegerTooSmall { found: -5, min: 0 });
        assert_eq!(error.cursor(), Some(4));
        assert_eq!(reader.cursor(), 4);
    }

    #[test]
    fn test_double_too_big() {
        let mut reader = TextReader::new("10.5");
        let error = DoubleArgument::between(0.0, 10.0).parse(&mut reader).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::DoubleTooBig { found: 10.5, max: 10.0 });
    }

    #[test]
    fn test_narrow_types() {
        assert_eq!(ByteArgument::at_least(1).parse(&mut TextReader::new("7")), Ok(7));
        assert_eq!(ShortArgument::new().parse(&mut TextReader::new("-300")), Ok(-300));
        assert_eq!(LongArgument::new().parse(&mut TextReader::new("5000000000")), Ok(5_000_000_000));
        assert_eq!(FloatArgument::new().parse(&mut TextReader::new("2.5")), Ok(2.5));
    }
}
