//! Conversions for implicitly-typed string scalars.
//!
//! The text property tree and the legacy configuration store everything as
//! strings, so booleans and integers have to be recovered from text.

/// Interpret a string as a boolean.
///
/// Accepts `1/0`, `yes/no`, `true/false`, `on/off`, `y/n` and `t/f` in any
/// case, ignoring surrounding whitespace. Anything else is `None`.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" | "y" | "t" => Some(true),
        "0" | "no" | "false" | "off" | "n" | "f" => Some(false),
        _ => None,
    }
}

/// The integer coding used when writing booleans to text formats.
pub fn bool_as_int(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}

/// Interpret a string as a signed integer, ignoring surrounding whitespace.
pub fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_spellings() {
        for s in ["1", "yes", "TRUE", " on ", "Y", "t"] {
            assert_eq!(parse_bool(s), Some(true), "{s:?}");
        }
        for s in ["0", "No", "false", "OFF", "n", "F"] {
            assert_eq!(parse_bool(s), Some(false), "{s:?}");
        }
        for s in ["", "2", "maybe", "-1"] {
            assert_eq!(parse_bool(s), None, "{s:?}");
        }
    }

    #[test]
    fn bool_coding() {
        assert_eq!(bool_as_int(true), 1);
        assert_eq!(bool_as_int(false), 0);
    }

    #[test]
    fn ints() {
        assert_eq!(parse_int(" 12 "), Some(12));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("1.5"), None);
        assert_eq!(parse_int(""), None);
    }
}
